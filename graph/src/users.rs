//! Resolution of author filter tokens to concrete identities.
//!
//! People commit under several spellings of their name and under more than
//! one email, so a token is expanded through two synonym channels: the
//! normalized display name and the name derived from the email local part.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use tracing::debug;
use vcs_log_protocol::ME_TOKEN;
use vcs_log_protocol::RootId;
use vcs_log_protocol::VcsUser;

use crate::snapshot::GraphSnapshot;

type Resolved = Arc<BTreeSet<VcsUser>>;

pub struct UserIdentityResolver {
    users: BTreeMap<RootId, BTreeSet<VcsUser>>,
    current_users: BTreeMap<RootId, VcsUser>,
    cache: Mutex<HashMap<(RootId, String), Resolved>>,
    unregistered: Mutex<BTreeSet<VcsUser>>,
}

impl UserIdentityResolver {
    pub fn new(
        users: BTreeMap<RootId, BTreeSet<VcsUser>>,
        current_users: BTreeMap<RootId, VcsUser>,
    ) -> Self {
        Self {
            users,
            current_users,
            cache: Mutex::new(HashMap::new()),
            unregistered: Mutex::new(BTreeSet::new()),
        }
    }

    /// Indexes every author and committer of the snapshot, per root.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut users = BTreeMap::new();
        let mut current_users = BTreeMap::new();
        for root in snapshot.roots() {
            users.insert(root.clone(), snapshot.users(root));
            if let Some(me) = snapshot.current_user(root) {
                current_users.insert(root.clone(), me.clone());
            }
        }
        Self::new(users, current_users)
    }

    /// Every known identity of `root` that `token` stands for.
    pub fn resolve(&self, root: &RootId, token: &str) -> BTreeSet<VcsUser> {
        self.resolved(root, token).as_ref().clone()
    }

    /// True when `author` is one of the identities `token` resolves to. If
    /// the token resolves to nobody, the raw author name and email local
    /// part are compared directly and the author is recorded as
    /// unregistered.
    pub fn matches(&self, root: &RootId, author: &VcsUser, token: &str) -> bool {
        let resolved = self.resolved(root, token);
        if resolved.contains(author) {
            return true;
        }
        if !resolved.is_empty() || is_me(token) {
            return false;
        }

        let wanted = normalize_name(token);
        let matched = !wanted.is_empty()
            && (normalize_name(&author.name) == wanted
                || normalize_name(author.email_local_part()) == wanted);
        if matched && lock(&self.unregistered).insert(author.clone()) {
            debug!(%root, %author, token, "author matched outside the user index");
        }
        matched
    }

    /// Identities that only matched through the raw-text fallback.
    pub fn unregistered_users(&self) -> BTreeSet<VcsUser> {
        lock(&self.unregistered).clone()
    }

    fn resolved(&self, root: &RootId, token: &str) -> Resolved {
        let key = (root.clone(), token.to_string());
        if let Some(hit) = lock(&self.cache).get(&key) {
            return hit.clone();
        }
        let resolved = Arc::new(self.compute(root, token));
        lock(&self.cache).insert(key, resolved.clone());
        resolved
    }

    fn compute(&self, root: &RootId, token: &str) -> BTreeSet<VcsUser> {
        let Some(users) = self.users.get(root) else {
            return self.me_only(root, token);
        };

        let mut keys = BTreeSet::new();
        let mut emails = BTreeSet::new();
        let mut result = BTreeSet::new();
        if is_me(token) {
            let Some(me) = self.current_users.get(root) else {
                return BTreeSet::new();
            };
            keys.insert(normalize_name(&me.name));
            keys.insert(name_from_email(&me.email));
            result.insert(me.clone());
        } else {
            keys.insert(normalize_name(token));
            if token.contains('@') {
                emails.insert(token.trim().to_lowercase());
            }
        }
        keys.remove("");

        for user in users {
            let by_name = keys.contains(&normalize_name(&user.name));
            let by_email_name = keys.contains(&name_from_email(&user.email));
            let by_email = emails.contains(&user.email.to_lowercase());
            if by_name || by_email_name || by_email {
                result.insert(user.clone());
            }
        }
        result
    }

    fn me_only(&self, root: &RootId, token: &str) -> BTreeSet<VcsUser> {
        match self.current_users.get(root) {
            Some(me) if is_me(token) => BTreeSet::from([me.clone()]),
            _ => BTreeSet::new(),
        }
    }
}

fn is_me(token: &str) -> bool {
    token.trim() == ME_TOKEN
}

/// Lower-cased, with runs of whitespace collapsed to one space.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `john.smith@corp.com` and `john_smith@corp.com` both become `john smith`.
pub fn name_from_email(email: &str) -> String {
    let local = email.split_once('@').map_or(email, |(local, _)| local);
    let spaced: String = local
        .chars()
        .map(|ch| if matches!(ch, '.' | '_' | '-' | '+') { ' ' } else { ch })
        .collect();
    normalize_name(&spaced)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
