//! Admission predicate for a [`FilterSet`] over one snapshot.

use std::collections::BTreeSet;

use vcs_log_protocol::CommitId;
use vcs_log_protocol::DateFilter;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::RootId;
use vcs_log_protocol::TextMatcher;

use crate::error::BuildError;
use crate::snapshot::CommitIndex;
use crate::snapshot::CommitNode;
use crate::snapshot::GraphSnapshot;
use crate::users::UserIdentityResolver;

pub(crate) struct CommitFilter<'a> {
    snapshot: &'a GraphSnapshot,
    resolver: &'a UserIdentityResolver,
    roots: Option<&'a BTreeSet<RootId>>,
    branches: Option<Vec<bool>>,
    users: Option<&'a BTreeSet<String>>,
    paths: Option<&'a BTreeSet<String>>,
    text: Option<TextMatcher>,
    date: Option<DateFilter>,
}

impl<'a> CommitFilter<'a> {
    pub(crate) fn new(
        snapshot: &'a GraphSnapshot,
        filters: &'a FilterSet,
        resolver: &'a UserIdentityResolver,
    ) -> Result<Self, BuildError> {
        let text = match &filters.text {
            Some(text) => Some(text.matcher()?),
            None => None,
        };
        let branches = filters.branches.as_ref().map(|branches| {
            branch_mask(snapshot, &branches.include, &branches.exclude)
        });
        Ok(Self {
            snapshot,
            resolver,
            roots: filters.roots.as_ref(),
            branches,
            users: filters.users.as_ref(),
            paths: filters.paths.as_ref(),
            text,
            date: filters.date,
        })
    }

    pub(crate) fn admits(&self, index: CommitIndex) -> bool {
        let Some(node) = self.snapshot.commit(index) else {
            return false;
        };
        self.roots.is_none_or(|roots| roots.contains(&node.id.root))
            && self
                .branches
                .as_ref()
                .is_none_or(|mask| mask.get(index).copied().unwrap_or(false))
            && self.date.is_none_or(|date| date.contains(node.timestamp))
            && self
                .paths
                .is_none_or(|prefixes| touches_any(node, prefixes))
            && self
                .text
                .as_ref()
                .is_none_or(|text| text.matches(&node.id.hash, &node.subject))
            && self.users.is_none_or(|tokens| {
                tokens
                    .iter()
                    .any(|token| self.resolver.matches(&node.id.root, &node.author, token))
            })
    }
}

/// Commits reachable from an included ref (every commit when `include` is
/// empty), minus commits reachable from an excluded ref.
fn branch_mask(
    snapshot: &GraphSnapshot,
    include: &BTreeSet<String>,
    exclude: &BTreeSet<String>,
) -> Vec<bool> {
    let mut mask = if include.is_empty() {
        vec![true; snapshot.len()]
    } else {
        reachable_from(snapshot, include)
    };
    if !exclude.is_empty() {
        for (index, excluded) in reachable_from(snapshot, exclude).into_iter().enumerate() {
            if excluded {
                mask[index] = false;
            }
        }
    }
    mask
}

fn reachable_from(snapshot: &GraphSnapshot, names: &BTreeSet<String>) -> Vec<bool> {
    let mut seen = vec![false; snapshot.len()];
    let mut stack: Vec<CommitIndex> = snapshot
        .all_refs()
        .filter(|vcs_ref| names.contains(&vcs_ref.name))
        .filter_map(|vcs_ref| {
            snapshot.index_of(&CommitId::new(
                vcs_ref.commit_hash.clone(),
                vcs_ref.root.clone(),
            ))
        })
        .collect();
    while let Some(index) = stack.pop() {
        if std::mem::replace(&mut seen[index], true) {
            continue;
        }
        if let Some(node) = snapshot.commit(index) {
            stack.extend(node.parents.iter().copied().filter(|&parent| !seen[parent]));
        }
    }
    seen
}

fn touches_any(node: &CommitNode, prefixes: &BTreeSet<String>) -> bool {
    node.paths.iter().any(|path| {
        prefixes.iter().any(|prefix| {
            prefix.is_empty()
                || path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    })
}
