//! Immutable permanent commit graph supplied by the storage layer.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::Hash;
use vcs_log_protocol::RootId;
use vcs_log_protocol::SortMode;
use vcs_log_protocol::VcsRef;
use vcs_log_protocol::VcsUser;

use crate::error::GraphError;
use crate::error::Result;
use crate::sort;

/// Position of a commit inside a [`GraphSnapshot`].
pub type CommitIndex = usize;

pub(crate) type Edges = SmallVec<[CommitIndex; 2]>;

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct CommitNode {
    pub id: CommitId,
    /// Every parent hash, including parents that were not loaded.
    pub parent_hashes: Vec<Hash>,
    /// Parents present in the snapshot, in parent order.
    pub parents: SmallVec<[CommitIndex; 2]>,
    pub author: VcsUser,
    pub committer: VcsUser,
    pub timestamp: i64,
    pub subject: String,
    pub paths: Vec<String>,
}

impl CommitNode {
    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }
}

/// All known commits, their edges, and the references of every root at one
/// point in time. Never mutated; a refresh produces a new snapshot.
#[derive(Debug)]
pub struct GraphSnapshot {
    id: u64,
    commits: Vec<CommitNode>,
    children: Vec<Edges>,
    index: HashMap<CommitId, CommitIndex>,
    refs: BTreeMap<RootId, BTreeSet<VcsRef>>,
    current_users: BTreeMap<RootId, VcsUser>,
    roots: BTreeSet<RootId>,
    is_full: bool,
    chronological: OnceLock<Vec<CommitIndex>>,
    linearized: OnceLock<Vec<CommitIndex>>,
    topo_position: OnceLock<Vec<usize>>,
}

impl GraphSnapshot {
    /// A builder for a fully loaded snapshot; see [`SnapshotBuilder::full`].
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default().full(true)
    }

    pub fn empty(is_full: bool) -> Self {
        SnapshotBuilder::default().full(is_full).finish()
    }

    /// Process-unique identity, used in logs and to tell snapshots apart.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// False while storage holds more commits than were graphed.
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    pub fn commits(&self) -> &[CommitNode] {
        &self.commits
    }

    pub fn commit(&self, index: CommitIndex) -> Option<&CommitNode> {
        self.commits.get(index)
    }

    pub fn children(&self, index: CommitIndex) -> &[CommitIndex] {
        self.children.get(index).map_or(&[], |edges| edges.as_slice())
    }

    pub fn index_of(&self, id: &CommitId) -> Option<CommitIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.index.contains_key(id)
    }

    /// Commits whose hash starts with `prefix`, in snapshot order.
    pub fn find_by_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = CommitIndex> + 'a {
        self.commits
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.id.hash.starts_with(prefix))
            .map(|(index, _)| index)
    }

    pub fn roots(&self) -> &BTreeSet<RootId> {
        &self.roots
    }

    pub fn refs(&self, root: &RootId) -> impl Iterator<Item = &VcsRef> {
        self.refs.get(root).into_iter().flatten()
    }

    pub fn all_refs(&self) -> impl Iterator<Item = &VcsRef> {
        self.refs.values().flatten()
    }

    /// The root's own committer identity, if storage knows it.
    pub fn current_user(&self, root: &RootId) -> Option<&VcsUser> {
        self.current_users.get(root)
    }

    /// Every author and committer seen in `root`.
    pub fn users(&self, root: &RootId) -> BTreeSet<VcsUser> {
        let mut users = BTreeSet::new();
        for node in self.commits.iter().filter(|node| &node.id.root == root) {
            users.insert(node.author.clone());
            users.insert(node.committer.clone());
        }
        if let Some(me) = self.current_users.get(root) {
            users.insert(me.clone());
        }
        users
    }

    /// Every commit in the requested order. Computed once per sort mode.
    pub fn order(&self, sort: SortMode) -> &[CommitIndex] {
        match sort {
            SortMode::Chronological => self
                .chronological
                .get_or_init(|| sort::chronological(self)),
            SortMode::LinearizedMerges => {
                self.linearized.get_or_init(|| sort::linearized(self))
            }
        }
    }

    /// Position of each commit in a topological order: parents always sit
    /// after their children.
    pub(crate) fn topo_position(&self) -> &[usize] {
        self.topo_position.get_or_init(|| {
            let mut position = vec![0; self.commits.len()];
            for (pos, &index) in self.order(SortMode::Chronological).iter().enumerate() {
                position[index] = pos;
            }
            position
        })
    }

    pub fn load_fixture(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_fixture_json(&content)
    }

    pub fn from_fixture_json(json: &str) -> Result<Self> {
        let fixture: SnapshotFixture = serde_json::from_str(json)?;
        fixture.into_snapshot()
    }
}

/// Serialized form of a snapshot, used for fixtures and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFixture {
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    #[serde(default)]
    pub refs: Vec<VcsRef>,
    #[serde(default)]
    pub current_users: BTreeMap<RootId, VcsUser>,
    #[serde(default = "default_true")]
    pub is_full: bool,
}

fn default_true() -> bool {
    true
}

impl SnapshotFixture {
    pub fn into_snapshot(self) -> Result<GraphSnapshot> {
        let mut builder = SnapshotBuilder::default().full(self.is_full);
        for record in self.commits {
            builder.add_commit(record)?;
        }
        for vcs_ref in self.refs {
            builder.add_ref(vcs_ref);
        }
        for (root, user) in self.current_users {
            builder.set_current_user(root, user);
        }
        Ok(builder.finish())
    }
}

/// One commit as handed over by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: Hash,
    pub root: RootId,
    #[serde(default)]
    pub parents: Vec<Hash>,
    pub author: VcsUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<VcsUser>,
    pub timestamp: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    records: Vec<CommitRecord>,
    ids: HashMap<CommitId, CommitIndex>,
    refs: BTreeMap<RootId, BTreeSet<VcsRef>>,
    current_users: BTreeMap<RootId, VcsUser>,
    roots: BTreeSet<RootId>,
    is_full: bool,
}

impl SnapshotBuilder {
    pub fn full(mut self, is_full: bool) -> Self {
        self.is_full = is_full;
        self
    }

    pub fn add_commit(&mut self, record: CommitRecord) -> Result<&mut Self> {
        let id = CommitId::new(record.hash.clone(), record.root.clone());
        if self.ids.contains_key(&id) {
            return Err(GraphError::DuplicateCommit(id));
        }
        self.roots.insert(record.root.clone());
        self.ids.insert(id, self.records.len());
        self.records.push(record);
        Ok(self)
    }

    pub fn add_ref(&mut self, vcs_ref: VcsRef) -> &mut Self {
        self.roots.insert(vcs_ref.root.clone());
        self.refs
            .entry(vcs_ref.root.clone())
            .or_default()
            .insert(vcs_ref);
        self
    }

    pub fn set_current_user(&mut self, root: RootId, user: VcsUser) -> &mut Self {
        self.roots.insert(root.clone());
        self.current_users.insert(root, user);
        self
    }

    /// Resolves parent hashes to indices. Parents that were not loaded stay
    /// dangling; they only show up in `parent_hashes`.
    pub fn finish(self) -> GraphSnapshot {
        let SnapshotBuilder {
            records,
            ids,
            refs,
            current_users,
            roots,
            is_full,
        } = self;

        let mut children: Vec<Edges> = vec![Edges::new(); records.len()];
        let mut commits = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let mut parents = SmallVec::new();
            for parent in &record.parents {
                let parent_id = CommitId::new(parent.clone(), record.root.clone());
                if let Some(&parent_index) = ids.get(&parent_id)
                    && !parents.contains(&parent_index)
                {
                    parents.push(parent_index);
                    children[parent_index].push(index);
                }
            }
            let committer = record.committer.unwrap_or_else(|| record.author.clone());
            commits.push(CommitNode {
                id: CommitId::new(record.hash, record.root),
                parent_hashes: record.parents,
                parents,
                author: record.author,
                committer,
                timestamp: record.timestamp,
                subject: record.subject,
                paths: record.paths,
            });
        }

        GraphSnapshot {
            id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
            commits,
            children,
            index: ids,
            refs,
            current_users,
            roots,
            is_full,
            chronological: OnceLock::new(),
            linearized: OnceLock::new(),
            topo_position: OnceLock::new(),
        }
    }
}
