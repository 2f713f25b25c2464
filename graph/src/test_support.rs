//! Small builders for commit graphs used across the workspace's tests.

use std::sync::Arc;

use vcs_log_protocol::CommitId;
use vcs_log_protocol::Hash;
use vcs_log_protocol::RefType;
use vcs_log_protocol::RootId;
use vcs_log_protocol::SortMode;
use vcs_log_protocol::VcsRef;
use vcs_log_protocol::VcsUser;

use crate::snapshot::CommitRecord;
use crate::snapshot::GraphSnapshot;
use crate::snapshot::SnapshotBuilder;

#[allow(clippy::expect_used)]
pub fn root(name: &str) -> RootId {
    RootId::new(name).expect("test root id")
}

#[allow(clippy::expect_used)]
pub fn hash(text: &str) -> Hash {
    Hash::parse(text).expect("test hash")
}

pub fn commit_id(root_name: &str, text: &str) -> CommitId {
    CommitId::new(hash(text), root(root_name))
}

/// `alice` becomes `Alice <alice@example.com>`.
pub fn user(login: &str) -> VcsUser {
    let mut name = login.to_string();
    if let Some(first) = name.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    VcsUser::new(name, format!("{login}@example.com"))
}

/// Linear-time fixture builder: every `commit` call gets the next timestamp.
pub struct TestRepo {
    root: String,
    builder: SnapshotBuilder,
    clock: i64,
}

impl TestRepo {
    pub fn new(root_name: &str) -> Self {
        Self {
            root: root_name.to_string(),
            builder: GraphSnapshot::builder(),
            clock: 0,
        }
    }

    pub fn record(
        root_name: &str,
        text: &str,
        parents: &[&str],
        author: &str,
        timestamp: i64,
    ) -> CommitRecord {
        CommitRecord {
            hash: hash(text),
            root: root(root_name),
            parents: parents.iter().map(|parent| hash(parent)).collect(),
            author: user(author),
            committer: None,
            timestamp,
            subject: format!("commit {text}"),
            paths: Vec::new(),
        }
    }

    pub fn commit(self, text: &str, parents: &[&str], author: &str) -> Self {
        self.commit_touching(text, parents, author, &[])
    }

    #[allow(clippy::expect_used)]
    pub fn commit_touching(
        mut self,
        text: &str,
        parents: &[&str],
        author: &str,
        paths: &[&str],
    ) -> Self {
        self.clock += 1;
        let mut record = Self::record(&self.root, text, parents, author, self.clock);
        record.paths = paths.iter().map(|path| (*path).to_string()).collect();
        self.builder.add_commit(record).expect("unique test commit");
        self
    }

    #[allow(clippy::expect_used)]
    pub fn add_record(&mut self, record: CommitRecord) -> &mut Self {
        self.builder.add_commit(record).expect("unique test commit");
        self
    }

    pub fn branch(mut self, name: &str, text: &str) -> Self {
        self.builder.add_ref(VcsRef::new(
            hash(text),
            name,
            RefType::LocalBranch,
            root(&self.root),
        ));
        self
    }

    pub fn me(mut self, login: &str) -> Self {
        self.builder.set_current_user(root(&self.root), user(login));
        self
    }

    pub fn full(mut self, is_full: bool) -> Self {
        self.builder = self.builder.full(is_full);
        self
    }

    pub fn build(self) -> GraphSnapshot {
        self.builder.finish()
    }

    pub fn build_arc(self) -> Arc<GraphSnapshot> {
        Arc::new(self.build())
    }
}

pub fn hashes_in_order(snapshot: &GraphSnapshot, sort: SortMode) -> Vec<String> {
    snapshot
        .order(sort)
        .iter()
        .filter_map(|&index| snapshot.commit(index))
        .map(|node| node.id.hash.to_string())
        .collect()
}

/// `c1 <- c2 <- c3` on root `r`, with `c2` authored by alice and `main` at `c3`.
pub fn three_commit_history() -> TestRepo {
    TestRepo::new("r")
        .commit("c1", &[], "bob")
        .commit("c2", &["c1"], "alice")
        .commit("c3", &["c2"], "bob")
        .branch("main", "c3")
}

/// A merge of a two-commit feature branch:
///
/// ```text
/// ee (merge, main)
/// | \
/// b2  f2
/// |   |
/// b1  f1
/// | /
/// a1
/// ```
pub fn merged_feature_history() -> TestRepo {
    TestRepo::new("r")
        .commit("a1", &[], "alice")
        .commit("f1", &["a1"], "bob")
        .commit("b1", &["a1"], "alice")
        .commit("f2", &["f1"], "bob")
        .commit("b2", &["b1"], "alice")
        .commit("ee", &["b2", "f2"], "alice")
        .branch("main", "ee")
        .branch("feature", "f2")
}

/// `ee` merges `f2`, which itself merges the side commit `91` back into the
/// feature branch.
pub fn nested_merge_history() -> TestRepo {
    TestRepo::new("r")
        .commit("a1", &[], "alice")
        .commit("f1", &["a1"], "bob")
        .commit("91", &["f1"], "carol")
        .commit("f2", &["f1", "91"], "bob")
        .commit("b1", &["a1"], "alice")
        .commit("ee", &["b1", "f2"], "alice")
        .branch("main", "ee")
        .branch("feature", "f2")
}
