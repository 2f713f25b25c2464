use std::collections::BTreeMap;
use std::collections::BTreeSet;

use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::Row;
use vcs_log_graph::UserIdentityResolver;
use vcs_log_protocol::ME_TOKEN;
use vcs_log_protocol::RootId;
use vcs_log_protocol::VcsUser;

use crate::pack::VisiblePack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Highlight {
    Merge,
    MyCommit,
}

/// Decorates rows of the current pack. Highlighters are handed to the
/// session at construction and refreshed on every pack change.
pub trait RowHighlighter {
    fn update(&mut self, pack: &VisiblePack, permanent_graph_changed: bool);

    fn highlight(&self, snapshot: &GraphSnapshot, row: &Row) -> Option<Highlight>;
}

#[derive(Debug, Default)]
pub struct MergeCommitHighlighter;

impl RowHighlighter for MergeCommitHighlighter {
    fn update(&mut self, _pack: &VisiblePack, _permanent_graph_changed: bool) {}

    fn highlight(&self, _snapshot: &GraphSnapshot, row: &Row) -> Option<Highlight> {
        row.is_merge.then_some(Highlight::Merge)
    }
}

/// Marks commits authored by the current user of their root. Stays quiet
/// when the log is already filtered down to "me", or when a root has a
/// single author, since every row would light up.
#[derive(Debug, Default)]
pub struct MyCommitsHighlighter {
    mine: BTreeMap<RootId, BTreeSet<VcsUser>>,
    enabled: bool,
}

impl RowHighlighter for MyCommitsHighlighter {
    fn update(&mut self, pack: &VisiblePack, permanent_graph_changed: bool) {
        let filtered_to_me = pack
            .filters()
            .users
            .as_ref()
            .is_some_and(|users| users.len() == 1 && users.contains(ME_TOKEN));
        self.enabled = !filtered_to_me;
        if !permanent_graph_changed && !self.mine.is_empty() {
            return;
        }

        let snapshot = pack.snapshot();
        let resolver = UserIdentityResolver::from_snapshot(snapshot);
        self.mine = snapshot
            .roots()
            .iter()
            .filter(|root| snapshot.users(root).len() > 1)
            .map(|root| (root.clone(), resolver.resolve(root, ME_TOKEN)))
            .filter(|(_, users)| !users.is_empty())
            .collect();
    }

    fn highlight(&self, snapshot: &GraphSnapshot, row: &Row) -> Option<Highlight> {
        if !self.enabled {
            return None;
        }
        let node = snapshot.commit(row.index)?;
        self.mine
            .get(&node.id.root)
            .is_some_and(|users| users.contains(&node.author))
            .then_some(Highlight::MyCommit)
    }
}
