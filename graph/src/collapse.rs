//! Which merge commits are shown folded, and what folding hides.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::collections::BinaryHeap;
use std::collections::HashMap;

use vcs_log_protocol::CommitId;

use crate::snapshot::CommitIndex;
use crate::snapshot::GraphSnapshot;

/// The set of collapsed merges. The default state has every merge expanded.
///
/// Keyed by commit rather than by row so it survives re-filtering and
/// re-sorting of the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState {
    collapsed: BTreeSet<CommitId>,
}

impl CollapseState {
    pub fn is_collapsed(&self, id: &CommitId) -> bool {
        self.collapsed.contains(id)
    }

    /// Returns false when the merge was already collapsed.
    pub fn collapse(&mut self, id: CommitId) -> bool {
        self.collapsed.insert(id)
    }

    /// Returns false when the merge was not collapsed.
    pub fn expand(&mut self, id: &CommitId) -> bool {
        self.collapsed.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommitId> {
        self.collapsed.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paint {
    Main,
    Branch,
}

/// Commits brought in by `merge`'s non-first parents: reachable from one of
/// them but not from the first parent.
///
/// Commits are visited in topological position so every child is seen
/// before its parent, and `Main` paint overrides `Branch`. The walk stops
/// as soon as no `Branch` commit is left to visit, so it only goes as deep
/// as the merged branch itself.
pub(crate) fn merged_commits(snapshot: &GraphSnapshot, merge: CommitIndex) -> Vec<CommitIndex> {
    let Some(node) = snapshot.commit(merge) else {
        return Vec::new();
    };
    let Some((&first, rest)) = node.parents.split_first() else {
        return Vec::new();
    };

    let position = snapshot.topo_position();
    let mut paint: HashMap<CommitIndex, Paint> = HashMap::new();
    let mut queue = BinaryHeap::new();
    let mut pending_branch = 0usize;

    paint.insert(first, Paint::Main);
    queue.push(Reverse((position[first], first)));
    for &parent in rest {
        if paint.insert(parent, Paint::Branch).is_none() {
            queue.push(Reverse((position[parent], parent)));
            pending_branch += 1;
        }
    }

    let mut merged = Vec::new();
    while pending_branch > 0 {
        let Some(Reverse((_, index))) = queue.pop() else {
            break;
        };
        let current = paint.get(&index).copied().unwrap_or(Paint::Main);
        if current == Paint::Branch {
            pending_branch -= 1;
            merged.push(index);
        }
        let parents = snapshot
            .commit(index)
            .map(|node| node.parents.as_slice())
            .unwrap_or_default();
        for &parent in parents {
            match paint.get(&parent).copied() {
                None => {
                    paint.insert(parent, current);
                    queue.push(Reverse((position[parent], parent)));
                    if current == Paint::Branch {
                        pending_branch += 1;
                    }
                }
                Some(Paint::Branch) if current == Paint::Main => {
                    paint.insert(parent, Paint::Main);
                    pending_branch -= 1;
                }
                Some(_) => {}
            }
        }
    }
    merged
}
