//! Topological orders over a whole snapshot.
//!
//! Both orders emit a commit only after all of its children, so every
//! filtered subsequence is still topological.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::warn;

use crate::snapshot::CommitIndex;
use crate::snapshot::GraphSnapshot;

pub(crate) fn chronological(snapshot: &GraphSnapshot) -> Vec<CommitIndex> {
    let mut pending = pending_children(snapshot);
    let mut ready = BinaryHeap::new();
    for (index, count) in pending.iter().enumerate() {
        if *count == 0 {
            ready.push(ready_key(snapshot, index));
        }
    }

    let mut order = Vec::with_capacity(snapshot.len());
    while let Some((_, Reverse(index))) = ready.pop() {
        order.push(index);
        for &parent in parents(snapshot, index) {
            pending[parent] -= 1;
            if pending[parent] == 0 {
                ready.push(ready_key(snapshot, parent));
            }
        }
    }
    complete_order(snapshot, order)
}

pub(crate) fn linearized(snapshot: &GraphSnapshot) -> Vec<CommitIndex> {
    let mut pending = pending_children(snapshot);
    let mut heads: Vec<CommitIndex> = (0..snapshot.len())
        .filter(|&index| pending[index] == 0)
        .collect();
    // Oldest first so the newest head ends up on top of the stack.
    heads.sort_by_key(|&index| ready_key(snapshot, index));
    let mut stack = heads;

    let mut order = Vec::with_capacity(snapshot.len());
    while let Some(index) = stack.pop() {
        order.push(index);
        // First parent goes in first, so the merged branch is popped before
        // the mainline continues.
        for &parent in parents(snapshot, index) {
            pending[parent] -= 1;
            if pending[parent] == 0 {
                stack.push(parent);
            }
        }
    }
    complete_order(snapshot, order)
}

fn ready_key(snapshot: &GraphSnapshot, index: CommitIndex) -> (i64, Reverse<CommitIndex>) {
    let timestamp = snapshot.commit(index).map_or(i64::MIN, |node| node.timestamp);
    (timestamp, Reverse(index))
}

fn parents(snapshot: &GraphSnapshot, index: CommitIndex) -> &[CommitIndex] {
    snapshot
        .commit(index)
        .map_or(&[], |node| node.parents.as_slice())
}

fn pending_children(snapshot: &GraphSnapshot) -> Vec<usize> {
    (0..snapshot.len())
        .map(|index| snapshot.children(index).len())
        .collect()
}

/// Commits caught in a parent cycle never become ready; keep them at the end
/// in storage order so the order stays total.
fn complete_order(snapshot: &GraphSnapshot, mut order: Vec<CommitIndex>) -> Vec<CommitIndex> {
    if order.len() == snapshot.len() {
        return order;
    }
    warn!(
        snapshot = snapshot.id(),
        missing = snapshot.len() - order.len(),
        "commit graph contains a cycle; appending unordered commits"
    );
    let mut emitted = vec![false; snapshot.len()];
    for &index in &order {
        emitted[index] = true;
    }
    order.extend((0..snapshot.len()).filter(|&index| !emitted[index]));
    order
}
