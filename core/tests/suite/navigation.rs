use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use pretty_assertions::assert_eq;
use vcs_log_core::InlineProgress;
use vcs_log_core::JumpOutcome;
use vcs_log_core::LogConfig;
use vcs_log_core::NavigationState;
use vcs_log_core::NotFoundReason;
use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::test_support::TestRepo;
use vcs_log_graph::test_support::commit_id;
use vcs_log_graph::test_support::three_commit_history;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::RowIndex;

use super::harness::Harness;
use super::harness::harness;
use super::harness::harness_with;

/// Storage that first serves `c1 <- c2` as a partial load, then the full
/// three commit history.
fn loading_in_two_stages() -> Vec<Arc<GraphSnapshot>> {
    let partial = TestRepo::new("r")
        .commit("c1", &[], "bob")
        .commit("c2", &["c1"], "alice")
        .full(false)
        .build_arc();
    vec![partial, three_commit_history().build_arc()]
}

async fn started(mut h: Harness) -> Harness {
    h.session.start();
    h.session.settle().await;
    h
}

#[tokio::test]
async fn jump_to_visible_commit_selects_its_row() {
    let h = started(harness(vec![three_commit_history().build_arc()])).await;

    let outcome = h.session.jump_to(commit_id("r", "c1")).await;
    assert_eq!(outcome, JumpOutcome::Found(2));
    assert_eq!(h.session.navigation_state(), NavigationState::Found(2));
    assert_eq!(h.view.last_selection(), Some(2));
    assert_eq!(h.session.selected_rows(), vec![2]);
}

#[tokio::test]
async fn jump_waits_for_storage_to_load_the_commit() {
    let mut h = started(harness(loading_in_two_stages())).await;

    let mut handle = h.session.jump_to(commit_id("r", "c3"));
    assert_eq!(handle.try_outcome(), None);
    assert_eq!(h.session.navigation_state(), NavigationState::WaitingForPack);
    assert_eq!(h.storage.more_commit_requests(), 1);

    h.session.settle().await;
    assert_eq!(handle.await, JumpOutcome::Found(0));
    assert_eq!(h.view.last_selection(), Some(0));
}

#[tokio::test]
async fn jump_without_load_more_waits_for_the_next_pack() {
    let config = LogConfig {
        load_more_on_wait: false,
        ..LogConfig::default()
    };
    let mut h = started(harness_with(
        loading_in_two_stages(),
        config,
        Rc::new(InlineProgress),
    ))
    .await;

    let mut handle = h.session.jump_to(commit_id("r", "c3"));
    h.session.settle().await;
    assert_eq!(handle.try_outcome(), None);
    assert_eq!(h.storage.more_commit_requests(), 0);

    let full = three_commit_history().build_arc();
    h.session.on_snapshot_refreshed(full);
    h.session.settle().await;
    assert_eq!(handle.try_outcome(), Some(JumpOutcome::Found(0)));
}

#[tokio::test]
async fn unknown_commit_in_a_full_log_is_not_found() {
    let h = started(harness(vec![three_commit_history().build_arc()])).await;

    let outcome = h.session.jump_to(commit_id("r", "dead")).await;
    assert_eq!(outcome, JumpOutcome::NotFound(NotFoundReason::Unknown));
}

#[tokio::test]
async fn filtered_out_commit_is_reported_as_existing() -> Result<()> {
    let mut h = started(harness(vec![three_commit_history().build_arc()])).await;
    h.session
        .set_filters(FilterSet::default().with_users(["alice"]))?;
    h.session.settle().await;

    let outcome = h.session.jump_to(commit_id("r", "c1")).await;
    assert_eq!(outcome, JumpOutcome::NotFound(NotFoundReason::Existing));
    Ok(())
}

#[tokio::test]
async fn partial_hash_jumps() {
    let h = started(harness(vec![three_commit_history().build_arc()])).await;

    assert_eq!(
        h.session.jump_to_partial_hash("C2").await,
        JumpOutcome::Found(1)
    );
    assert_eq!(
        h.session.jump_to_partial_hash("abc").await,
        JumpOutcome::NotFound(NotFoundReason::Unknown)
    );
    assert_eq!(
        h.session.jump_to_partial_hash("not-a-hash").await,
        JumpOutcome::NotFound(NotFoundReason::Unknown)
    );
}

#[tokio::test]
async fn newer_jump_abandons_the_pending_one() {
    let config = LogConfig {
        load_more_on_wait: false,
        ..LogConfig::default()
    };
    let h = started(harness_with(
        loading_in_two_stages(),
        config,
        Rc::new(InlineProgress),
    ))
    .await;

    let first = h.session.jump_to(commit_id("r", "c3"));
    let second = h.session.jump_to(commit_id("r", "c1"));
    assert_eq!(first.await, JumpOutcome::Abandoned);
    assert_eq!(second.await, JumpOutcome::Found(1));
    let selections: Vec<RowIndex> = h.view.selections();
    assert_eq!(selections, vec![1]);
}
