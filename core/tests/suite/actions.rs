use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use pretty_assertions::assert_eq;
use vcs_log_core::ActionStage;
use vcs_log_core::BackgroundProgress;
use vcs_log_core::Highlight;
use vcs_log_core::LogConfig;
use vcs_log_graph::test_support::merged_feature_history;
use vcs_log_graph::test_support::nested_merge_history;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::GraphAction;

use super::harness::DeferredProgress;
use super::harness::harness;
use super::harness::harness_with;
use super::harness::row_hashes;

#[tokio::test]
async fn collapse_and_expand_all() {
    let mut h = harness(vec![merged_feature_history().build_arc()]);
    h.session.start();
    h.session.settle().await;
    let redraws = h.view.redraws();

    assert!(h.session.perform_action(GraphAction::CollapseAll).is_some());
    h.session.settle().await;
    let collapsed = h.session.current_pack().expect("pack");
    assert_eq!(row_hashes(&collapsed), vec!["ee", "b2", "b1", "a1"]);
    assert_eq!(h.session.action_stage(), Some(ActionStage::Applied));
    assert_eq!(h.view.redraws(), redraws + 1);

    h.session.perform_action(GraphAction::ExpandAll);
    h.session.settle().await;
    let expanded = h.session.current_pack().expect("pack");
    assert_eq!(expanded.graph().len(), 6);
    assert_eq!(expanded.generation(), collapsed.generation());
}

#[tokio::test]
async fn action_without_a_pack_is_refused() {
    let mut h = harness(vec![merged_feature_history().build_arc()]);
    assert!(h.session.perform_action(GraphAction::CollapseAll).is_none());
}

#[tokio::test]
async fn expanding_a_plain_row_changes_nothing() {
    let mut h = harness(vec![merged_feature_history().build_arc()]);
    h.session.start();
    h.session.settle().await;
    let before = h.session.current_pack().expect("pack");

    h.session.perform_action(GraphAction::ExpandNode(1));
    h.session.settle().await;
    assert_eq!(h.session.action_stage(), Some(ActionStage::NoEffect));
    assert!(Arc::ptr_eq(&before, &h.session.current_pack().expect("pack")));
}

#[tokio::test]
async fn cancelled_action_leaves_the_pack_untouched() {
    let progress = Rc::new(DeferredProgress::default());
    let mut h = harness_with(
        vec![merged_feature_history().build_arc()],
        LogConfig::default(),
        progress.clone(),
    );
    h.session.start();
    h.session.settle().await;
    let before = h.session.current_pack().expect("pack");

    h.session.perform_action(GraphAction::CollapseAll);
    assert!(h.session.cancel_action());
    progress.run_all();
    h.session.settle().await;

    assert_eq!(h.session.action_stage(), Some(ActionStage::Cancelled));
    assert!(Arc::ptr_eq(&before, &h.session.current_pack().expect("pack")));
    assert!(!h.session.cancel_action());
}

#[tokio::test]
async fn action_on_a_replaced_pack_is_discarded() -> Result<()> {
    let progress = Rc::new(DeferredProgress::default());
    let mut h = harness_with(
        vec![merged_feature_history().build_arc()],
        LogConfig::default(),
        progress.clone(),
    );
    h.session.start();
    h.session.settle().await;

    h.session.perform_action(GraphAction::CollapseAll);
    h.session
        .set_filters(FilterSet::default().with_users(["bob"]))?;
    let event = h.session.next_event().await.expect("pack computed");
    h.session.handle_event(event);
    let filtered = h.session.current_pack().expect("pack");
    assert_eq!(row_hashes(&filtered), vec!["f2", "f1"]);

    progress.run_all();
    h.session.settle().await;
    assert_eq!(h.session.action_stage(), Some(ActionStage::Discarded));
    assert!(Arc::ptr_eq(&filtered, &h.session.current_pack().expect("pack")));
    Ok(())
}

#[tokio::test]
async fn collapse_node_moves_the_selection_to_the_merge() {
    let mut h = harness(vec![merged_feature_history().build_arc()]);
    h.session.start();
    h.session.settle().await;
    h.session.select_rows(&[3]);

    h.session.perform_action(GraphAction::CollapseNode(0));
    h.session.settle().await;
    assert_eq!(h.view.last_selection(), Some(0));
    assert_eq!(h.session.current_pack().expect("pack").graph().len(), 4);
    assert_eq!(h.session.selected_rows(), vec![0]);
}

#[tokio::test]
async fn rows_are_highlighted() {
    let mut h = harness(vec![merged_feature_history().me("bob").build_arc()]);
    h.session.start();
    h.session.settle().await;

    assert_eq!(h.session.highlights(0), vec![Highlight::Merge]);
    assert_eq!(h.session.highlights(2), vec![Highlight::MyCommit]);
    assert!(h.session.highlights(1).is_empty());
    assert!(h.session.highlights(42).is_empty());
}

#[tokio::test]
async fn collapse_all_under_a_collapsed_outer_merge_settles() {
    let mut h = harness_with(
        vec![nested_merge_history().build_arc()],
        LogConfig::default(),
        Rc::new(BackgroundProgress),
    );
    h.session.start();
    h.session.settle().await;
    h.session.perform_action(GraphAction::CollapseNode(0));
    h.session.settle().await;
    let collapsed = h.session.current_pack().expect("pack");
    assert_eq!(row_hashes(&collapsed), vec!["ee", "b1", "a1"]);

    h.session.perform_action(GraphAction::CollapseAll);
    h.session.settle().await;
    assert_eq!(h.session.action_stage(), Some(ActionStage::NoEffect));
    assert!(!h.session.is_busy());
    assert!(Arc::ptr_eq(&collapsed, &h.session.current_pack().expect("pack")));
}

#[tokio::test]
async fn expand_all_reaches_merges_hidden_by_filters() -> Result<()> {
    let mut h = harness(vec![merged_feature_history().build_arc()]);
    h.session.start();
    h.session.settle().await;
    h.session.perform_action(GraphAction::CollapseNode(0));
    h.session.settle().await;

    h.session
        .set_filters(FilterSet::default().with_branches(["feature"]))?;
    h.session.settle().await;
    assert_eq!(
        row_hashes(&h.session.current_pack().expect("pack")),
        vec!["f2", "f1", "a1"]
    );

    h.session.perform_action(GraphAction::ExpandAll);
    h.session.settle().await;
    assert_eq!(h.session.action_stage(), Some(ActionStage::Applied));

    h.session.set_filters(FilterSet::default())?;
    h.session.settle().await;
    let pack = h.session.current_pack().expect("pack");
    assert_eq!(pack.graph().len(), 6);
    assert!(pack.graph().rows().iter().all(|row| !row.collapsed));
    Ok(())
}
