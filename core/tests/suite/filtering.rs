use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use vcs_log_core::LogError;
use vcs_log_graph::test_support::merged_feature_history;
use vcs_log_graph::test_support::three_commit_history;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::GraphAction;
use vcs_log_protocol::SortMode;
use vcs_log_protocol::TextFilter;

use super::harness::harness;
use super::harness::row_hashes;

#[tokio::test]
async fn first_pack_is_published_after_start() {
    let mut h = harness(vec![three_commit_history().build_arc()]);
    h.session.start();
    h.session.settle().await;

    let pack = h.session.current_pack().expect("pack published");
    assert_eq!(row_hashes(&pack), vec!["c3", "c2", "c1"]);
    assert_eq!(h.session.model().loaded_rows(), 3);
    assert_eq!(h.view.redraws(), 1);
    assert!(!h.session.is_busy());
}

#[tokio::test]
async fn rapid_filter_changes_publish_only_the_newest_pack() -> Result<()> {
    let mut h = harness(vec![three_commit_history().build_arc()]);
    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = published.clone();
    h.session.add_change_listener(move |change| {
        sink.borrow_mut()
            .push((change.pack.generation(), row_hashes(&change.pack)));
    });

    h.session.start();
    h.session.set_filters(FilterSet::default().with_users(["alice"]))?;
    h.session.set_filters(FilterSet::default().with_users(["bob"]))?;
    h.session.settle().await;

    let published = published.borrow();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1, vec!["c3", "c1"]);
    Ok(())
}

#[tokio::test]
async fn packs_never_go_back_in_time() -> Result<()> {
    let mut h = harness(vec![three_commit_history().build_arc()]);
    let generations = Rc::new(RefCell::new(Vec::new()));
    let sink = generations.clone();
    h.session
        .add_change_listener(move |change| sink.borrow_mut().push(change.pack.generation()));

    h.session.start();
    h.session.settle().await;
    for user in ["alice", "bob", "alice"] {
        h.session.set_filters(FilterSet::default().with_users([user]))?;
        h.session.settle().await;
    }
    h.session.set_sort(SortMode::LinearizedMerges);
    h.session.settle().await;

    let generations = generations.borrow();
    assert_eq!(generations.len(), 5);
    assert!(generations.windows(2).all(|pair| pair[0] < pair[1]));
    Ok(())
}

#[tokio::test]
async fn unchanged_inputs_do_not_rebuild() -> Result<()> {
    let mut h = harness(vec![three_commit_history().build_arc()]);
    h.session.start();
    h.session.settle().await;

    assert!(!h.session.set_filters(FilterSet::default())?);
    assert!(!h.session.set_sort(SortMode::Chronological));
    assert!(!h.session.is_busy());
    Ok(())
}

#[tokio::test]
async fn malformed_text_filter_is_rejected() {
    let mut h = harness(vec![three_commit_history().build_arc()]);
    h.session.start();
    h.session.settle().await;

    let result = h
        .session
        .set_filters(FilterSet::default().with_text(TextFilter::regex("(unclosed")));
    assert_matches!(result, Err(LogError::InvalidFilter(_)));
    assert!(!h.session.is_busy());
}

#[tokio::test]
async fn missing_snapshot_leaves_the_session_idle() {
    let mut h = harness(Vec::new());
    h.session.start();
    h.session.settle().await;

    assert!(h.session.current_pack().is_none());
    assert!(!h.session.is_busy());
    assert_eq!(h.view.redraws(), 0);
}

#[tokio::test]
async fn collapse_survives_filter_changes_but_not_a_new_snapshot() -> Result<()> {
    let mut h = harness(vec![merged_feature_history().build_arc()]);
    h.session.start();
    h.session.settle().await;

    h.session.perform_action(GraphAction::CollapseNode(0));
    h.session.settle().await;
    let collapsed = h.session.current_pack().expect("pack");
    assert_eq!(row_hashes(&collapsed), vec!["ee", "b2", "b1", "a1"]);

    h.session
        .set_filters(FilterSet::default().with_branches(["main"]))?;
    h.session.settle().await;
    let filtered = h.session.current_pack().expect("pack");
    assert_eq!(row_hashes(&filtered), vec!["ee", "b2", "b1", "a1"]);
    assert_eq!(filtered.graph().collapse_state().len(), 1);

    h.session
        .on_snapshot_refreshed(merged_feature_history().build_arc());
    h.session.settle().await;
    let refreshed = h.session.current_pack().expect("pack");
    assert_eq!(refreshed.graph().len(), 6);
    assert!(refreshed.graph().collapse_state().is_empty());
    Ok(())
}

#[tokio::test]
async fn selection_follows_commits_across_filter_changes() -> Result<()> {
    let mut h = harness(vec![three_commit_history().build_arc()]);
    h.session.start();
    h.session.settle().await;

    h.session.select_rows(&[1]);
    h.session
        .set_filters(FilterSet::default().with_users(["alice"]))?;
    h.session.settle().await;
    assert_eq!(h.session.selected_rows(), vec![0]);

    h.session
        .set_filters(FilterSet::default().with_users(["bob"]))?;
    h.session.settle().await;
    assert!(h.session.selected_rows().is_empty());
    Ok(())
}
