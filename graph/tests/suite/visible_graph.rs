use std::collections::BTreeSet;

use anyhow::Result;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use vcs_log_graph::CollapseState;
use vcs_log_graph::GraphActionController;
use vcs_log_graph::UserIdentityResolver;
use vcs_log_graph::VisibleGraph;
use vcs_log_graph::VisibleGraphBuilder;
use vcs_log_graph::test_support::TestRepo;
use vcs_log_graph::test_support::commit_id;
use vcs_log_graph::test_support::merged_feature_history;
use vcs_log_graph::test_support::root;
use vcs_log_graph::test_support::three_commit_history;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::GraphAction;
use vcs_log_protocol::SortMode;
use vcs_log_protocol::VcsUser;

fn hashes(graph: &VisibleGraph) -> Vec<String> {
    graph
        .rows()
        .iter()
        .map(|row| row.commit.hash.to_string())
        .collect()
}

fn build(builder: &VisibleGraphBuilder, filters: &FilterSet, sort: SortMode) -> Result<VisibleGraph> {
    Ok(builder.build(filters, sort, &CollapseState::default(), &CancellationToken::new())?)
}

#[test]
fn author_filter_on_linear_history() -> Result<()> {
    let snapshot = three_commit_history().full(false).build_arc();
    let builder = VisibleGraphBuilder::new(snapshot.clone());

    let all = build(&builder, &FilterSet::default(), SortMode::Chronological)?;
    assert_eq!(hashes(&all), vec!["c3", "c2", "c1"]);

    let alice = build(
        &builder,
        &FilterSet::default().with_users(["alice"]),
        SortMode::Chronological,
    )?;
    assert_eq!(hashes(&alice), vec!["c2"]);
    assert!(alice.row(0).is_some_and(|row| row.parents.is_empty()));
    assert!(!alice.snapshot().is_full());
    Ok(())
}

#[test]
fn missing_branch_gives_empty_graph() -> Result<()> {
    let builder = VisibleGraphBuilder::new(merged_feature_history().build_arc());
    let graph = build(
        &builder,
        &FilterSet::default().with_branches(["gone"]),
        SortMode::LinearizedMerges,
    )?;
    assert!(graph.is_empty());
    assert!(graph.snapshot().is_full());
    Ok(())
}

#[test]
fn builder_is_idempotent_for_every_sort() -> Result<()> {
    let builder = VisibleGraphBuilder::new(merged_feature_history().build_arc());
    let filters = FilterSet::default().with_branches(["main"]);
    for sort in [SortMode::Chronological, SortMode::LinearizedMerges] {
        let first = build(&builder, &filters, sort)?;
        let second = build(&builder, &filters, sort)?;
        assert_eq!(first.rows(), second.rows());
        assert_eq!(first.len(), 6);
    }
    Ok(())
}

#[test]
fn me_filter_uses_synonyms_of_current_user() -> Result<()> {
    let mut repo = TestRepo::new("r").me("alice");
    let mut work = TestRepo::record("r", "bb", &[], "alice", 1);
    work.author = VcsUser::new("Someone At Work", "alice@corp.example");
    repo.add_record(work);
    let snapshot = repo
        .commit("cc", &["bb"], "alice")
        .commit("dd", &["cc"], "bob")
        .build_arc();

    let builder = VisibleGraphBuilder::new(snapshot);
    let mine = build(
        &builder,
        &FilterSet::default().with_users(["me"]),
        SortMode::Chronological,
    )?;
    assert_eq!(hashes(&mine), vec!["cc", "bb"]);
    Ok(())
}

#[test]
fn users_sharing_a_display_name_resolve_to_each_other() {
    let users: BTreeSet<VcsUser> = [
        VcsUser::new("Alice Liddell", "alice@example.com"),
        VcsUser::new("alice  LIDDELL", "a.l@elsewhere.example"),
        VcsUser::new("Al Ice", "al@example.com"),
        VcsUser::new("Bob", "bob@example.com"),
    ]
    .into_iter()
    .collect();
    let resolver = UserIdentityResolver::new(
        [(root("r"), users.clone())].into_iter().collect(),
        Default::default(),
    );

    for a in &users {
        for b in &users {
            if vcs_log_graph::normalize_name(&a.name) != vcs_log_graph::normalize_name(&b.name) {
                continue;
            }
            let from_a = resolver.resolve(&root("r"), &a.name);
            let from_b = resolver.resolve(&root("r"), &b.name);
            assert!(from_a.contains(a) && from_a.contains(b), "{a} / {b}");
            assert!(from_b.contains(a) && from_b.contains(b), "{b} / {a}");
        }
    }
}

#[test]
fn collapse_survives_rebuild_with_other_filters() -> Result<()> {
    let builder = VisibleGraphBuilder::new(merged_feature_history().build_arc());
    let graph = build(&builder, &FilterSet::default(), SortMode::Chronological)?;
    let answer = GraphActionController::new().perform_action(
        &graph,
        GraphAction::CollapseAll,
        &CancellationToken::new(),
    );
    let collapse = answer
        .updater
        .map(|updater| updater.collapse_state().clone())
        .unwrap_or_default();
    assert!(collapse.is_collapsed(&commit_id("r", "ee")));

    let rebuilt = builder.build(
        &FilterSet::default().with_branches(["main"]),
        SortMode::LinearizedMerges,
        &collapse,
        &CancellationToken::new(),
    )?;
    assert_eq!(hashes(&rebuilt), vec!["ee", "b2", "b1", "a1"]);
    Ok(())
}
