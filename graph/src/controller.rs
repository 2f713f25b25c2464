use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::GraphAction;
use vcs_log_protocol::RowIndex;

use crate::collapse::CollapseState;
use crate::visible::VisibleGraph;

/// Result of a structural action. No updater means the action had no effect
/// (or was cancelled) and the graph must stay as it is.
#[derive(Debug, Default)]
pub struct Answer {
    pub selected_row: Option<RowIndex>,
    pub updater: Option<Updater>,
}

impl Answer {
    fn none() -> Self {
        Self::default()
    }

    pub fn has_effect(&self) -> bool {
        self.updater.is_some()
    }
}

/// A computed structural edit waiting to be committed. Applying it is the
/// only way the row list of a visible graph changes outside a rebuild.
pub struct Updater {
    action: GraphAction,
    base_snapshot: u64,
    replacement: VisibleGraph,
}

impl Updater {
    pub fn action(&self) -> GraphAction {
        self.action
    }

    /// Id of the snapshot the edit was computed against.
    pub fn base_snapshot(&self) -> u64 {
        self.base_snapshot
    }

    pub fn collapse_state(&self) -> &CollapseState {
        self.replacement.collapse_state()
    }

    pub fn apply(self, graph: &mut VisibleGraph) {
        *graph = self.replacement;
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("action", &self.action)
            .field("base_snapshot", &self.base_snapshot)
            .field("rows", &self.replacement.len())
            .finish()
    }
}

/// Computes expand/collapse edits. Stateless; the edit state travels with
/// the graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphActionController;

impl GraphActionController {
    pub fn new() -> Self {
        Self
    }

    /// Expensive: re-lays out every admitted commit. Run it off the
    /// coordinating thread and apply the updater back on it.
    pub fn perform_action(
        &self,
        graph: &VisibleGraph,
        action: GraphAction,
        cancel: &CancellationToken,
    ) -> Answer {
        let Some(edit) = plan(graph, action) else {
            warn!(?action, "graph action had no effect");
            return Answer::none();
        };

        let replacement = match graph.with_collapse(edit.state, cancel) {
            Ok(replacement) => replacement,
            Err(_) => {
                debug!(?action, "graph action cancelled");
                return Answer::none();
            }
        };
        // Rows can stay put when the edit only touches merges that are
        // hidden by filters or folded under another merge.
        let changed = replacement.collapse_state() != graph.collapse_state();
        debug_assert!(changed, "{action:?} implied a mutation but left the collapse state unchanged");
        if !changed {
            warn!(?action, "graph action had no effect");
            return Answer::none();
        }

        let selected_row = edit
            .select
            .as_ref()
            .and_then(|id| replacement.row_of(id));
        Answer {
            selected_row,
            updater: Some(Updater {
                action,
                base_snapshot: graph.snapshot().id(),
                replacement,
            }),
        }
    }
}

struct Edit {
    state: CollapseState,
    select: Option<CommitId>,
}

/// The collapse state the action leads to, or `None` when it would change
/// nothing.
fn plan(graph: &VisibleGraph, action: GraphAction) -> Option<Edit> {
    let current = graph.collapse_state();
    match action {
        GraphAction::ExpandAll => (!current.is_empty()).then(|| Edit {
            state: CollapseState::default(),
            select: None,
        }),
        GraphAction::CollapseAll => {
            let mut state = current.clone();
            let mut changed = false;
            for id in graph.collapsible_merges() {
                if graph.row_of(id).is_some() {
                    changed |= state.collapse(id.clone());
                }
            }
            changed.then_some(Edit { state, select: None })
        }
        GraphAction::ExpandNode(row) => {
            let row = graph.row(row)?;
            if !row.collapsed {
                return None;
            }
            let mut state = current.clone();
            state.expand(&row.commit);
            Some(Edit {
                state,
                select: Some(row.commit.clone()),
            })
        }
        GraphAction::CollapseNode(row) => {
            let row = graph.row(row)?;
            if !row.is_merge || row.collapsed {
                return None;
            }
            let id = row.commit.clone();
            if !graph.collapsible_merges().any(|merge| merge == &id) {
                return None;
            }
            let mut state = current.clone();
            state.collapse(id.clone());
            Some(Edit {
                state,
                select: Some(id),
            })
        }
    }
}
