//! Recomputes the visible pack whenever its inputs change.
//!
//! Builds run on the blocking pool, one at a time. A request that arrives
//! while a build is running cancels it; the stale result is thrown away and
//! a single fresh build starts with the newest inputs. Packs are therefore
//! published in request order and never go back in time.

use std::rc::Rc;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use vcs_log_graph::BuildError;
use vcs_log_graph::CollapseState;
use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::VisibleGraph;
use vcs_log_graph::VisibleGraphBuilder;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::SortMode;

use crate::event::LogEvent;
use crate::event::LogEventSender;
use crate::pack::VisiblePack;
use crate::storage::LogStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiltererState {
    Idle,
    Computing { generation: u64, superseded: bool },
}

/// A pack ready to be published.
#[derive(Debug)]
pub struct Published {
    pub pack: Arc<VisiblePack>,
    pub permanent_graph_changed: bool,
}

pub struct Filterer {
    storage: Rc<dyn LogStorage>,
    events: LogEventSender,
    builder: Option<VisibleGraphBuilder>,
    filters: FilterSet,
    sort: SortMode,
    collapse: CollapseState,
    state: FiltererState,
    /// Generation of the newest request.
    generation: u64,
    cancel: CancellationToken,
    /// Snapshot of the last published pack.
    published_snapshot: Option<u64>,
}

impl Filterer {
    pub fn new(storage: Rc<dyn LogStorage>, events: LogEventSender, sort: SortMode) -> Self {
        Self {
            storage,
            events,
            builder: None,
            filters: FilterSet::default(),
            sort,
            collapse: CollapseState::default(),
            state: FiltererState::Idle,
            generation: 0,
            cancel: CancellationToken::new(),
            published_snapshot: None,
        }
    }

    pub fn state(&self) -> FiltererState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != FiltererState::Idle
    }

    pub fn current_filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn current_sort(&self) -> SortMode {
        self.sort
    }

    pub fn snapshot(&self) -> Option<&Arc<GraphSnapshot>> {
        self.builder.as_ref().map(VisibleGraphBuilder::snapshot)
    }

    /// Returns false when the filters are unchanged and nothing was scheduled.
    pub fn on_filters_change(&mut self, filters: FilterSet) -> bool {
        if filters == self.filters {
            trace!("filters unchanged");
            return false;
        }
        self.filters = filters;
        self.request();
        true
    }

    pub fn on_sort_type_change(&mut self, sort: SortMode) -> bool {
        if sort == self.sort {
            trace!(%sort, "sort unchanged");
            return false;
        }
        self.sort = sort;
        self.request();
        true
    }

    /// Replaces the permanent graph. Collapsed merges belong to the old
    /// graph and are reset.
    pub fn set_snapshot(&mut self, snapshot: Arc<GraphSnapshot>) -> bool {
        if self.snapshot().is_some_and(|current| current.id() == snapshot.id()) {
            return false;
        }
        self.builder = Some(VisibleGraphBuilder::new(snapshot));
        self.collapse = CollapseState::default();
        self.request();
        true
    }

    /// Records the collapse state a structural edit produced, so later
    /// rebuilds keep it. A build that is still running used the old state
    /// and is restarted.
    pub fn set_collapse_state(&mut self, collapse: CollapseState) {
        if collapse == self.collapse {
            return;
        }
        self.collapse = collapse;
        if self.is_busy() {
            self.request();
        }
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    /// Asks storage for more commits; the refreshed snapshot arrives as a
    /// [`LogEvent::SnapshotRefreshed`].
    pub fn more_commits_needed(&self) {
        debug!("requesting more commits from storage");
        self.storage.request_more_commits();
    }

    /// Rebuilds with the current inputs even if nothing changed.
    pub fn refresh(&mut self) {
        self.request();
    }

    fn request(&mut self) {
        self.generation += 1;
        match self.state {
            FiltererState::Idle => self.start(),
            FiltererState::Computing { generation, .. } => {
                trace!(running = generation, newest = self.generation, "superseding build");
                self.state = FiltererState::Computing {
                    generation,
                    superseded: true,
                };
                self.cancel.cancel();
            }
        }
    }

    fn start(&mut self) {
        if self.builder.is_none() {
            match self.storage.snapshot() {
                Ok(snapshot) => self.builder = Some(VisibleGraphBuilder::new(snapshot)),
                Err(err) => {
                    warn!("visible pack not rebuilt: {err}");
                    self.state = FiltererState::Idle;
                    return;
                }
            }
        }
        let Some(builder) = self.builder.clone() else {
            return;
        };

        let generation = self.generation;
        let filters = self.filters.clone();
        let sort = self.sort;
        let collapse = self.collapse.clone();
        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();
        self.state = FiltererState::Computing {
            generation,
            superseded: false,
        };
        debug!(generation, snapshot = builder.snapshot().id(), %sort, "building visible graph");

        let events = self.events.clone();
        tokio::task::spawn_blocking(move || {
            let result = builder.build(&filters, sort, &collapse, &cancel);
            events.send(LogEvent::PackComputed { generation, result });
        });
    }

    /// Handles a finished build. Returns the pack to publish, if any.
    pub fn on_computed(
        &mut self,
        generation: u64,
        result: Result<VisibleGraph, BuildError>,
    ) -> Option<Published> {
        let FiltererState::Computing {
            generation: running,
            superseded,
        } = self.state
        else {
            trace!(generation, "build result while idle; dropped");
            return None;
        };
        if generation != running {
            trace!(generation, running, "result of an older build; dropped");
            return None;
        }
        if superseded || generation != self.generation {
            trace!(generation, newest = self.generation, "discarding superseded build");
            self.start();
            return None;
        }

        self.state = FiltererState::Idle;
        let graph = match result {
            Ok(graph) => graph,
            Err(BuildError::Cancelled(_)) => {
                trace!(generation, "build cancelled");
                return None;
            }
            Err(BuildError::InvalidFilter(err)) => {
                warn!(generation, "visible pack not rebuilt: {err}");
                return None;
            }
        };

        // A build over a snapshot that has since been replaced is stale too.
        if self
            .snapshot()
            .is_some_and(|current| current.id() != graph.snapshot().id())
        {
            trace!(generation, "build over a replaced snapshot; rebuilding");
            self.request();
            return None;
        }

        let snapshot_id = graph.snapshot().id();
        let permanent_graph_changed = self.published_snapshot != Some(snapshot_id);
        self.published_snapshot = Some(snapshot_id);
        debug!(generation, rows = graph.len(), "visible pack ready");
        Some(Published {
            pack: Arc::new(VisiblePack::new(graph, self.filters.clone(), generation)),
            permanent_graph_changed,
        })
    }
}
