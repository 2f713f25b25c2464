use std::sync::Arc;

use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::VisibleGraph;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::SortMode;

/// What a view shows: a visible graph together with the inputs it was
/// built from. Immutable; replaced as a whole.
#[derive(Debug, Clone)]
pub struct VisiblePack {
    graph: VisibleGraph,
    filters: FilterSet,
    generation: u64,
}

impl VisiblePack {
    pub fn new(graph: VisibleGraph, filters: FilterSet, generation: u64) -> Self {
        Self {
            graph,
            filters,
            generation,
        }
    }

    /// A pack without rows, used before the first build completes.
    pub fn empty(snapshot: Arc<GraphSnapshot>, sort: SortMode) -> Self {
        Self::new(VisibleGraph::empty(snapshot, sort), FilterSet::default(), 0)
    }

    pub fn graph(&self) -> &VisibleGraph {
        &self.graph
    }

    pub fn snapshot(&self) -> &Arc<GraphSnapshot> {
        self.graph.snapshot()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort(&self) -> SortMode {
        self.graph.sort()
    }

    /// Inherited from the snapshot: false while loading more commits could
    /// still add rows.
    pub fn is_full(&self) -> bool {
        self.snapshot().is_full()
    }

    /// The filterer request this pack answers.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Same inputs, structurally edited rows.
    pub fn with_graph(&self, graph: VisibleGraph) -> Self {
        Self {
            graph,
            filters: self.filters.clone(),
            generation: self.generation,
        }
    }
}
