//! The filtered, sorted and possibly collapsed graph a view displays.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::RowIndex;
use vcs_log_protocol::SortMode;

use crate::collapse::CollapseState;
use crate::collapse::merged_commits;
use crate::error::BuildError;
use crate::error::Cancelled;
use crate::filter::CommitFilter;
use crate::snapshot::CommitIndex;
use crate::snapshot::GraphSnapshot;
use crate::users::UserIdentityResolver;

/// How many commits are processed between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 512;

type Positions = SmallVec<[usize; 2]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub commit: CommitId,
    /// Position of the commit in the snapshot.
    pub index: CommitIndex,
    /// Rows of the nearest visible ancestors along each parent edge.
    pub parents: SmallVec<[RowIndex; 2]>,
    pub is_merge: bool,
    pub collapsed: bool,
    /// Number of commits folded under this row when it is collapsed.
    pub hidden_commits: usize,
}

/// Admitted commits in display order, before collapsing.
#[derive(Debug)]
struct AdmittedGraph {
    snapshot: Arc<GraphSnapshot>,
    sort: SortMode,
    order: Vec<CommitIndex>,
    position: HashMap<CommitIndex, usize>,
    /// Per admitted position, positions of the nearest admitted ancestors.
    parents: Vec<Positions>,
}

impl AdmittedGraph {
    /// Admitted commits hidden when `merge` (an admitted position) is collapsed.
    fn merged_positions(&self, merge: usize) -> Vec<usize> {
        let mut hidden: Vec<usize> = merged_commits(&self.snapshot, self.order[merge])
            .into_iter()
            .filter_map(|index| self.position.get(&index).copied())
            .collect();
        hidden.sort_unstable();
        hidden
    }
}

/// A visible graph. Cloning is cheap; rows are shared.
#[derive(Debug, Clone)]
pub struct VisibleGraph {
    admitted: Arc<AdmittedGraph>,
    collapse: CollapseState,
    rows: Arc<Vec<Row>>,
    row_of: Arc<HashMap<CommitId, RowIndex>>,
}

impl VisibleGraph {
    /// A graph with no rows over `snapshot`.
    pub fn empty(snapshot: Arc<GraphSnapshot>, sort: SortMode) -> Self {
        let admitted = AdmittedGraph {
            snapshot,
            sort,
            order: Vec::new(),
            position: HashMap::new(),
            parents: Vec::new(),
        };
        Self {
            admitted: Arc::new(admitted),
            collapse: CollapseState::default(),
            rows: Arc::new(Vec::new()),
            row_of: Arc::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> &Arc<GraphSnapshot> {
        &self.admitted.snapshot
    }

    pub fn sort(&self) -> SortMode {
        self.admitted.sort
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, row: RowIndex) -> Option<&Row> {
        self.rows.get(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of commits passing the filters, including collapsed ones.
    pub fn admitted_len(&self) -> usize {
        self.admitted.order.len()
    }

    pub fn row_of(&self, id: &CommitId) -> Option<RowIndex> {
        self.row_of.get(id).copied()
    }

    /// First row, in display order, whose hash starts with `prefix`.
    pub fn row_of_partial_hash(&self, prefix: &str) -> Option<RowIndex> {
        self.rows
            .iter()
            .position(|row| row.commit.hash.starts_with(prefix))
    }

    /// True when the commit passes the filters, whether or not it is folded
    /// under a collapsed merge.
    pub fn is_admitted(&self, id: &CommitId) -> bool {
        self.admitted
            .snapshot
            .index_of(id)
            .is_some_and(|index| self.admitted.position.contains_key(&index))
    }

    /// Admitted merges that fold at least one admitted commit.
    pub fn collapsible_merges(&self) -> impl Iterator<Item = &CommitId> + '_ {
        self.admitted
            .order
            .iter()
            .enumerate()
            .filter(|(position, index)| {
                self.admitted
                    .snapshot
                    .commit(**index)
                    .is_some_and(|node| node.is_merge())
                    && !self.admitted.merged_positions(*position).is_empty()
            })
            .filter_map(|(_, index)| self.admitted.snapshot.commit(*index))
            .map(|node| &node.id)
    }

    /// The same admitted commits laid out under a different collapse state.
    pub fn with_collapse(
        &self,
        collapse: CollapseState,
        cancel: &CancellationToken,
    ) -> Result<VisibleGraph, Cancelled> {
        layout(self.admitted.clone(), collapse, cancel)
    }
}

/// Builds visible graphs over one snapshot. Cheap to clone, so a copy can be
/// moved onto a worker thread.
#[derive(Clone)]
pub struct VisibleGraphBuilder {
    snapshot: Arc<GraphSnapshot>,
    resolver: Arc<UserIdentityResolver>,
}

impl VisibleGraphBuilder {
    pub fn new(snapshot: Arc<GraphSnapshot>) -> Self {
        let resolver = Arc::new(UserIdentityResolver::from_snapshot(&snapshot));
        Self { snapshot, resolver }
    }

    pub fn with_resolver(snapshot: Arc<GraphSnapshot>, resolver: Arc<UserIdentityResolver>) -> Self {
        Self { snapshot, resolver }
    }

    pub fn snapshot(&self) -> &Arc<GraphSnapshot> {
        &self.snapshot
    }

    pub fn resolver(&self) -> &Arc<UserIdentityResolver> {
        &self.resolver
    }

    /// Deterministic: the same inputs always produce the same rows.
    pub fn build(
        &self,
        filters: &FilterSet,
        sort: SortMode,
        collapse: &CollapseState,
        cancel: &CancellationToken,
    ) -> Result<VisibleGraph, BuildError> {
        let snapshot = &self.snapshot;
        let filter = CommitFilter::new(snapshot, filters, &self.resolver)?;

        let mut admitted = vec![false; snapshot.len()];
        let mut order = Vec::new();
        for (step, &index) in snapshot.order(sort).iter().enumerate() {
            check_cancel(step, cancel)?;
            if filter.admits(index) {
                admitted[index] = true;
                order.push(index);
            }
        }
        let position: HashMap<CommitIndex, usize> = order
            .iter()
            .enumerate()
            .map(|(position, &index)| (index, position))
            .collect();

        // Nearest admitted commits at or below each commit, filled oldest
        // first so parents are always ready before their children.
        let mut nearest: Vec<Positions> = vec![Positions::new(); snapshot.len()];
        let topo = snapshot.order(SortMode::Chronological);
        for (step, &index) in topo.iter().rev().enumerate() {
            check_cancel(step, cancel)?;
            if admitted[index] {
                if let Some(&own) = position.get(&index) {
                    nearest[index] = SmallVec::from_slice(&[own]);
                }
                continue;
            }
            nearest[index] = visible_parents(snapshot, index, &nearest);
        }
        let parents = order
            .iter()
            .map(|&index| visible_parents(snapshot, index, &nearest))
            .collect();

        trace!(
            snapshot = snapshot.id(),
            admitted = order.len(),
            %sort,
            "admitted commits"
        );
        let admitted = AdmittedGraph {
            snapshot: snapshot.clone(),
            sort,
            order,
            position,
            parents,
        };
        layout(Arc::new(admitted), collapse.clone(), cancel).map_err(BuildError::from)
    }
}

fn visible_parents(snapshot: &GraphSnapshot, index: CommitIndex, nearest: &[Positions]) -> Positions {
    let mut result = Positions::new();
    let parents = snapshot
        .commit(index)
        .map(|node| node.parents.as_slice())
        .unwrap_or_default();
    for &parent in parents {
        for &position in &nearest[parent] {
            if !result.contains(&position) {
                result.push(position);
            }
        }
    }
    result
}

fn check_cancel(step: usize, cancel: &CancellationToken) -> Result<(), Cancelled> {
    if step % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
        return Err(Cancelled);
    }
    Ok(())
}

fn layout(
    admitted: Arc<AdmittedGraph>,
    collapse: CollapseState,
    cancel: &CancellationToken,
) -> Result<VisibleGraph, Cancelled> {
    let snapshot = &admitted.snapshot;
    let count = admitted.order.len();

    let mut hidden = vec![false; count];
    let mut folded = vec![0usize; count];
    for id in collapse.iter() {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        let Some(position) = snapshot
            .index_of(id)
            .and_then(|index| admitted.position.get(&index).copied())
        else {
            continue;
        };
        let merged = admitted.merged_positions(position);
        folded[position] = merged.len();
        for hidden_position in merged {
            hidden[hidden_position] = true;
        }
    }

    // Hidden commits pass their parent edges through to the nearest shown
    // ancestors. Walk bottom-up so those are already resolved.
    let mut shown_below: Vec<Positions> = vec![Positions::new(); count];
    for position in (0..count).rev() {
        check_cancel(count - 1 - position, cancel)?;
        if !hidden[position] {
            shown_below[position] = SmallVec::from_slice(&[position]);
            continue;
        }
        shown_below[position] = passthrough(&admitted.parents[position], &shown_below);
    }

    let mut row_at = vec![usize::MAX; count];
    let mut next_row = 0;
    for position in 0..count {
        if !hidden[position] {
            row_at[position] = next_row;
            next_row += 1;
        }
    }

    let mut rows = Vec::with_capacity(next_row);
    let mut row_of = HashMap::with_capacity(next_row);
    for (position, &index) in admitted.order.iter().enumerate() {
        if hidden[position] {
            continue;
        }
        let Some(node) = snapshot.commit(index) else {
            continue;
        };
        let parents = passthrough(&admitted.parents[position], &shown_below)
            .into_iter()
            .map(|shown| row_at[shown])
            .collect();
        let collapsed = collapse.is_collapsed(&node.id) && folded[position] > 0;
        row_of.insert(node.id.clone(), rows.len());
        rows.push(Row {
            commit: node.id.clone(),
            index,
            parents,
            is_merge: node.is_merge(),
            collapsed,
            hidden_commits: if collapsed { folded[position] } else { 0 },
        });
    }

    Ok(VisibleGraph {
        admitted,
        collapse,
        rows: Arc::new(rows),
        row_of: Arc::new(row_of),
    })
}

fn passthrough(parents: &Positions, shown_below: &[Positions]) -> Positions {
    let mut result = Positions::new();
    for &parent in parents {
        for &shown in &shown_below[parent] {
            if !result.contains(&shown) {
                result.push(shown);
            }
        }
    }
    result
}
