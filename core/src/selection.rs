use std::cell::RefCell;
use std::rc::Rc;

use vcs_log_protocol::CommitId;
use vcs_log_protocol::RowIndex;

use crate::model::PresentationModel;
use crate::model::ViewSignals;
use crate::pack::VisiblePack;

/// Remembers selected commits, not rows, so a selection survives a pack
/// swap. Commits that disappear from the new pack drop out of it.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    selected: Vec<CommitId>,
}

impl SelectionTracker {
    pub fn select(&mut self, pack: &VisiblePack, rows: &[RowIndex]) {
        self.selected = rows
            .iter()
            .filter_map(|&row| pack.graph().row(row))
            .map(|row| row.commit.clone())
            .collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn selected_commits(&self) -> &[CommitId] {
        &self.selected
    }

    /// Rows of the remembered commits in `pack`.
    pub fn restore(&mut self, pack: &VisiblePack) -> Vec<RowIndex> {
        let graph = pack.graph();
        self.selected.retain(|id| graph.row_of(id).is_some());
        self.selected
            .iter()
            .filter_map(|id| graph.row_of(id))
            .collect()
    }
}

/// Forwards view signals and keeps the tracker in sync with navigation.
pub(crate) struct TrackingSignals {
    view: Rc<dyn ViewSignals>,
    model: Rc<dyn PresentationModel>,
    tracker: Rc<RefCell<SelectionTracker>>,
}

impl TrackingSignals {
    pub(crate) fn new(
        view: Rc<dyn ViewSignals>,
        model: Rc<dyn PresentationModel>,
        tracker: Rc<RefCell<SelectionTracker>>,
    ) -> Self {
        Self {
            view,
            model,
            tracker,
        }
    }
}

impl ViewSignals for TrackingSignals {
    fn redraw_requested(&self) {
        self.view.redraw_requested();
    }

    fn selection_moved(&self, row: RowIndex) {
        if let Some(pack) = self.model.pack() {
            self.tracker.borrow_mut().select(&pack, &[row]);
        }
        self.view.selection_moved(row);
    }
}
