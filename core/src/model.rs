use std::cell::Cell;
use std::cell::RefCell;
use std::sync::Arc;

use vcs_log_graph::Row;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::RowIndex;

use crate::pack::VisiblePack;

/// The rows a view has materialized so far. Methods take `&self`: a model
/// is shared between the session, the navigation engine and the view.
pub trait PresentationModel {
    fn pack(&self) -> Option<Arc<VisiblePack>>;

    /// True when more rows of the current pack can be materialized.
    fn can_request_more(&self) -> bool;

    /// Materializes more rows, then calls `on_done`.
    fn request_more(&self, on_done: Box<dyn FnOnce()>);

    fn row_of(&self, id: &CommitId) -> Option<RowIndex>;

    fn row_of_partial_hash(&self, prefix: &str) -> Option<RowIndex>;
}

/// Outgoing notifications to the view.
pub trait ViewSignals {
    fn redraw_requested(&self);

    fn selection_moved(&self, row: RowIndex);
}

/// Table model over the current pack that exposes rows page by page.
pub struct GraphTableModel {
    pack: RefCell<Option<Arc<VisiblePack>>>,
    page_size: usize,
    loaded: Cell<usize>,
}

impl GraphTableModel {
    pub fn new(page_size: usize) -> Self {
        Self {
            pack: RefCell::new(None),
            page_size: page_size.max(1),
            loaded: Cell::new(0),
        }
    }

    /// Switches to a new pack, keeping as many rows materialized as before
    /// (at least one page).
    pub fn set_pack(&self, pack: Arc<VisiblePack>) {
        self.loaded.set(self.loaded.get().max(self.page_size));
        *self.pack.borrow_mut() = Some(pack);
    }

    pub fn loaded_rows(&self) -> usize {
        let total = self.pack.borrow().as_ref().map_or(0, |pack| pack.graph().len());
        self.loaded.get().min(total)
    }

    /// The materialized rows.
    pub fn rows(&self) -> Vec<Row> {
        let loaded = self.loaded_rows();
        self.pack
            .borrow()
            .as_ref()
            .map(|pack| pack.graph().rows()[..loaded].to_vec())
            .unwrap_or_default()
    }

    fn materialized(&self, row: Option<RowIndex>) -> Option<RowIndex> {
        row.filter(|&row| row < self.loaded_rows())
    }
}

impl PresentationModel for GraphTableModel {
    fn pack(&self) -> Option<Arc<VisiblePack>> {
        self.pack.borrow().clone()
    }

    fn can_request_more(&self) -> bool {
        self.pack
            .borrow()
            .as_ref()
            .is_some_and(|pack| self.loaded.get() < pack.graph().len())
    }

    fn request_more(&self, on_done: Box<dyn FnOnce()>) {
        self.loaded.set(self.loaded.get() + self.page_size);
        on_done();
    }

    fn row_of(&self, id: &CommitId) -> Option<RowIndex> {
        let row = self.pack.borrow().as_ref().and_then(|pack| pack.graph().row_of(id));
        self.materialized(row)
    }

    fn row_of_partial_hash(&self, prefix: &str) -> Option<RowIndex> {
        let row = self
            .pack
            .borrow()
            .as_ref()
            .and_then(|pack| pack.graph().row_of_partial_hash(prefix));
        self.materialized(row)
    }
}

/// Records signals instead of drawing; the CLI prints from it.
#[derive(Debug, Default)]
pub struct RecordedSignals {
    redraws: Cell<usize>,
    selections: RefCell<Vec<RowIndex>>,
}

impl RecordedSignals {
    pub fn redraws(&self) -> usize {
        self.redraws.get()
    }

    pub fn selections(&self) -> Vec<RowIndex> {
        self.selections.borrow().clone()
    }

    pub fn last_selection(&self) -> Option<RowIndex> {
        self.selections.borrow().last().copied()
    }
}

impl ViewSignals for RecordedSignals {
    fn redraw_requested(&self) {
        self.redraws.set(self.redraws.get() + 1);
    }

    fn selection_moved(&self, row: RowIndex) {
        self.selections.borrow_mut().push(row);
    }
}
