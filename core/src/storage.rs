use std::cell::Cell;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;
use vcs_log_graph::GraphSnapshot;

use crate::error::LogError;
use crate::error::Result;
use crate::event::LogEvent;
use crate::event::LogEventSender;

/// Source of permanent graphs. Called on the coordinating thread only.
pub trait LogStorage {
    /// The latest snapshot, if storage has produced one.
    fn snapshot(&self) -> Result<Arc<GraphSnapshot>>;

    /// Asks storage to load further commits. The refreshed snapshot comes
    /// back later as [`LogEvent::SnapshotRefreshed`].
    fn request_more_commits(&self);
}

/// Storage that serves a fixed sequence of snapshots: the first is current,
/// each `request_more_commits` publishes the next one. Used by the CLI and
/// by tests that model incremental loading.
pub struct StagedStorage {
    current: RefCell<Option<Arc<GraphSnapshot>>>,
    upcoming: RefCell<VecDeque<Arc<GraphSnapshot>>>,
    events: LogEventSender,
    requests: Cell<usize>,
}

impl StagedStorage {
    pub fn new(stages: impl IntoIterator<Item = Arc<GraphSnapshot>>, events: LogEventSender) -> Self {
        let mut upcoming: VecDeque<_> = stages.into_iter().collect();
        let current = upcoming.pop_front();
        Self {
            current: RefCell::new(current),
            upcoming: RefCell::new(upcoming),
            events,
            requests: Cell::new(0),
        }
    }

    /// Storage that has nothing to offer yet.
    pub fn unavailable(events: LogEventSender) -> Self {
        Self::new(Vec::new(), events)
    }

    pub fn more_commit_requests(&self) -> usize {
        self.requests.get()
    }
}

impl LogStorage for StagedStorage {
    fn snapshot(&self) -> Result<Arc<GraphSnapshot>> {
        self.current
            .borrow()
            .clone()
            .ok_or_else(|| LogError::SnapshotUnavailable("storage holds no commits yet".to_string()))
    }

    fn request_more_commits(&self) {
        self.requests.set(self.requests.get() + 1);
        let Some(next) = self.upcoming.borrow_mut().pop_front() else {
            debug!("storage has no further commits to load");
            return;
        };
        *self.current.borrow_mut() = Some(next.clone());
        self.events.send(LogEvent::SnapshotRefreshed(next));
    }
}
