//! The coordinating owner of a log view.
//!
//! Everything here lives on one thread. Background builds and actions report
//! back through the [`LogEvent`] channel; the session applies their results,
//! publishes packs through the [`ChangeBus`] and drains the local executor
//! between events.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use vcs_log_graph::GraphSnapshot;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::GraphAction;
use vcs_log_protocol::RowIndex;
use vcs_log_protocol::SortMode;

use crate::affinity::ThreadAffinity;
use crate::bus::ChangeBus;
use crate::bus::ListenerId;
use crate::bus::PackChange;
use crate::config::LogConfig;
use crate::error::Result;
use crate::event::LogEvent;
use crate::event::LogEventSender;
use crate::executor::LocalExecutor;
use crate::filterer::Filterer;
use crate::highlight::Highlight;
use crate::highlight::MergeCommitHighlighter;
use crate::highlight::MyCommitsHighlighter;
use crate::highlight::RowHighlighter;
use crate::model::GraphTableModel;
use crate::model::ViewSignals;
use crate::navigation::JumpHandle;
use crate::navigation::NavigationEngine;
use crate::navigation::NavigationState;
use crate::pack::VisiblePack;
use crate::pipeline::ActionPipeline;
use crate::pipeline::ActionResolution;
use crate::pipeline::ActionStage;
use crate::pipeline::ActionTicket;
use crate::progress::BackgroundProgress;
use crate::progress::ProgressScope;
use crate::selection::SelectionTracker;
use crate::selection::TrackingSignals;
use crate::storage::LogStorage;

pub struct LogSessionInit {
    pub config: LogConfig,
    pub storage: Rc<dyn LogStorage>,
    pub view: Rc<dyn ViewSignals>,
    pub log_event_tx: LogEventSender,
    pub log_event_rx: UnboundedReceiver<LogEvent>,
    /// Where structural actions run; defaults to the blocking pool.
    pub progress: Option<Rc<dyn ProgressScope>>,
    /// Defaults to the highlighters enabled in `config`.
    pub highlighters: Option<Vec<Box<dyn RowHighlighter>>>,
}

impl LogSessionInit {
    pub fn new(
        config: LogConfig,
        storage: Rc<dyn LogStorage>,
        view: Rc<dyn ViewSignals>,
        log_event_tx: LogEventSender,
        log_event_rx: UnboundedReceiver<LogEvent>,
    ) -> Self {
        Self {
            config,
            storage,
            view,
            log_event_tx,
            log_event_rx,
            progress: None,
            highlighters: None,
        }
    }
}

pub struct LogSession {
    log_event_rx: UnboundedReceiver<LogEvent>,
    executor: LocalExecutor,
    bus: ChangeBus,
    filterer: Rc<RefCell<Filterer>>,
    navigation: NavigationEngine,
    model: Rc<GraphTableModel>,
    signals: Rc<dyn ViewSignals>,
    selection: Rc<RefCell<SelectionTracker>>,
    highlighters: Vec<Box<dyn RowHighlighter>>,
    pipeline: ActionPipeline,
    current: Option<Arc<VisiblePack>>,
    affinity: ThreadAffinity,
}

impl LogSession {
    pub fn new(init: LogSessionInit) -> Self {
        let LogSessionInit {
            config,
            storage,
            view,
            log_event_tx,
            log_event_rx,
            progress,
            highlighters,
        } = init;

        let executor = LocalExecutor::new();
        let bus = ChangeBus::new();
        let model = Rc::new(GraphTableModel::new(config.page_size));
        let selection = Rc::new(RefCell::new(SelectionTracker::default()));
        let signals: Rc<dyn ViewSignals> = Rc::new(TrackingSignals::new(
            view,
            model.clone(),
            selection.clone(),
        ));
        let filterer = Rc::new(RefCell::new(Filterer::new(
            storage,
            log_event_tx.clone(),
            config.default_sort,
        )));

        let load_more: Option<Box<dyn Fn()>> = if config.load_more_on_wait {
            let filterer = Rc::downgrade(&filterer);
            Some(Box::new(move || {
                if let Some(filterer) = filterer.upgrade() {
                    filterer.borrow().more_commits_needed();
                }
            }))
        } else {
            None
        };
        let navigation = NavigationEngine::with_load_more(
            model.clone(),
            signals.clone(),
            bus.clone(),
            executor.clone(),
            load_more,
        );

        let progress = progress.unwrap_or_else(|| Rc::new(BackgroundProgress));
        let highlighters = highlighters.unwrap_or_else(|| default_highlighters(&config));

        Self {
            log_event_rx,
            executor,
            bus,
            filterer,
            navigation,
            model,
            signals,
            selection,
            highlighters,
            pipeline: ActionPipeline::new(progress, log_event_tx),
            current: None,
            affinity: ThreadAffinity::current(),
        }
    }

    /// Kicks off the first build, fetching the snapshot from storage.
    pub fn start(&mut self) {
        self.filterer.borrow_mut().refresh();
    }

    pub fn current_pack(&self) -> Option<Arc<VisiblePack>> {
        self.affinity.assert("LogSession");
        self.current.clone()
    }

    pub fn add_change_listener(&self, listener: impl FnMut(&PackChange) + 'static) -> ListenerId {
        self.bus.add_listener(listener)
    }

    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    pub fn jump_to(&self, id: CommitId) -> JumpHandle {
        self.navigation.jump_to(id)
    }

    pub fn jump_to_partial_hash(&self, prefix: &str) -> JumpHandle {
        self.navigation.jump_to_partial_hash(prefix)
    }

    pub fn cancel_jump(&self) {
        self.navigation.cancel();
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigation.state()
    }

    /// Starts a structural action on the current pack. `None` when there is
    /// no pack yet.
    pub fn perform_action(&mut self, action: GraphAction) -> Option<ActionTicket> {
        self.affinity.assert("LogSession");
        let pack = self.current.clone()?;
        Some(self.pipeline.submit(pack, action))
    }

    pub fn cancel_action(&mut self) -> bool {
        self.pipeline.cancel()
    }

    pub fn action_stage(&self) -> Option<ActionStage> {
        self.pipeline.stage()
    }

    /// Returns false when the filters did not change.
    pub fn set_filters(&mut self, filters: FilterSet) -> Result<bool> {
        filters.validate()?;
        Ok(self.filterer.borrow_mut().on_filters_change(filters))
    }

    pub fn set_sort(&mut self, sort: SortMode) -> bool {
        self.filterer.borrow_mut().on_sort_type_change(sort)
    }

    pub fn on_snapshot_refreshed(&mut self, snapshot: Arc<GraphSnapshot>) {
        debug!(snapshot = snapshot.id(), commits = snapshot.len(), "snapshot refreshed");
        self.filterer.borrow_mut().set_snapshot(snapshot);
    }

    pub fn model(&self) -> &GraphTableModel {
        &self.model
    }

    pub fn select_rows(&self, rows: &[RowIndex]) {
        if let Some(pack) = &self.current {
            self.selection.borrow_mut().select(pack, rows);
        }
    }

    /// Rows of the selected commits that are still visible.
    pub fn selected_rows(&self) -> Vec<RowIndex> {
        match &self.current {
            Some(pack) => self.selection.borrow_mut().restore(pack),
            None => Vec::new(),
        }
    }

    pub fn highlights(&self, row: RowIndex) -> Vec<Highlight> {
        let Some(pack) = &self.current else {
            return Vec::new();
        };
        let Some(row) = pack.graph().row(row) else {
            return Vec::new();
        };
        self.highlighters
            .iter()
            .filter_map(|highlighter| highlighter.highlight(pack.snapshot(), row))
            .collect()
    }

    /// True while a build or a structural action is in flight.
    pub fn is_busy(&self) -> bool {
        self.filterer.borrow().is_busy() || self.pipeline.is_busy()
    }

    pub async fn next_event(&mut self) -> Option<LogEvent> {
        self.log_event_rx.recv().await
    }

    pub fn handle_event(&mut self, event: LogEvent) {
        self.affinity.assert("LogSession");
        match event {
            LogEvent::PackComputed { generation, result } => {
                let published = self.filterer.borrow_mut().on_computed(generation, result);
                if let Some(published) = published {
                    self.publish(published.pack, published.permanent_graph_changed);
                }
            }
            LogEvent::SnapshotRefreshed(snapshot) => self.on_snapshot_refreshed(snapshot),
            LogEvent::ActionComputed { ticket, answer } => {
                let resolution = self.pipeline.on_computed(ticket, answer, self.current.as_ref());
                if let ActionResolution::Applied { pack, selected_row } = resolution {
                    let collapse = pack.graph().collapse_state().clone();
                    self.filterer.borrow_mut().set_collapse_state(collapse);
                    self.publish(pack, false);
                    if let Some(row) = selected_row {
                        self.signals.selection_moved(row);
                    }
                }
            }
        }
        self.executor.run_pending();
    }

    /// Handles events until no build or action is in flight and nothing is
    /// queued.
    pub async fn settle(&mut self) {
        loop {
            self.executor.run_pending();
            let event = if self.is_busy() {
                match self.log_event_rx.recv().await {
                    Some(event) => event,
                    None => return,
                }
            } else {
                match self.log_event_rx.try_recv() {
                    Ok(event) => event,
                    Err(_) => return,
                }
            };
            self.handle_event(event);
        }
    }

    fn publish(&mut self, pack: Arc<VisiblePack>, permanent_graph_changed: bool) {
        debug!(
            generation = pack.generation(),
            rows = pack.graph().len(),
            permanent_graph_changed,
            "publishing visible pack"
        );
        self.model.set_pack(pack.clone());
        self.current = Some(pack.clone());
        for highlighter in &mut self.highlighters {
            highlighter.update(&pack, permanent_graph_changed);
        }
        self.bus.dispatch(&PackChange {
            pack,
            permanent_graph_changed,
        });
        self.signals.redraw_requested();
    }
}

fn default_highlighters(config: &LogConfig) -> Vec<Box<dyn RowHighlighter>> {
    let mut highlighters: Vec<Box<dyn RowHighlighter>> = Vec::new();
    if config.highlight_merges {
        highlighters.push(Box::new(MergeCommitHighlighter));
    }
    if config.highlight_my_commits {
        highlighters.push(Box::new(MyCommitsHighlighter::default()));
    }
    highlighters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::log_event_channel;
    use crate::model::RecordedSignals;
    use crate::progress::InlineProgress;
    use crate::storage::StagedStorage;
    use vcs_log_graph::test_support::three_commit_history;

    fn session() -> LogSession {
        let (tx, rx) = log_event_channel();
        let storage = Rc::new(StagedStorage::new([three_commit_history().build_arc()], tx.clone()));
        let view = Rc::new(RecordedSignals::default());
        let mut init = LogSessionInit::new(LogConfig::default(), storage, view, tx, rx);
        init.progress = Some(Rc::new(InlineProgress));
        LogSession::new(init)
    }

    #[tokio::test]
    async fn session_is_bound_to_the_thread_that_built_it() {
        let mut session = session();
        session.start();
        session.settle().await;
        assert!(session.current_pack().is_some());

        let affinity = session.affinity;
        let result = std::thread::spawn(move || affinity.assert("LogSession")).join();
        assert!(result.is_err());
    }
}
