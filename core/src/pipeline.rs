//! Structural actions as an explicit asynchronous flow:
//! `Submitted -> Computed -> Applied`, or `Cancelled` / `Discarded`.

use std::rc::Rc;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use vcs_log_graph::Answer;
use vcs_log_graph::GraphActionController;
use vcs_log_protocol::GraphAction;
use vcs_log_protocol::RowIndex;

use crate::event::LogEvent;
use crate::event::LogEventSender;
use crate::pack::VisiblePack;
use crate::progress::ProgressScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStage {
    Submitted,
    Computed,
    Applied,
    /// Cancelled by the user or by a newer action; nothing changed.
    Cancelled,
    /// The pack changed while the action was computing; nothing changed.
    Discarded,
    /// The action computed to no change.
    NoEffect,
}

/// What the session has to do with a finished action.
#[derive(Debug)]
pub enum ActionResolution {
    Applied {
        pack: Arc<VisiblePack>,
        selected_row: Option<RowIndex>,
    },
    Unchanged(ActionStage),
    /// Not the action this pipeline is waiting for.
    Ignored,
}

struct PendingAction {
    ticket: ActionTicket,
    action: GraphAction,
    base: Arc<VisiblePack>,
    cancel: CancellationToken,
}

pub struct ActionPipeline {
    controller: GraphActionController,
    progress: Rc<dyn ProgressScope>,
    events: LogEventSender,
    pending: Option<PendingAction>,
    last_stage: Option<ActionStage>,
    next_ticket: u64,
}

impl ActionPipeline {
    pub fn new(progress: Rc<dyn ProgressScope>, events: LogEventSender) -> Self {
        Self {
            controller: GraphActionController::new(),
            progress,
            events,
            pending: None,
            last_stage: None,
            next_ticket: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Stage the most recent action reached.
    pub fn stage(&self) -> Option<ActionStage> {
        self.last_stage
    }

    /// Starts computing `action` against `pack`. A still running action is
    /// cancelled first.
    pub fn submit(&mut self, pack: Arc<VisiblePack>, action: GraphAction) -> ActionTicket {
        self.cancel();
        self.next_ticket += 1;
        let ticket = ActionTicket(self.next_ticket);

        // Register before starting: an inline progress scope reports back
        // before `run_cancellable` returns.
        self.pending = Some(PendingAction {
            ticket,
            action,
            base: pack.clone(),
            cancel: CancellationToken::new(),
        });
        self.set_stage(ActionStage::Submitted, action);

        let controller = self.controller;
        let events = self.events.clone();
        let graph = pack.graph().clone();
        let cancel = self.progress.run_cancellable(
            action.title(),
            Box::new(move |indicator| {
                let answer = controller.perform_action(&graph, action, indicator.token());
                events.send(LogEvent::ActionComputed { ticket, answer });
            }),
        );
        if let Some(pending) = self.pending.as_mut()
            && pending.ticket == ticket
        {
            pending.cancel = cancel;
        }
        ticket
    }

    /// Cancels the running action. The current pack stays as it is.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        pending.cancel.cancel();
        self.set_stage(ActionStage::Cancelled, pending.action);
        true
    }

    /// Decides what a finished computation means against the pack that is
    /// current now.
    pub fn on_computed(
        &mut self,
        ticket: ActionTicket,
        answer: Answer,
        current: Option<&Arc<VisiblePack>>,
    ) -> ActionResolution {
        if self.pending.as_ref().is_none_or(|pending| pending.ticket != ticket) {
            trace!(?ticket, "result of a cancelled or replaced action dropped");
            return ActionResolution::Ignored;
        }
        let Some(pending) = self.pending.take() else {
            return ActionResolution::Ignored;
        };
        let action = pending.action;
        self.set_stage(ActionStage::Computed, action);

        if pending.cancel.is_cancelled() {
            return self.unchanged(ActionStage::Cancelled, action);
        }
        let Some(current) = current.filter(|current| Arc::ptr_eq(current, &pending.base)) else {
            return self.unchanged(ActionStage::Discarded, action);
        };
        let Some(updater) = answer.updater else {
            return self.unchanged(ActionStage::NoEffect, action);
        };
        if updater.base_snapshot() != current.snapshot().id() {
            return self.unchanged(ActionStage::Discarded, action);
        }

        let mut graph = current.graph().clone();
        updater.apply(&mut graph);
        self.set_stage(ActionStage::Applied, action);
        ActionResolution::Applied {
            pack: Arc::new(current.with_graph(graph)),
            selected_row: answer.selected_row,
        }
    }

    fn unchanged(&mut self, stage: ActionStage, action: GraphAction) -> ActionResolution {
        self.set_stage(stage, action);
        ActionResolution::Unchanged(stage)
    }

    fn set_stage(&mut self, stage: ActionStage, action: GraphAction) {
        debug!(?action, ?stage, "graph action stage");
        self.last_stage = Some(stage);
    }
}
