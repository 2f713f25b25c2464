use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tracing::warn;
use vcs_log_graph::Answer;
use vcs_log_graph::BuildError;
use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::VisibleGraph;

use crate::pipeline::ActionTicket;

/// Everything that reaches the coordinating thread from elsewhere.
#[derive(Debug)]
pub enum LogEvent {
    /// A background visible-graph build finished. `generation` echoes the
    /// request so stale results can be told apart.
    PackComputed {
        generation: u64,
        result: Result<VisibleGraph, BuildError>,
    },

    /// Storage produced a new permanent graph.
    SnapshotRefreshed(Arc<GraphSnapshot>),

    /// A structural action finished computing, cancelled or not.
    ActionComputed { ticket: ActionTicket, answer: Answer },
}

#[derive(Clone, Debug)]
pub struct LogEventSender {
    log_event_tx: UnboundedSender<LogEvent>,
}

impl LogEventSender {
    pub fn new(log_event_tx: UnboundedSender<LogEvent>) -> Self {
        Self { log_event_tx }
    }

    /// Send an event to the session. If the session is gone the event is
    /// dropped and logged.
    pub fn send(&self, event: LogEvent) {
        if let Err(err) = self.log_event_tx.send(event) {
            warn!("log session is gone, dropping event: {:?}", err.0);
        }
    }
}

pub fn log_event_channel() -> (LogEventSender, UnboundedReceiver<LogEvent>) {
    let (tx, rx) = unbounded_channel();
    (LogEventSender::new(tx), rx)
}
