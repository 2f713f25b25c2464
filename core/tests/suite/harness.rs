use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vcs_log_core::InlineProgress;
use vcs_log_core::LogConfig;
use vcs_log_core::LogSession;
use vcs_log_core::LogSessionInit;
use vcs_log_core::ProgressBody;
use vcs_log_core::ProgressIndicator;
use vcs_log_core::ProgressScope;
use vcs_log_core::RecordedSignals;
use vcs_log_core::StagedStorage;
use vcs_log_core::VisiblePack;
use vcs_log_core::log_event_channel;
use vcs_log_graph::GraphSnapshot;

pub(crate) struct Harness {
    pub session: LogSession,
    pub storage: Rc<StagedStorage>,
    pub view: Rc<RecordedSignals>,
}

pub(crate) fn harness(stages: Vec<Arc<GraphSnapshot>>) -> Harness {
    harness_with(stages, LogConfig::default(), Rc::new(InlineProgress))
}

pub(crate) fn harness_with(
    stages: Vec<Arc<GraphSnapshot>>,
    config: LogConfig,
    progress: Rc<dyn ProgressScope>,
) -> Harness {
    let (tx, rx) = log_event_channel();
    let storage = Rc::new(StagedStorage::new(stages, tx.clone()));
    let view = Rc::new(RecordedSignals::default());
    let mut init = LogSessionInit::new(config, storage.clone(), view.clone(), tx, rx);
    init.progress = Some(progress);
    Harness {
        session: LogSession::new(init),
        storage,
        view,
    }
}

/// Holds action bodies until the test releases them.
#[derive(Default)]
pub(crate) struct DeferredProgress {
    bodies: RefCell<Vec<(ProgressIndicator, ProgressBody)>>,
}

impl DeferredProgress {
    pub fn run_all(&self) {
        let bodies = std::mem::take(&mut *self.bodies.borrow_mut());
        for (indicator, body) in bodies {
            body(indicator);
        }
    }
}

impl ProgressScope for DeferredProgress {
    fn run_cancellable(&self, title: &str, body: ProgressBody) -> CancellationToken {
        let indicator = ProgressIndicator::new(title);
        let token = indicator.token().clone();
        self.bodies.borrow_mut().push((indicator, body));
        token
    }
}

pub(crate) fn row_hashes(pack: &VisiblePack) -> Vec<String> {
    pack.graph()
        .rows()
        .iter()
        .map(|row| row.commit.hash.to_string())
        .collect()
}
