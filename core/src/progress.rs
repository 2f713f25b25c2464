use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handed to a long computation so it can observe cancellation.
#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    title: String,
    cancel: CancellationToken,
}

impl ProgressIndicator {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub type ProgressBody = Box<dyn FnOnce(ProgressIndicator) + Send>;

/// Runs a computation under a user-visible, cancellable progress indicator.
pub trait ProgressScope {
    /// Starts `body` and returns the token that cancels it.
    fn run_cancellable(&self, title: &str, body: ProgressBody) -> CancellationToken;
}

/// Runs bodies on the blocking pool. Needs a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackgroundProgress;

impl ProgressScope for BackgroundProgress {
    fn run_cancellable(&self, title: &str, body: ProgressBody) -> CancellationToken {
        let indicator = ProgressIndicator::new(title);
        let token = indicator.token().clone();
        debug!(title, "background task started");
        tokio::task::spawn_blocking(move || {
            let title = indicator.title().to_string();
            body(indicator);
            debug!(title, "background task finished");
        });
        token
    }
}

/// Runs bodies right away on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineProgress;

impl ProgressScope for InlineProgress {
    fn run_cancellable(&self, title: &str, body: ProgressBody) -> CancellationToken {
        let indicator = ProgressIndicator::new(title);
        let token = indicator.token().clone();
        body(indicator);
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    #[test]
    fn inline_progress_runs_immediately() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let token = InlineProgress.run_cancellable(
            "work",
            Box::new(move |indicator| {
                assert_eq!(indicator.title(), "work");
                flag.store(true, Ordering::SeqCst);
            }),
        );
        assert!(ran.load(Ordering::SeqCst));
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn background_progress_observes_cancellation() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let token = BackgroundProgress.run_cancellable(
            "work",
            Box::new(move |indicator| {
                while !indicator.is_cancelled() {
                    std::thread::yield_now();
                }
                let _ = tx.send(indicator.is_cancelled());
            }),
        );
        token.cancel();
        assert_eq!(rx.await.ok(), Some(true));
    }
}
