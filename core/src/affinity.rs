use std::thread;
use std::thread::ThreadId;

/// Remembers the thread that created a component and panics when it is
/// used from anywhere else.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    pub(crate) fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    #[track_caller]
    pub(crate) fn assert(&self, component: &str) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "{component} must only be used on its coordinating thread"
        );
    }
}
