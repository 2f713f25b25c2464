use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// "Invoke later" queue of the coordinating thread. Tasks never run inside
/// the call that posted them; the session drains the queue between events.
#[derive(Clone, Default)]
pub struct LocalExecutor {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoke_later(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Runs queued tasks, including ones queued while draining, until the
    /// queue is empty. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
