//! Delivery of visible pack changes to listeners on the coordinating thread.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;
use tracing::warn;

use crate::affinity::ThreadAffinity;
use crate::pack::VisiblePack;

#[derive(Debug, Clone)]
pub struct PackChange {
    pub pack: Arc<VisiblePack>,
    /// True when the pack is built over a different snapshot than the
    /// previous one; false for filter, sort and structural changes.
    pub permanent_graph_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<RefCell<dyn FnMut(&PackChange)>>;

struct Entry {
    id: ListenerId,
    once: bool,
    interested: Rc<Cell<bool>>,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<Entry>,
}

/// Ordered listener registry. Cloning shares the registry.
#[derive(Clone)]
pub struct ChangeBus {
    inner: Rc<RefCell<BusInner>>,
    affinity: ThreadAffinity,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner::default())),
            affinity: ThreadAffinity::current(),
        }
    }

    pub fn add_listener(&self, listener: impl FnMut(&PackChange) + 'static) -> ListenerId {
        self.affinity.assert("ChangeBus");
        self.register(false, Rc::new(RefCell::new(listener)))
    }

    /// The listener runs on the next dispatch only.
    pub fn add_one_shot(&self, listener: impl FnOnce(&PackChange) + 'static) -> ListenerId {
        self.affinity.assert("ChangeBus");
        let mut slot = Some(listener);
        let callback = move |change: &PackChange| {
            if let Some(listener) = slot.take() {
                listener(change);
            }
        };
        self.register(true, Rc::new(RefCell::new(callback)))
    }

    /// Takes effect immediately, also in the middle of a dispatch. Returns
    /// false when the listener was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.affinity.assert("ChangeBus");
        let mut inner = self.inner.borrow_mut();
        let Some(position) = inner.listeners.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = inner.listeners.remove(position);
        entry.interested.set(false);
        true
    }

    pub fn listener_count(&self) -> usize {
        self.affinity.assert("ChangeBus");
        self.inner.borrow().listeners.len()
    }

    /// Calls every listener registered before this call, in registration
    /// order. Listeners may add or remove listeners while being called.
    pub fn dispatch(&self, change: &PackChange) {
        self.affinity.assert("ChangeBus");
        let targets: Vec<(ListenerId, bool, Rc<Cell<bool>>, Callback)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|entry| {
                (
                    entry.id,
                    entry.once,
                    entry.interested.clone(),
                    entry.callback.clone(),
                )
            })
            .collect();

        for (id, once, interested, callback) in targets {
            if !interested.get() {
                continue;
            }
            if once {
                self.remove_listener(id);
            }
            trace!(listener = ?id, generation = change.pack.generation(), "dispatching pack change");
            match callback.try_borrow_mut() {
                Ok(mut callback) => (*callback)(change),
                Err(_) => warn!(listener = ?id, "listener re-entered during dispatch; skipped"),
            }
        }
    }

    fn register(&self, once: bool, callback: Callback) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push(Entry {
            id,
            once,
            interested: Rc::new(Cell::new(true)),
            callback,
        });
        id
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
