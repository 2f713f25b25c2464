//! Jumping to a commit while the log may still be loading.
//!
//! A jump looks the target up in the presentation model. When it is not
//! there yet the engine either asks the model for more rows or waits for
//! the next pack, retrying each time through the local executor, until it
//! finds the row or can tell the target is not reachable.

use std::cell::Cell;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::rc::Weak;
use std::task::Context;
use std::task::Poll;

use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::Hash;
use vcs_log_protocol::RowIndex;

use crate::affinity::ThreadAffinity;
use crate::bus::ChangeBus;
use crate::bus::ListenerId;
use crate::executor::LocalExecutor;
use crate::model::PresentationModel;
use crate::model::ViewSignals;
use crate::pack::VisiblePack;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Commit(CommitId),
    PartialHash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The commit exists but the active filters hide it.
    Existing,
    /// No such commit is known.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOutcome {
    Found(RowIndex),
    NotFound(NotFoundReason),
    /// A newer jump or an explicit cancel replaced this one.
    Abandoned,
}

impl JumpOutcome {
    pub fn is_found(self) -> bool {
        matches!(self, JumpOutcome::Found(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationState {
    #[default]
    Idle,
    Searching,
    RequestingMore,
    WaitingForPack,
    Found(RowIndex),
    NotFound(NotFoundReason),
}

/// Resolves once the jump it was returned for reaches an outcome.
#[derive(Debug)]
pub struct JumpHandle {
    rx: oneshot::Receiver<JumpOutcome>,
}

impl JumpHandle {
    /// The outcome, if the jump has already finished.
    pub fn try_outcome(&mut self) -> Option<JumpOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(JumpOutcome::Abandoned),
        }
    }
}

impl Future for JumpHandle {
    type Output = JumpOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(JumpOutcome::Abandoned))
    }
}

struct PendingJump {
    request: u64,
    target: JumpTarget,
    reply: oneshot::Sender<JumpOutcome>,
    listener: Option<ListenerId>,
}

struct NavInner {
    affinity: ThreadAffinity,
    model: Rc<dyn PresentationModel>,
    signals: Rc<dyn ViewSignals>,
    bus: ChangeBus,
    executor: LocalExecutor,
    load_more: Option<Box<dyn Fn()>>,
    pending: RefCell<Option<PendingJump>>,
    state: Cell<NavigationState>,
    next_request: Cell<u64>,
}

pub struct NavigationEngine {
    inner: Rc<NavInner>,
}

impl NavigationEngine {
    pub fn new(
        model: Rc<dyn PresentationModel>,
        signals: Rc<dyn ViewSignals>,
        bus: ChangeBus,
        executor: LocalExecutor,
    ) -> Self {
        Self::with_load_more(model, signals, bus, executor, None)
    }

    /// `load_more` is called each time a jump starts waiting for a pack.
    pub fn with_load_more(
        model: Rc<dyn PresentationModel>,
        signals: Rc<dyn ViewSignals>,
        bus: ChangeBus,
        executor: LocalExecutor,
        load_more: Option<Box<dyn Fn()>>,
    ) -> Self {
        Self {
            inner: Rc::new(NavInner {
                affinity: ThreadAffinity::current(),
                model,
                signals,
                bus,
                executor,
                load_more,
                pending: RefCell::new(None),
                state: Cell::new(NavigationState::Idle),
                next_request: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> NavigationState {
        self.inner.affinity.assert("NavigationEngine");
        self.inner.state.get()
    }

    pub fn jump_to(&self, id: CommitId) -> JumpHandle {
        self.inner.affinity.assert("NavigationEngine");
        self.start(JumpTarget::Commit(id))
    }

    /// `prefix` must be hexadecimal; anything else resolves to
    /// `NotFound(Unknown)` right away.
    pub fn jump_to_partial_hash(&self, prefix: &str) -> JumpHandle {
        self.inner.affinity.assert("NavigationEngine");
        if !Hash::looks_like_hash(prefix) {
            debug!(prefix, "not a commit hash prefix");
            abandon_pending(&self.inner);
            let (reply, rx) = oneshot::channel();
            let reason = NotFoundReason::Unknown;
            self.inner.state.set(NavigationState::NotFound(reason));
            let _ = reply.send(JumpOutcome::NotFound(reason));
            return JumpHandle { rx };
        }
        self.start(JumpTarget::PartialHash(prefix.trim().to_ascii_lowercase()))
    }

    /// Abandons the pending jump, if any.
    pub fn cancel(&self) {
        self.inner.affinity.assert("NavigationEngine");
        if abandon_pending(&self.inner) {
            self.inner.state.set(NavigationState::Idle);
        }
    }

    pub fn has_pending_jump(&self) -> bool {
        self.inner.affinity.assert("NavigationEngine");
        self.inner.pending.borrow().is_some()
    }

    fn start(&self, target: JumpTarget) -> JumpHandle {
        abandon_pending(&self.inner);
        let request = self.inner.next_request.get() + 1;
        self.inner.next_request.set(request);
        let (reply, rx) = oneshot::channel();
        debug!(request, ?target, "jump requested");
        *self.inner.pending.borrow_mut() = Some(PendingJump {
            request,
            target,
            reply,
            listener: None,
        });
        attempt(&self.inner, request);
        JumpHandle { rx }
    }
}

/// Returns true when there was a pending jump.
fn abandon_pending(inner: &NavInner) -> bool {
    let Some(pending) = inner.pending.borrow_mut().take() else {
        return false;
    };
    if let Some(listener) = pending.listener {
        inner.bus.remove_listener(listener);
    }
    debug!(request = pending.request, "jump abandoned");
    let _ = pending.reply.send(JumpOutcome::Abandoned);
    true
}

fn current_target(inner: &NavInner, request: u64) -> Option<JumpTarget> {
    inner
        .pending
        .borrow()
        .as_ref()
        .filter(|pending| pending.request == request)
        .map(|pending| pending.target.clone())
}

fn attempt(inner: &Rc<NavInner>, request: u64) {
    let Some(target) = current_target(inner, request) else {
        trace!(request, "retry for a finished jump ignored");
        return;
    };
    inner.state.set(NavigationState::Searching);

    let row = match &target {
        JumpTarget::Commit(id) => inner.model.row_of(id),
        JumpTarget::PartialHash(prefix) => inner.model.row_of_partial_hash(prefix),
    };
    if let Some(row) = row {
        inner.signals.selection_moved(row);
        finish(inner, NavigationState::Found(row), JumpOutcome::Found(row));
        return;
    }

    if inner.model.can_request_more() {
        inner.state.set(NavigationState::RequestingMore);
        let retry = retry_later(inner, request);
        inner.model.request_more(Box::new(retry));
        return;
    }

    let pack = inner.model.pack();
    if pack.as_ref().is_none_or(|pack| !pack.is_full()) {
        inner.state.set(NavigationState::WaitingForPack);
        let retry = retry_later(inner, request);
        let listener = inner.bus.add_one_shot(move |_| retry());
        if let Some(pending) = inner.pending.borrow_mut().as_mut() {
            pending.listener = Some(listener);
        }
        debug!(request, "waiting for the next pack");
        if let Some(load_more) = &inner.load_more {
            load_more();
        }
        return;
    }

    let reason = not_found_reason(pack.as_deref(), &target);
    finish(inner, NavigationState::NotFound(reason), JumpOutcome::NotFound(reason));
}

/// A callback that re-runs the lookup on the coordinating thread after the
/// current call stack has unwound.
fn retry_later(inner: &Rc<NavInner>, request: u64) -> impl FnOnce() + 'static {
    let weak: Weak<NavInner> = Rc::downgrade(inner);
    let executor = inner.executor.clone();
    move || {
        executor.invoke_later(move || {
            if let Some(inner) = weak.upgrade() {
                attempt(&inner, request);
            }
        });
    }
}

fn finish(inner: &NavInner, state: NavigationState, outcome: JumpOutcome) {
    let Some(pending) = inner.pending.borrow_mut().take() else {
        return;
    };
    if let Some(listener) = pending.listener {
        inner.bus.remove_listener(listener);
    }
    inner.state.set(state);
    debug!(request = pending.request, ?outcome, "jump finished");
    let _ = pending.reply.send(outcome);
}

fn not_found_reason(pack: Option<&VisiblePack>, target: &JumpTarget) -> NotFoundReason {
    let Some(pack) = pack else {
        return NotFoundReason::Unknown;
    };
    if pack.filters().is_empty() {
        return NotFoundReason::Unknown;
    }
    let snapshot = pack.snapshot();
    let exists = match target {
        JumpTarget::Commit(id) => snapshot.contains(id),
        JumpTarget::PartialHash(prefix) => snapshot.find_by_prefix(prefix).next().is_some(),
    };
    if exists {
        NotFoundReason::Existing
    } else {
        NotFoundReason::Unknown
    }
}
