#![forbid(unsafe_code)]

//! Change notification and automatic dependency tracking.
//!
//! Every reactive node owns a [`Notifier`]. Reading a node while a tracking
//! scope is active records its notifier in that scope; whoever opened the
//! scope (a [`Computed`](crate::Computed) or an [`Effect`](crate::Effect))
//! then subscribes to exactly the notifiers it read.
//!
//! Scopes nest: a computed evaluated inside an effect opens its own scope,
//! and the effect only records the computed itself. [`untracked`] opens a
//! scope that records nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashSet;

type Callback = dyn Fn();

/// RAII guard for a notifier callback. Dropping it detaches the callback
/// before the next notification.
#[must_use = "dropping a Subscription detaches its callback"]
pub struct Subscription {
    callback: Option<Rc<Callback>>,
}

impl Subscription {
    /// Detach explicitly (same as dropping).
    pub fn unsubscribe(mut self) {
        self.callback = None;
    }

    /// Whether the callback is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Default)]
struct NotifierInner {
    listeners: RefCell<Vec<Weak<Callback>>>,
}

/// Listener list shared by one reactive node.
///
/// Listeners are held weakly; dead entries are pruned during notification.
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    inner: Rc<NotifierInner>,
}

impl Notifier {
    pub(crate) fn listen(&self, callback: impl Fn() + 'static) -> Subscription {
        let callback: Rc<Callback> = Rc::new(callback);
        self.inner
            .listeners
            .borrow_mut()
            .push(Rc::downgrade(&callback));
        Subscription {
            callback: Some(callback),
        }
    }

    /// Call every live listener in registration order.
    ///
    /// The listener list is snapshotted first, so callbacks may subscribe,
    /// unsubscribe, or notify again without re-entrancy issues.
    pub(crate) fn notify(&self) {
        let live: Vec<Rc<Callback>> = {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners.retain(|w| w.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback();
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Record this notifier in the innermost tracking scope, if any.
    pub(crate) fn track(&self) {
        SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            if let Some(Some(frame)) = scopes.last_mut() {
                frame.record(self);
            }
        });
    }
}

/// Reads recorded by one tracking scope, in first-read order.
#[derive(Default)]
struct Frame {
    deps: Vec<Notifier>,
    seen: AHashSet<*const NotifierInner>,
}

impl Frame {
    fn record(&mut self, notifier: &Notifier) {
        if self.seen.insert(Rc::as_ptr(&notifier.inner)) {
            self.deps.push(notifier.clone());
        }
    }
}

thread_local! {
    /// `Some` frames record reads; `None` frames come from [`untracked`].
    static SCOPES: RefCell<Vec<Option<Frame>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame it pushed even if the tracked closure panics.
struct ScopeGuard;

impl ScopeGuard {
    fn push(frame: Option<Frame>) -> Self {
        SCOPES.with(|scopes| scopes.borrow_mut().push(frame));
        ScopeGuard
    }

    fn pop(self) -> Vec<Notifier> {
        let frame = SCOPES.with(|scopes| scopes.borrow_mut().pop());
        std::mem::forget(self);
        frame.flatten().map(|f| f.deps).unwrap_or_default()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Run `f`, returning its result and every notifier it read.
pub(crate) fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<Notifier>) {
    let guard = ScopeGuard::push(Some(Frame::default()));
    let result = f();
    (result, guard.pop())
}

/// Run `f` without recording any reads in the enclosing scope.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let guard = ScopeGuard::push(None);
    let result = f();
    guard.pop();
    result
}

/// Whether a tracking scope is currently recording reads.
#[must_use]
pub fn is_tracking() -> bool {
    SCOPES.with(|scopes| matches!(scopes.borrow().last(), Some(Some(_))))
}
