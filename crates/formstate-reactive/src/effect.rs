#![forbid(unsafe_code)]

//! Side-effecting subscribers and update batching.
//!
//! An [`Effect`] runs its closure immediately, records what it read, and
//! re-runs whenever any of those dependencies change. Inside [`batch`],
//! re-runs are deferred until the outermost batch closes and each pending
//! effect runs once, no matter how many of its dependencies changed.
//!
//! # Invariants
//!
//! 1. A disposed (or dropped) effect never runs again.
//! 2. An effect never re-enters itself; a change made while it is running
//!    schedules exactly one follow-up run.
//! 3. Dependencies are rebuilt on every run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::tracking::{self, Subscription};

struct EffectInner {
    run: RefCell<Box<dyn FnMut()>>,
    subscriptions: RefCell<Vec<Subscription>>,
    generation: Cell<u64>,
    runs: Cell<u64>,
    running: Cell<bool>,
    rerun: Cell<bool>,
    queued: Cell<bool>,
    disposed: Cell<bool>,
}

/// A reactive side effect. Dropping the handle disposes it.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("runs", &self.inner.runs.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl Effect {
    /// Create an effect and run it once.
    pub fn new(run: impl FnMut() + 'static) -> Self {
        let inner = Rc::new(EffectInner {
            run: RefCell::new(Box::new(run)),
            subscriptions: RefCell::new(Vec::new()),
            generation: Cell::new(0),
            runs: Cell::new(0),
            running: Cell::new(false),
            rerun: Cell::new(false),
            queued: Cell::new(false),
            disposed: Cell::new(false),
        });
        execute(&inner);
        Self { inner }
    }

    /// Stop the effect and release its subscriptions.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.subscriptions.borrow_mut().clear();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// How many times the closure has run.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.inner.runs.get()
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn execute(inner: &Rc<EffectInner>) {
    if inner.disposed.get() {
        return;
    }
    if inner.running.get() {
        inner.rerun.set(true);
        return;
    }
    inner.running.set(true);
    loop {
        inner.rerun.set(false);
        let ((), deps) = tracking::track(|| {
            let mut run = inner.run.borrow_mut();
            (*run)()
        });
        inner.runs.set(inner.runs.get() + 1);

        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);
        let subs: Vec<Subscription> = deps
            .iter()
            .map(|dep| {
                let weak = Rc::downgrade(inner);
                dep.listen(move || schedule(&weak, generation))
            })
            .collect();
        *inner.subscriptions.borrow_mut() = subs;

        if !inner.rerun.get() || inner.disposed.get() {
            break;
        }
    }
    inner.running.set(false);
}

fn schedule(weak: &Weak<EffectInner>, generation: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if inner.disposed.get() || inner.generation.get() != generation {
        return;
    }
    if BATCH_DEPTH.with(Cell::get) > 0 {
        if !inner.queued.replace(true) {
            PENDING.with(|pending| pending.borrow_mut().push(Rc::clone(&inner)));
        }
        return;
    }
    execute(&inner);
}

thread_local! {
    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PENDING: RefCell<Vec<Rc<EffectInner>>> = const { RefCell::new(Vec::new()) };
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = BATCH_DEPTH.with(|d| {
            let next = d.get() - 1;
            d.set(next);
            next
        });
        if depth == 0 && !std::thread::panicking() {
            flush();
        }
    }
}

fn flush() {
    loop {
        let pending = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if pending.is_empty() {
            break;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(message = "reactive.flush", effects = pending.len());
        for inner in pending {
            inner.queued.set(false);
            execute(&inner);
        }
    }
}

/// Run `f` with effect re-runs deferred until the outermost batch ends.
///
/// Computed values still invalidate immediately, so reads inside the batch
/// are never stale.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    BATCH_DEPTH.with(|d| d.set(d.get() + 1));
    let _guard = BatchGuard;
    f()
}

/// Whether a [`batch`] is currently open.
#[must_use]
pub fn is_batching() -> bool {
    BATCH_DEPTH.with(Cell::get) > 0
}
