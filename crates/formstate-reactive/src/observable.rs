#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Invariants
//!
//! 1. `version` increments exactly once per mutation that changes the value.
//! 2. Setting a value equal to the current one is a no-op.
//! 3. Subscribers run after the new value is stored, in registration order.
//! 4. Reading inside a tracking scope registers the observable as a
//!    dependency of that scope.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::tracking::{Notifier, Subscription};

struct ObservableInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    notifier: Notifier,
}

/// A shared, observable cell.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                notifier: Notifier::default(),
            }),
        }
    }

    /// Current value (tracked).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.notifier.track();
        self.inner.value.borrow().clone()
    }

    /// Current value without registering a dependency.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value (tracked).
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.notifier.track();
        f(&self.inner.value.borrow())
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.bump();
    }

    /// Mutate in place, notifying subscribers only if the value changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            let before = current.clone();
            f(&mut current);
            *current != before
        };
        if changed {
            self.bump();
        }
    }

    /// Mutate in place without comparing snapshots. `f` reports whether it
    /// changed anything; subscribers are notified only if it did.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) {
        let changed = f(&mut self.inner.value.borrow_mut());
        if changed {
            self.bump();
        }
    }

    /// Number of effective changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Call `callback` with the new value after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let weak = Rc::downgrade(&self.inner);
        self.inner.notifier.listen(move || {
            if let Some(inner) = weak.upgrade() {
                let value = inner.value.borrow().clone();
                callback(&value);
            }
        })
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live subscribers, including computeds and effects.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    fn bump(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.notifier.notify();
    }
}

impl Observable<u64> {
    /// Advance a counter cell by one.
    pub fn increment(&self) {
        let next = self.get_untracked().wrapping_add(1);
        self.set(next);
    }
}
