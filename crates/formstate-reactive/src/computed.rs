#![forbid(unsafe_code)]

//! Lazy computed values derived from other reactive nodes.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function and its cached result in shared,
//! reference-counted storage. When any dependency changes, the cached value
//! is invalidated (marked dirty) and the invalidation is pushed to whatever
//! depends on this computed. The next call to [`get()`](Computed::get)
//! recomputes and caches the result.
//!
//! [`Computed::new`] tracks dependencies automatically: every observable or
//! computed read during the last evaluation is a dependency, and the set is
//! rebuilt on every recomputation, so branches that stop being read stop
//! causing invalidations. [`Computed::from_observable`] and
//! [`Computed::from2`] wire their sources explicitly.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of
//!    all dependencies.
//! 2. The compute function is called at most once per dependency change
//!    cycle (memoization).
//! 3. If no dependency has changed, `get()` returns the cached value.
//! 4. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the previous cached value is kept and the
//!   dirty flag stays set, so the next `get()` retries.
//! - **Dependency dropped**: the subscription becomes inert; the computed
//!   keeps its last cached result.
//! - **Cycle**: a compute function that reads its own computed panics on
//!   the re-entrant borrow.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::observable::Observable;
use crate::tracking::{self, Notifier, Subscription};

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T>,
    /// `None` only before the first computation.
    cached: RefCell<Option<T>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    /// Automatic tracking rebuilds `subscriptions` on every recompute.
    auto_track: bool,
    /// Dependency callbacks from older evaluations compare against this and
    /// go quiet.
    generation: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
    notifier: Notifier,
}

impl<T> ComputedInner<T> {
    fn mark_dirty(&self) {
        if !self.dirty.replace(true) {
            self.notifier.notify();
        }
    }
}

/// A lazily-evaluated, memoized derived value.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value that tracks whatever `compute` reads.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        Self::build(Box::new(compute), true, Vec::new())
    }

    /// Create a computed value derived from a single observable.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let source_clone = source.clone();
        let this = Self::build(
            Box::new(move || source_clone.with(|v| map(v))),
            false,
            Vec::new(),
        );
        let sub = this.dirty_on_change(|cb| source.subscribe(move |_| cb()));
        this.inner.subscriptions.borrow_mut().push(sub);
        this
    }

    /// Create a computed value derived from two observables.
    pub fn from2<S1, S2>(
        s1: &Observable<S1>,
        s2: &Observable<S2>,
        map: impl Fn(&S1, &S2) -> T + 'static,
    ) -> Self
    where
        S1: Clone + PartialEq + 'static,
        S2: Clone + PartialEq + 'static,
    {
        let s1_clone = s1.clone();
        let s2_clone = s2.clone();
        let this = Self::build(
            Box::new(move || s1_clone.with(|v1| s2_clone.with(|v2| map(v1, v2)))),
            false,
            Vec::new(),
        );
        let sub1 = this.dirty_on_change(|cb| s1.subscribe(move |_| cb()));
        let sub2 = this.dirty_on_change(|cb| s2.subscribe(move |_| cb()));
        this.inner.subscriptions.borrow_mut().extend([sub1, sub2]);
        this
    }

    /// Create a computed value from a compute function and pre-built
    /// subscriptions kept alive for its lifetime.
    ///
    /// No dirty wiring is done; the caller invalidates explicitly.
    pub fn from_fn(compute: impl Fn() -> T + 'static, subscriptions: Vec<Subscription>) -> Self {
        Self::build(Box::new(compute), false, subscriptions)
    }

    fn build(
        compute: Box<dyn Fn() -> T>,
        auto_track: bool,
        subscriptions: Vec<Subscription>,
    ) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                compute,
                cached: RefCell::new(None),
                dirty: Cell::new(true),
                version: Cell::new(0),
                auto_track,
                generation: Cell::new(0),
                subscriptions: RefCell::new(subscriptions),
                notifier: Notifier::default(),
            }),
        }
    }

    /// Build a source subscription whose callback dirties this computed.
    fn dirty_on_change(
        &self,
        subscribe: impl FnOnce(Box<dyn Fn()>) -> Subscription,
    ) -> Subscription {
        let weak: Weak<ComputedInner<T>> = Rc::downgrade(&self.inner);
        subscribe(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.mark_dirty();
            }
        }))
    }

    fn refresh(&self) {
        let inner = &self.inner;
        if !inner.dirty.get() && inner.cached.borrow().is_some() {
            return;
        }
        if inner.auto_track {
            let (value, deps) = tracking::track(|| (inner.compute)());
            let generation = inner.generation.get() + 1;
            inner.generation.set(generation);
            let subs: Vec<Subscription> = deps
                .iter()
                .map(|dep| {
                    let weak = Rc::downgrade(inner);
                    dep.listen(move || {
                        if let Some(inner) = weak.upgrade()
                            && inner.generation.get() == generation
                        {
                            inner.mark_dirty();
                        }
                    })
                })
                .collect();
            *inner.subscriptions.borrow_mut() = subs;
            *inner.cached.borrow_mut() = Some(value);
        } else {
            let value = tracking::untracked(|| (inner.compute)());
            *inner.cached.borrow_mut() = Some(value);
        }
        inner.dirty.set(false);
        inner.version.set(inner.version.get() + 1);
    }

    /// Get the current value, recomputing if any dependency has changed.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.notifier.track();
        self.refresh();
        self.inner
            .cached
            .borrow()
            .clone()
            .unwrap_or_else(|| (self.inner.compute)())
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.notifier.track();
        self.refresh();
        let cached = self.inner.cached.borrow();
        match cached.as_ref() {
            Some(value) => f(value),
            None => f(&(self.inner.compute)()),
        }
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force invalidation of the cached value. The next `get()` will
    /// recompute, and dependents are notified.
    pub fn invalidate(&self) {
        self.inner.mark_dirty();
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Call `callback` whenever this computed is invalidated.
    ///
    /// The callback fires on the clean-to-dirty transition; read the
    /// computed inside it to get the fresh value.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
        self.inner.notifier.listen(callback)
    }

    /// Number of dependencies recorded by the last evaluation.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0u32));
        (Rc::clone(&count), count)
    }

    #[test]
    fn explicit_single_source() {
        let price = Observable::new(12);
        let with_tax = Computed::from_observable(&price, |p| p * 2);

        assert_eq!(with_tax.get(), 24);
        assert_eq!(with_tax.version(), 1);

        price.set(5);
        assert!(with_tax.is_dirty());
        assert_eq!(with_tax.get(), 10);
        assert_eq!(with_tax.version(), 2);
    }

    #[test]
    fn explicit_two_sources() {
        let first = Observable::new("Ada".to_string());
        let last = Observable::new("Lovelace".to_string());
        let full = Computed::from2(&first, &last, |f, l| format!("{f} {l}"));

        assert_eq!(full.get(), "Ada Lovelace");
        last.set("Byron".to_string());
        assert_eq!(full.get(), "Ada Byron");
    }

    #[test]
    fn auto_tracks_reads() {
        let a = Observable::new(2);
        let b = Observable::new(3);
        let (calls, count) = counter();
        let (a2, b2) = (a.clone(), b.clone());
        let product = Computed::new(move || {
            calls.set(calls.get() + 1);
            a2.get() * b2.get()
        });

        assert_eq!(count.get(), 0);
        assert_eq!(product.get(), 6);
        assert_eq!(product.get(), 6);
        assert_eq!(count.get(), 1);
        assert_eq!(product.dependency_count(), 2);

        b.set(10);
        assert_eq!(product.get(), 20);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn dependencies_follow_branches() {
        let use_left = Observable::new(true);
        let left = Observable::new(1);
        let right = Observable::new(100);
        let (u, l, r) = (use_left.clone(), left.clone(), right.clone());
        let pick = Computed::new(move || if u.get() { l.get() } else { r.get() });

        assert_eq!(pick.get(), 1);
        right.set(200);
        assert!(!pick.is_dirty());

        use_left.set(false);
        assert_eq!(pick.get(), 200);
        left.set(5);
        assert!(!pick.is_dirty());
    }

    #[test]
    fn invalidation_propagates_through_chains() {
        let base = Observable::new(1);
        let b = base.clone();
        let doubled = Computed::new(move || b.get() * 2);
        let d = doubled.clone();
        let plus_one = Computed::new(move || d.get() + 1);

        assert_eq!(plus_one.get(), 3);
        base.set(4);
        assert!(plus_one.is_dirty());
        assert_eq!(plus_one.get(), 9);
    }

    #[test]
    fn diamond_recomputes_once_per_read() {
        let a = Observable::new(10);
        let (a1, a2) = (a.clone(), a.clone());
        let b = Computed::new(move || a1.get() + 1);
        let c = Computed::new(move || a2.get() * 2);
        let (calls, count) = counter();
        let (b2, c2) = (b.clone(), c.clone());
        let d = Computed::new(move || {
            calls.set(calls.get() + 1);
            b2.get() + c2.get()
        });

        assert_eq!(d.get(), 31);
        a.set(5);
        assert_eq!(d.get(), 16);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn invalidate_forces_recompute_and_notifies() {
        let computed = Computed::new(|| 7);
        let (hits, count) = counter();
        let _sub = computed.subscribe(move || hits.set(hits.get() + 1));

        let _ = computed.get();
        computed.invalidate();
        assert!(computed.is_dirty());
        assert_eq!(count.get(), 1);
        let _ = computed.get();
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn from_fn_needs_manual_invalidation() {
        let source = Observable::new(5);
        let s = source.clone();
        let tripled = Computed::from_fn(move || s.get() * 3, vec![]);

        assert_eq!(tripled.get(), 15);
        source.set(10);
        assert_eq!(tripled.get(), 15);
        tripled.invalidate();
        assert_eq!(tripled.get(), 30);
    }

    #[test]
    fn survives_source_drop() {
        let computed;
        {
            let source = Observable::new(42);
            let s = source.clone();
            computed = Computed::new(move || s.get());
            let _ = computed.get();
        }
        assert_eq!(computed.get(), 42);
        assert!(!computed.is_dirty());
    }

    #[test]
    fn with_borrows_cached_value() {
        let items = Observable::new(vec![1, 2, 3]);
        let sum = Computed::from_observable(&items, |v| v.iter().sum::<i32>());
        assert_eq!(sum.with(|s| *s), 6);
    }

    #[test]
    fn unchanged_source_keeps_cache() {
        let source = Observable::new(42);
        let (calls, count) = counter();
        let computed = Computed::from_observable(&source, move |v| {
            calls.set(calls.get() + 1);
            *v
        });
        let _ = computed.get();
        source.set(42);
        assert!(!computed.is_dirty());
        let _ = computed.get();
        assert_eq!(count.get(), 1);
    }
}
