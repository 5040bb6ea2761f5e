#![forbid(unsafe_code)]

//! Fine-grained reactive cells for formstate.
//!
//! This crate provides change-tracking primitives for reactive UI updates:
//!
//! - [`Observable`]: A shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//! - [`Computed`]: A lazily-evaluated, memoized value derived from whatever
//!   reactive nodes it read during its last evaluation.
//! - [`Effect`]: A side effect that re-runs when its dependencies change.
//! - [`batch`] / [`untracked`]: defer effect re-runs; read without tracking.
//!
//! # Architecture
//!
//! Everything is single-threaded: nodes live in `Rc` with `Cell`/`RefCell`
//! interiors. Subscribers are stored as `Weak` function pointers and cleaned
//! up lazily during notification.
//!
//! Invalidation is pushed eagerly (a write marks every downstream computed
//! dirty), values are pulled lazily (recomputation waits for `get()`), and
//! effects are the only nodes that run on their own.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. `Computed::get()` never returns a stale value.

pub mod computed;
pub mod effect;
pub mod observable;
pub mod tracking;

pub use computed::Computed;
pub use effect::{Effect, batch, is_batching};
pub use observable::Observable;
pub use tracking::{Subscription, is_tracking, untracked};
