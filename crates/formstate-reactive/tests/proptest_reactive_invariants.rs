//! Property-based invariant tests for observables, computeds, and effects.
//!
//! 1. `Observable::version` counts effective changes only.
//! 2. `Computed::get` always agrees with evaluating the function directly.
//! 3. A computed recomputes at most once per read after any number of writes.
//! 4. An effect observes the final value after every batch.

use std::cell::Cell;
use std::rc::Rc;

use formstate_reactive::{Computed, Effect, Observable, batch};
use proptest::prelude::*;

proptest! {
    #[test]
    fn version_counts_effective_changes(writes in proptest::collection::vec(0u8..4, 0..40)) {
        let cell = Observable::new(0u8);
        let mut expected = 0u64;
        let mut current = 0u8;
        for w in writes {
            if w != current {
                expected += 1;
                current = w;
            }
            cell.set(w);
        }
        prop_assert_eq!(cell.version(), expected);
    }

    #[test]
    fn computed_never_stale(
        writes in proptest::collection::vec((any::<bool>(), -50i32..50), 1..40),
    ) {
        let a = Observable::new(0i32);
        let b = Observable::new(0i32);
        let (a2, b2) = (a.clone(), b.clone());
        let sum = Computed::new(move || a2.get() - 2 * b2.get());
        for (to_a, v) in writes {
            if to_a { a.set(v) } else { b.set(v) }
            prop_assert_eq!(sum.get(), a.get() - 2 * b.get());
        }
    }

    #[test]
    fn one_recompute_per_read(writes in proptest::collection::vec(-5i32..5, 1..20)) {
        let source = Observable::new(100i32);
        let calls = Rc::new(Cell::new(0u32));
        let (c, s) = (Rc::clone(&calls), source.clone());
        let doubled = Computed::new(move || {
            c.set(c.get() + 1);
            s.get() * 2
        });
        let _ = doubled.get();
        for w in writes {
            source.set(w);
        }
        let before = calls.get();
        let _ = doubled.get();
        let _ = doubled.get();
        prop_assert!(calls.get() - before <= 1);
    }

    #[test]
    fn effect_sees_final_batch_value(writes in proptest::collection::vec(any::<u16>(), 1..20)) {
        let source = Observable::new(0u16);
        let seen = Rc::new(Cell::new(0u16));
        let (s, v) = (source.clone(), Rc::clone(&seen));
        let effect = Effect::new(move || v.set(s.get()));
        let last = *writes.last().unwrap();
        batch(|| {
            for w in &writes {
                source.set(*w);
            }
        });
        prop_assert_eq!(seen.get(), last);
        prop_assert!(effect.runs() <= 2);
    }
}
