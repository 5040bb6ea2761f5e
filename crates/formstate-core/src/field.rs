#![forbid(unsafe_code)]

//! Per-path reactive field state.
//!
//! A [`FieldState`] is the unit a UI binds to. Its `value`, `errors`, and
//! `is_valid` signals are derived; the flags are plain observables that
//! only the form writes.
//!
//! # Invariants
//!
//! 1. `value` re-derives after every structural change that could affect
//!    the field's path, because the form bumps the field's `version`.
//! 2. `is_dirty` and `is_touched` only ever go from `false` to `true`
//!    outside of a reset.
//! 3. A field keeps its identity when an array edit moves it to another
//!    index; only its path changes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use formstate_doc::{Path, Store};
use formstate_reactive::{Computed, Observable};
use serde_json::Value;

use crate::error_map::ErrorMap;

pub(crate) type SharedStore = Rc<RefCell<Box<dyn Store>>>;

struct FieldInner {
    path: Observable<Path>,
    version: Observable<u64>,
    value: Computed<Option<Value>>,
    dirty: Observable<bool>,
    touched: Observable<bool>,
    validating: Observable<bool>,
    validated: Observable<bool>,
    in_flight: Cell<u32>,
    errors: Computed<Vec<String>>,
    valid: Computed<bool>,
}

/// Reactive state for one path. Cloning yields another handle to the same
/// field.
#[derive(Clone)]
pub struct FieldState {
    inner: Rc<FieldInner>,
}

impl fmt::Debug for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldState")
            .field("path", &self.inner.path.get_untracked().to_string())
            .field("dirty", &self.inner.dirty.get_untracked())
            .field("touched", &self.inner.touched.get_untracked())
            .field("validating", &self.inner.validating.get_untracked())
            .finish()
    }
}

impl FieldState {
    pub(crate) fn new(path: Path, store: SharedStore, errors: Observable<ErrorMap>) -> Self {
        let path = Observable::new(path);
        let version = Observable::new(0u64);

        let value = {
            let (path, version) = (path.clone(), version.clone());
            Computed::new(move || {
                let _ = version.get();
                let path = path.get();
                store.borrow().get(&path)
            })
        };

        let field_errors = {
            let path = path.clone();
            Computed::new(move || {
                let key = path.get().to_string();
                errors.with(|map| map.get(&key).cloned().unwrap_or_default())
            })
        };

        let valid = {
            let field_errors = field_errors.clone();
            Computed::new(move || field_errors.with(Vec::is_empty))
        };

        Self {
            inner: Rc::new(FieldInner {
                path,
                version,
                value,
                dirty: Observable::new(false),
                touched: Observable::new(false),
                validating: Observable::new(false),
                validated: Observable::new(false),
                in_flight: Cell::new(0),
                errors: field_errors,
                valid,
            }),
        }
    }

    /// Current dotted path.
    #[must_use]
    pub fn path(&self) -> String {
        self.inner.path.get().to_string()
    }

    #[must_use]
    pub fn parsed_path(&self) -> Path {
        self.inner.path.get()
    }

    /// Value at the field's path, `None` when absent.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.inner.value.get()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.inner.touched.get()
    }

    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.inner.validating.get()
    }

    #[must_use]
    pub fn was_validated(&self) -> bool {
        self.inner.validated.get()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.inner.errors.get()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.valid.get()
    }

    /// Structural version; bumped by every cascade that reaches this field.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    // ── Signal handles ──────────────────────────────────────────────────

    #[must_use]
    pub fn value_signal(&self) -> &Computed<Option<Value>> {
        &self.inner.value
    }

    #[must_use]
    pub fn errors_signal(&self) -> &Computed<Vec<String>> {
        &self.inner.errors
    }

    #[must_use]
    pub fn valid_signal(&self) -> &Computed<bool> {
        &self.inner.valid
    }

    #[must_use]
    pub fn dirty_signal(&self) -> &Observable<bool> {
        &self.inner.dirty
    }

    #[must_use]
    pub fn touched_signal(&self) -> &Observable<bool> {
        &self.inner.touched
    }

    #[must_use]
    pub fn validating_signal(&self) -> &Observable<bool> {
        &self.inner.validating
    }

    #[must_use]
    pub fn path_signal(&self) -> &Observable<Path> {
        &self.inner.path
    }

    /// Whether both handles refer to the same field.
    #[must_use]
    pub fn same_as(&self, other: &FieldState) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Form-side writes ────────────────────────────────────────────────

    pub(crate) fn wake(&self) {
        self.inner.version.increment();
    }

    pub(crate) fn relabel(&self, path: Path) {
        self.inner.path.set(path);
    }

    pub(crate) fn mark_dirty(&self) {
        self.inner.dirty.set(true);
    }

    pub(crate) fn mark_touched(&self) {
        self.inner.touched.set(true);
    }

    pub(crate) fn mark_validated(&self) {
        self.inner.validated.set(true);
    }

    pub(crate) fn was_validated_untracked(&self) -> bool {
        self.inner.validated.get_untracked()
    }

    pub(crate) fn path_untracked(&self) -> Path {
        self.inner.path.get_untracked()
    }

    pub(crate) fn begin_validation(&self) {
        self.inner.in_flight.set(self.inner.in_flight.get() + 1);
        self.inner.validating.set(true);
    }

    /// Close one in-flight request. `validating` clears once none remain.
    pub(crate) fn end_validation(&self) {
        let left = self.inner.in_flight.get().saturating_sub(1);
        self.inner.in_flight.set(left);
        self.inner.validating.set(left > 0);
        self.inner.validated.set(true);
    }

    pub(crate) fn reset_flags(&self) {
        self.inner.in_flight.set(0);
        self.inner.dirty.set(false);
        self.inner.touched.set(false);
        self.inner.validating.set(false);
        self.inner.validated.set(false);
    }
}
