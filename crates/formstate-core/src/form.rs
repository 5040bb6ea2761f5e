#![forbid(unsafe_code)]

//! The form controller.
//!
//! A [`Form`] owns the document store, the field registry, the error map,
//! and the form-level signals. Every mutation applies its synchronous part
//! (document write, flags, reindexing, cascade) before returning, then hands
//! back a [`Pending`] that resolves once any validation it started settles.
//!
//! # Invariants
//!
//! 1. Identity: `field(p)` returns the same [`FieldState`] for equal paths
//!    until an array edit relocates or drops it, or the form is destroyed.
//! 2. Dirty and touched flags are sticky; only [`Form::reset`] clears them.
//! 3. After any write at `p`, fields at `p`, at every ancestor of `p`, and at
//!    every descendant of `p` re-derive their value on next read.
//! 4. After an array edit, a field that tracked element `e` tracks `e` at
//!    its new index, and error entries follow the same mapping (except for
//!    moves, which clear the array's element errors).
//! 5. Under [`MergePolicy::LatestWins`] a validation result is merged only
//!    if no newer request for the same target started, no reset happened,
//!    and no array edit touched the path in the meantime.
//!
//! # Failure Modes
//!
//! - A validator that returns `Err` is logged at `warn`. Field validation
//!   then resolves `true` and leaves the error map alone; form validation
//!   resolves `false`.
//! - A validator that never completes leaves `is_validating` set until the
//!   next reset.
//! - Operations on a destroyed form are logged no-ops.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use formstate_doc::{JsonStore, Path, Store};
use formstate_reactive::{Computed, Effect, Observable, Subscription, batch, untracked};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::config::{FormConfig, MergePolicy, SetValueOptions};
use crate::error::{FormError, Result, ValidatorError};
use crate::error_map::{self, ErrorMap};
use crate::field::{FieldState, SharedStore};
use crate::pending::Pending;
use crate::registry::{Registry, cascade, key_is_under};
use crate::reindex::{ArrayEdit, reindex};
use crate::validator::{NoopValidator, Validator};

struct FormInner {
    store: SharedStore,
    initial: Box<dyn Store>,
    validator: Rc<dyn Validator>,
    config: FormConfig,
    registry: Registry,
    errors: Observable<ErrorMap>,
    data_version: Observable<u64>,
    error_version: Observable<u64>,
    validating: Observable<bool>,
    submitting: Observable<bool>,
    submit_count: Observable<u64>,
    is_dirty: Computed<bool>,
    is_touched: Computed<bool>,
    is_valid: Computed<bool>,
    is_validating: Computed<bool>,
    /// Latest request sequence per field path.
    field_seq: RefCell<AHashMap<String, u64>>,
    form_seq: Cell<u64>,
    next_seq: Cell<u64>,
    form_in_flight: Cell<u32>,
    generation: Cell<u64>,
    destroyed: Cell<bool>,
    listeners: RefCell<Vec<Effect>>,
    error_counter: RefCell<Option<Subscription>>,
}

/// Handles to the form-level signals, for binding into a UI.
#[derive(Clone, Debug)]
pub struct FormSignals {
    pub is_dirty: Computed<bool>,
    pub is_touched: Computed<bool>,
    pub is_valid: Computed<bool>,
    pub is_validating: Computed<bool>,
    pub is_submitting: Observable<bool>,
    pub submit_count: Observable<u64>,
    pub data_version: Observable<u64>,
    pub error_version: Observable<u64>,
    pub field_count: Observable<usize>,
}

/// A reactive form over a JSON document. Cloning yields another handle to
/// the same form.
#[derive(Clone)]
pub struct Form {
    inner: Rc<FormInner>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("fields", &self.inner.registry.count().get_untracked())
            .field("errors", &self.inner.errors.get_untracked().len())
            .field("generation", &self.inner.generation.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl Form {
    /// A form over `initial` with no validation and the default config.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self::builder().initial(initial).build()
    }

    /// A form over `initial` checked by `validator`.
    #[must_use]
    pub fn with_validator(initial: Value, validator: impl Validator + 'static) -> Self {
        Self::builder().initial(initial).validator(validator).build()
    }

    #[must_use]
    pub fn builder() -> FormBuilder {
        FormBuilder::default()
    }

    fn from_parts(store: Box<dyn Store>, validator: Rc<dyn Validator>, config: FormConfig) -> Self {
        let initial = store.clone_store();
        let store: SharedStore = Rc::new(RefCell::new(store));
        let errors = Observable::new(ErrorMap::new());
        let registry = Registry::new(Rc::clone(&store), errors.clone());
        let validating = Observable::new(false);

        let is_dirty = {
            let registry = registry.clone();
            Computed::new(move || {
                let _ = registry.count().get();
                registry.all().iter().any(FieldState::is_dirty)
            })
        };
        let is_touched = {
            let registry = registry.clone();
            Computed::new(move || {
                let _ = registry.count().get();
                registry.all().iter().any(FieldState::is_touched)
            })
        };
        let is_valid = Computed::from_observable(&errors, ErrorMap::is_empty);
        let is_validating = {
            let (registry, validating) = (registry.clone(), validating.clone());
            Computed::new(move || {
                let _ = registry.count().get();
                validating.get() || registry.all().iter().any(FieldState::is_validating)
            })
        };

        let error_version = Observable::new(0u64);
        let error_counter = {
            let counter = error_version.clone();
            errors.subscribe(move |_| counter.increment())
        };

        Self {
            inner: Rc::new(FormInner {
                store,
                initial,
                validator,
                config,
                registry,
                errors,
                data_version: Observable::new(0),
                error_version,
                validating,
                submitting: Observable::new(false),
                submit_count: Observable::new(0),
                is_dirty,
                is_touched,
                is_valid,
                is_validating,
                field_seq: RefCell::new(AHashMap::new()),
                form_seq: Cell::new(0),
                next_seq: Cell::new(0),
                form_in_flight: Cell::new(0),
                generation: Cell::new(0),
                destroyed: Cell::new(false),
                listeners: RefCell::new(Vec::new()),
                error_counter: RefCell::new(Some(error_counter)),
            }),
        }
    }

    // ── Fields ──────────────────────────────────────────────────────────

    /// The field for `path`, created on first access.
    pub fn field(&self, path: impl Into<Path>) -> FieldState {
        self.inner.registry.field(&path.into())
    }

    #[must_use]
    pub fn has_field(&self, path: impl Into<Path>) -> bool {
        self.inner.registry.contains(&path.into().to_string())
    }

    /// Paths of every registered field, in sorted order.
    #[must_use]
    pub fn field_paths(&self) -> Vec<String> {
        self.inner.registry.keys()
    }

    // ── Values ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_value(&self, path: impl Into<Path>) -> Option<Value> {
        self.inner.store.borrow().get(&path.into())
    }

    /// A copy of the whole document.
    #[must_use]
    pub fn get_values(&self) -> Value {
        self.inner.store.borrow().all().clone()
    }

    /// The current document, shared. Later writes do not show through.
    #[must_use]
    pub fn snapshot(&self) -> Rc<Value> {
        self.inner.store.borrow().snapshot()
    }

    /// Write `value` at `path`, update the field's flags, and cascade.
    ///
    /// Validates the field when it was validated before, or when `opts`
    /// asks for it (by default, whenever the write is dirty).
    pub fn set_value(&self, path: impl Into<Path>, value: Value, opts: SetValueOptions) -> Pending {
        if self.refuse("set_value") {
            return Pending::ready(false);
        }
        let path = path.into();
        let field = self.inner.registry.field(&path);
        batch(|| {
            self.inner.store.borrow_mut().set(&path, value);
            if opts.dirty {
                field.mark_dirty();
            }
            if opts.touch {
                field.mark_touched();
            }
            cascade(&self.inner.registry, &path, &self.inner.data_version);
        });
        if field.was_validated_untracked() || opts.wants_validation() {
            self.validate_field(path)
        } else {
            Pending::ready(self.path_is_valid(&path))
        }
    }

    /// Mark the field at `path` touched without writing.
    pub fn touch(&self, path: impl Into<Path>) {
        if self.refuse("touch") {
            return;
        }
        self.inner.registry.field(&path.into()).mark_touched();
    }

    /// Run `callback` with the current document now and after every change.
    ///
    /// The listener lives until [`Form::destroy`].
    pub fn on_change(&self, callback: impl Fn(&Value) + 'static) {
        if self.refuse("on_change") {
            return;
        }
        let data_version = self.inner.data_version.clone();
        let store = Rc::clone(&self.inner.store);
        let effect = Effect::new(move || {
            let _ = data_version.get();
            let doc = store.borrow().snapshot();
            untracked(|| callback(&doc));
        });
        self.inner.listeners.borrow_mut().push(effect);
    }

    // ── Arrays ──────────────────────────────────────────────────────────

    /// Append `item` to the array at `path`, creating the array if absent.
    pub fn array_append(&self, path: impl Into<Path>, item: Value) -> Pending {
        self.edit_array(path.into(), "array_append", move |store, path| {
            store
                .array_push(path, item)
                .map(|index| ArrayEdit::Insert { index })
        })
    }

    /// Insert `item` at `index` (clamped to the length).
    pub fn array_insert(&self, path: impl Into<Path>, index: usize, item: Value) -> Pending {
        self.edit_array(path.into(), "array_insert", move |store, path| {
            store
                .array_insert(path, index, item)
                .map(|index| ArrayEdit::Insert { index })
        })
    }

    /// Remove the element at `index`. Out-of-range indices are ignored.
    pub fn array_remove(&self, path: impl Into<Path>, index: usize) -> Pending {
        self.edit_array(path.into(), "array_remove", move |store, path| {
            store
                .array_remove(path, index)
                .map(|_| ArrayEdit::Remove { index })
        })
    }

    /// Move the element at `from` to `to`. Out-of-range indices are ignored.
    pub fn array_move(&self, path: impl Into<Path>, from: usize, to: usize) -> Pending {
        self.edit_array(path.into(), "array_move", move |store, path| {
            store
                .array_move(path, from, to)
                .then_some(ArrayEdit::Move { from, to })
        })
    }

    fn edit_array(
        &self,
        path: Path,
        op: &'static str,
        apply: impl FnOnce(&mut dyn Store, &Path) -> Option<ArrayEdit>,
    ) -> Pending {
        if self.refuse(op) {
            return Pending::ready(false);
        }
        let inner = &self.inner;
        let edit = {
            let mut store = inner.store.borrow_mut();
            apply(&mut **store, &path)
        };
        let Some(edit) = edit else {
            tracing::debug!(message = "form.array.noop", op, path = %path);
            return Pending::ready(self.path_is_valid(&path));
        };

        let report = batch(|| {
            if inner.config.mark_array_dirty {
                inner.registry.field(&path).mark_dirty();
            }
            let report = reindex(&path, edit, &inner.registry, &inner.errors);
            if inner.config.merge_policy == MergePolicy::LatestWins {
                inner
                    .field_seq
                    .borrow_mut()
                    .retain(|key, _| !key_is_under(key, &path));
            }
            cascade(&inner.registry, &path, &inner.data_version);
            report
        });
        tracing::debug!(
            message = "form.array.edit",
            op,
            path = %path,
            ?edit,
            fields_moved = report.fields_moved,
            fields_dropped = report.fields_dropped,
            errors_moved = report.errors_moved,
            errors_dropped = report.errors_dropped,
        );

        if inner.config.validate_on_array_edit {
            self.validate_field(path)
        } else {
            Pending::ready(self.path_is_valid(&path))
        }
    }

    // ── Validation ──────────────────────────────────────────────────────

    /// Validate one path against the current document.
    ///
    /// Resolves to whether the path has no errors. A validator failure is
    /// logged and resolves `true`.
    pub fn validate_field(&self, path: impl Into<Path>) -> Pending {
        if self.refuse("validate_field") {
            return Pending::ready(false);
        }
        let inner = &self.inner;
        let path = path.into();
        let key = path.to_string();
        let field = inner.registry.field(&path);
        field.begin_validation();

        let seq = self.next_seq();
        inner.field_seq.borrow_mut().insert(key.clone(), seq);
        let generation = inner.generation.get();
        let snapshot = inner.store.borrow().snapshot();
        let validator = Rc::clone(&inner.validator);
        let form = self.clone();

        Pending::new(async move {
            let outcome = validator.validate_field(&path, &snapshot).await;
            form.finish_field(&key, &field, seq, generation, outcome)
        })
    }

    fn finish_field(
        &self,
        key: &str,
        field: &FieldState,
        seq: u64,
        generation: u64,
        outcome: std::result::Result<Vec<String>, ValidatorError>,
    ) -> bool {
        let inner = &self.inner;
        let valid = outcome.as_ref().map_or(true, Vec::is_empty);
        if inner.destroyed.get() {
            return valid;
        }
        let latest = inner.config.merge_policy == MergePolicy::LatestWins;
        if latest && generation != inner.generation.get() {
            tracing::debug!(message = "form.validation.stale", path = key, reason = "reset");
            return valid;
        }
        let fresh = !latest || inner.field_seq.borrow().get(key) == Some(&seq);

        batch(|| {
            field.end_validation();
            match outcome {
                Ok(messages) if fresh => {
                    inner
                        .errors
                        .update_if(|map| error_map::put(map, key, messages));
                }
                Ok(_) => {
                    tracing::debug!(message = "form.validation.stale", path = key, seq);
                }
                Err(err) => {
                    tracing::warn!(message = "form.validate_field.failed", path = key, error = %err);
                }
            }
        });
        valid
    }

    /// Validate the whole document. Resolves to whether it has no errors.
    pub fn validate(&self) -> Pending {
        let run = self.try_validate();
        Pending::new(async move { matches!(run.await, Ok(map) if map.is_empty()) })
    }

    /// Validate the whole document, resolving to the validator's error map
    /// or to the reason validation could not run.
    ///
    /// On success the map replaces the form's errors, a field is created
    /// for every path with errors, and every registered field is marked
    /// validated.
    pub fn try_validate(&self) -> LocalBoxFuture<'static, Result<ErrorMap>> {
        if self.refuse("validate") {
            return futures::future::ready(Err(FormError::Destroyed)).boxed_local();
        }
        let inner = &self.inner;
        let seq = self.next_seq();
        inner.form_seq.set(seq);
        inner.form_in_flight.set(inner.form_in_flight.get() + 1);
        inner.validating.set(true);
        let generation = inner.generation.get();
        let snapshot = inner.store.borrow().snapshot();
        let validator = Rc::clone(&inner.validator);
        let form = self.clone();

        async move {
            let outcome = validator.validate(&snapshot).await;
            form.finish_form(seq, generation, outcome)
        }
        .boxed_local()
    }

    fn finish_form(
        &self,
        seq: u64,
        generation: u64,
        outcome: std::result::Result<ErrorMap, ValidatorError>,
    ) -> Result<ErrorMap> {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return Err(FormError::Destroyed);
        }
        let latest = inner.config.merge_policy == MergePolicy::LatestWins;
        if latest && generation != inner.generation.get() {
            tracing::debug!(message = "form.validation.stale", path = "", reason = "reset");
            return outcome.map(error_map::normalize).map_err(FormError::from);
        }

        batch(|| {
            let left = inner.form_in_flight.get().saturating_sub(1);
            inner.form_in_flight.set(left);
            inner.validating.set(left > 0);

            let map = match outcome {
                Ok(map) => error_map::normalize(map),
                Err(err) => {
                    tracing::warn!(message = "form.validate.failed", error = %err);
                    return Err(err.into());
                }
            };
            if latest && inner.form_seq.get() != seq {
                tracing::debug!(message = "form.validation.stale", path = "", seq);
                return Ok(map);
            }

            let merged = if latest {
                self.keep_newer_field_results(map.clone(), seq)
            } else {
                map.clone()
            };
            for key in merged.keys() {
                let _ = inner.registry.field(&Path::parse(key));
            }
            inner.errors.set(merged);
            for field in inner.registry.all() {
                field.mark_validated();
            }
            Ok(map)
        })
    }

    /// Field results requested after form request `seq` stay authoritative
    /// for their paths; older field requests are forgotten so they cannot
    /// land on top of this result.
    fn keep_newer_field_results(&self, mut map: ErrorMap, seq: u64) -> ErrorMap {
        let mut field_seq = self.inner.field_seq.borrow_mut();
        field_seq.retain(|_, s| *s > seq);
        if field_seq.is_empty() {
            return map;
        }
        let current = self.inner.errors.get_untracked();
        for key in field_seq.keys() {
            match current.get(key) {
                Some(messages) => {
                    map.insert(key.clone(), messages.clone());
                }
                None => {
                    map.remove(key);
                }
            }
        }
        map
    }

    /// Mark the form submitting and run a full validation.
    pub fn submit(&self) -> Pending {
        if self.refuse("submit") {
            return Pending::ready(false);
        }
        batch(|| {
            self.inner.submitting.set(true);
            self.inner.submit_count.increment();
        });
        let run = self.try_validate();
        let form = self.clone();
        Pending::new(async move {
            let valid = matches!(run.await, Ok(map) if map.is_empty());
            form.inner.submitting.set(false);
            valid
        })
    }

    // ── Errors ──────────────────────────────────────────────────────────

    /// The current error map (tracked).
    #[must_use]
    pub fn get_errors(&self) -> ErrorMap {
        self.inner.errors.get()
    }

    /// Replace the error map. Empty lists are dropped and a field is
    /// created for every remaining path.
    pub fn set_errors(&self, errors: ErrorMap) {
        if self.refuse("set_errors") {
            return;
        }
        let errors = error_map::normalize(errors);
        batch(|| {
            for key in errors.keys() {
                let _ = self.inner.registry.field(&Path::parse(key));
            }
            self.inner.errors.set(errors);
        });
    }

    /// Set or clear the messages for one path.
    pub fn set_field_errors(&self, path: impl Into<Path>, messages: Vec<String>) {
        if self.refuse("set_field_errors") {
            return;
        }
        let path = path.into();
        let key = path.to_string();
        batch(|| {
            let _ = self.inner.registry.field(&path);
            self.inner
                .errors
                .update_if(|map| error_map::put(map, &key, messages));
        });
    }

    pub fn clear_errors(&self) {
        if self.refuse("clear_errors") {
            return;
        }
        self.inner.errors.set(ErrorMap::new());
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Restore the initial document and clear errors and every field flag.
    ///
    /// Fields keep their identity. Validations still in flight are
    /// discarded under [`MergePolicy::LatestWins`].
    pub fn reset(&self) {
        if self.refuse("reset") {
            return;
        }
        let inner = &self.inner;
        batch(|| {
            *inner.store.borrow_mut() = inner.initial.clone_store();
            inner.generation.set(inner.generation.get() + 1);
            inner.field_seq.borrow_mut().clear();
            inner.form_in_flight.set(0);
            inner.validating.set(false);
            inner.errors.set(ErrorMap::new());
            for field in inner.registry.all() {
                field.reset_flags();
            }
            cascade(&inner.registry, &Path::root(), &inner.data_version);
        });
        tracing::debug!(
            message = "form.reset",
            generation = inner.generation.get(),
            fields = inner.registry.count().get_untracked(),
        );
    }

    /// Drop every field and listener. Later operations are logged no-ops.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        let listeners = std::mem::take(&mut *inner.listeners.borrow_mut());
        drop(listeners);
        inner.error_counter.borrow_mut().take();
        inner.field_seq.borrow_mut().clear();
        inner.registry.clear();
        tracing::debug!(message = "form.destroy");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    // ── Form-level signals ──────────────────────────────────────────────

    /// Whether any registered field is dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty.get()
    }

    /// Whether any registered field is touched.
    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.inner.is_touched.get()
    }

    /// Whether the error map is empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.is_valid.get()
    }

    /// Whether a form validation or any field validation is in flight.
    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.inner.is_validating.get()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.submitting.get()
    }

    #[must_use]
    pub fn submit_count(&self) -> u64 {
        self.inner.submit_count.get()
    }

    /// Bumped once per document change.
    #[must_use]
    pub fn data_version(&self) -> u64 {
        self.inner.data_version.get()
    }

    /// Bumped once per error map change.
    #[must_use]
    pub fn error_version(&self) -> u64 {
        self.inner.error_version.get()
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.inner.registry.count().get()
    }

    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn signals(&self) -> FormSignals {
        let inner = &self.inner;
        FormSignals {
            is_dirty: inner.is_dirty.clone(),
            is_touched: inner.is_touched.clone(),
            is_valid: inner.is_valid.clone(),
            is_validating: inner.is_validating.clone(),
            is_submitting: inner.submitting.clone(),
            submit_count: inner.submit_count.clone(),
            data_version: inner.data_version.clone(),
            error_version: inner.error_version.clone(),
            field_count: inner.registry.count().clone(),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn next_seq(&self) -> u64 {
        let seq = self.inner.next_seq.get() + 1;
        self.inner.next_seq.set(seq);
        seq
    }

    fn path_is_valid(&self, path: &Path) -> bool {
        let key = path.to_string();
        untracked(|| self.inner.errors.with(|map| !map.contains_key(&key)))
    }

    /// Log and report whether `op` must be skipped because the form is gone.
    fn refuse(&self, op: &'static str) -> bool {
        if self.inner.destroyed.get() {
            tracing::warn!(message = "form.destroyed", op);
            return true;
        }
        false
    }
}

/// Builder for a [`Form`] with a custom store, validator, or config.
#[derive(Default)]
pub struct FormBuilder {
    store: Option<Box<dyn Store>>,
    validator: Option<Rc<dyn Validator>>,
    config: FormConfig,
}

impl fmt::Debug for FormBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormBuilder")
            .field("store", &self.store.is_some())
            .field("validator", &self.validator.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl FormBuilder {
    /// Start from `doc` in a [`JsonStore`].
    #[must_use]
    pub fn initial(mut self, doc: Value) -> Self {
        self.store = Some(Box::new(JsonStore::new(doc)));
        self
    }

    #[must_use]
    pub fn store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    /// Share one validator between several forms.
    #[must_use]
    pub fn shared_validator(mut self, validator: Rc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn build(self) -> Form {
        let store = self
            .store
            .unwrap_or_else(|| Box::new(JsonStore::new(Value::Object(Default::default()))));
        let validator = self
            .validator
            .unwrap_or_else(|| Rc::new(NoopValidator) as Rc<dyn Validator>);
        Form::from_parts(store, validator, self.config)
    }
}
