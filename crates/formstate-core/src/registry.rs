#![forbid(unsafe_code)]

//! Field registry and change cascade.
//!
//! Fields are keyed by their path string in a `BTreeMap`, so every
//! descendant of `a.b` is one contiguous range starting at `"a.b."`.
//!
//! # Invariants
//!
//! 1. At most one [`FieldState`] exists per path string.
//! 2. `count` equals the number of registered fields and changes only when
//!    a field is created, dropped by an array edit, or the registry is
//!    cleared.
//! 3. The map is never borrowed while signals are notified.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::rc::Rc;

use formstate_doc::Path;
use formstate_reactive::{Observable, batch};

use crate::error_map::ErrorMap;
use crate::field::{FieldState, SharedStore};

struct RegistryInner {
    fields: RefCell<BTreeMap<String, FieldState>>,
    count: Observable<usize>,
    store: SharedStore,
    errors: Observable<ErrorMap>,
}

#[derive(Clone)]
pub(crate) struct Registry {
    inner: Rc<RegistryInner>,
}

impl Registry {
    pub(crate) fn new(store: SharedStore, errors: Observable<ErrorMap>) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                fields: RefCell::new(BTreeMap::new()),
                count: Observable::new(0),
                store,
                errors,
            }),
        }
    }

    /// Field for `path`, created on first access.
    pub(crate) fn field(&self, path: &Path) -> FieldState {
        let key = path.to_string();
        if let Some(field) = self.get(&key) {
            return field;
        }
        let field = FieldState::new(
            path.clone(),
            Rc::clone(&self.inner.store),
            self.inner.errors.clone(),
        );
        let len = {
            let mut fields = self.inner.fields.borrow_mut();
            fields.insert(key, field.clone());
            fields.len()
        };
        self.inner.count.set(len);
        field
    }

    pub(crate) fn get(&self, key: &str) -> Option<FieldState> {
        self.inner.fields.borrow().get(key).cloned()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    pub(crate) fn count(&self) -> &Observable<usize> {
        &self.inner.count
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    pub(crate) fn all(&self) -> Vec<FieldState> {
        self.inner.fields.borrow().values().cloned().collect()
    }

    /// Fields strictly below `path`. Every non-root field for the root.
    pub(crate) fn descendants(&self, path: &Path) -> Vec<FieldState> {
        let fields = self.inner.fields.borrow();
        if path.is_root() {
            return fields
                .iter()
                .filter(|(key, _)| !key.is_empty())
                .map(|(_, field)| field.clone())
                .collect();
        }
        let prefix = format!("{path}.");
        fields
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, field)| field.clone())
            .collect()
    }

    /// Keys strictly below `path`.
    pub(crate) fn keys_under(&self, path: &Path) -> Vec<String> {
        self.descendants(path)
            .iter()
            .map(|field| field.path_untracked().to_string())
            .collect()
    }

    /// Remove `removed` keys and insert `moved` fields under their new keys
    /// in one step, relabeling each moved field.
    pub(crate) fn rekey(&self, removed: &[String], moved: Vec<(Path, FieldState)>) {
        let len = {
            let mut fields = self.inner.fields.borrow_mut();
            for key in removed {
                fields.remove(key);
            }
            for (path, field) in &moved {
                fields.insert(path.to_string(), field.clone());
            }
            fields.len()
        };
        batch(|| {
            for (path, field) in moved {
                field.relabel(path);
            }
            self.inner.count.set(len);
        });
    }

    pub(crate) fn clear(&self) {
        let dropped = std::mem::take(&mut *self.inner.fields.borrow_mut());
        self.inner.count.set(0);
        drop(dropped);
    }
}

/// Whether `key` names a path strictly below `base`.
pub(crate) fn key_is_under(key: &str, base: &Path) -> bool {
    if base.is_root() {
        return !key.is_empty();
    }
    key.strip_prefix(base.to_string().as_str())
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Propagate a change at `path`: the exact field first, then each ancestor,
/// then every descendant, then the form-wide data version.
///
/// Runs inside a batch so effects observe the finished cascade once.
/// Returns how many fields were woken.
pub(crate) fn cascade(registry: &Registry, path: &Path, data_version: &Observable<u64>) -> usize {
    batch(|| {
        let mut woken = 0;
        if let Some(field) = registry.get(&path.to_string()) {
            field.wake();
            woken += 1;
        }
        for ancestor in path.ancestors() {
            if let Some(field) = registry.get(&ancestor.to_string()) {
                field.wake();
                woken += 1;
            }
        }
        for field in registry.descendants(path) {
            field.wake();
            woken += 1;
        }
        data_version.increment();
        tracing::trace!(message = "form.cascade", path = %path, woken);
        woken
    })
}
