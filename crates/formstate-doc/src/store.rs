#![forbid(unsafe_code)]

//! The document storage backend.
//!
//! [`Store`] is the only way the form engine touches document data. The
//! default [`JsonStore`] keeps the document in an `Rc<Value>` and writes
//! through [`Rc::make_mut`], so [`Store::snapshot`] is O(1) and a snapshot
//! handed to a validator never observes later writes.
//!
//! Array operations report whether they applied. Callers use that to skip
//! reindexing and revalidation for structural no-ops.

use std::rc::Rc;

use serde_json::Value;

use crate::access;
use crate::array;
use crate::path::Path;

/// Path-addressed document storage.
pub trait Store {
    /// Value at `path`, cloned out of the document.
    fn get(&self, path: &Path) -> Option<Value>;

    fn set(&mut self, path: &Path, value: Value);

    fn has(&self, path: &Path) -> bool;

    fn remove(&mut self, path: &Path) -> Option<Value>;

    /// The whole document.
    fn all(&self) -> &Value;

    /// Shared read-only view of the current document.
    fn snapshot(&self) -> Rc<Value>;

    /// Independent deep copy implementing the same contract.
    fn clone_store(&self) -> Box<dyn Store>;

    /// Append to the array at `path`, creating it if missing. Returns the
    /// new element's index, or `None` if `path` holds a non-array value.
    fn array_push(&mut self, path: &Path, item: Value) -> Option<usize>;

    /// Insert into the array at `path` (index clamped to its length),
    /// creating the array if missing. Returns the index used.
    fn array_insert(&mut self, path: &Path, index: usize, item: Value) -> Option<usize>;

    /// Remove and return the element at `index`.
    fn array_remove(&mut self, path: &Path, index: usize) -> Option<Value>;

    /// Relocate an element. Returns `false` for a no-op.
    fn array_move(&mut self, path: &Path, from: usize, to: usize) -> bool;
}

/// Copy-on-write JSON document store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonStore {
    doc: Rc<Value>,
}

impl JsonStore {
    #[must_use]
    pub fn new(doc: Value) -> Self {
        Self { doc: Rc::new(doc) }
    }

    /// Consume the store, returning the document.
    #[must_use]
    pub fn into_value(self) -> Value {
        Rc::unwrap_or_clone(self.doc)
    }

    fn array_mut(&mut self, path: &Path) -> Option<&mut Vec<Value>> {
        access::get_mut(Rc::make_mut(&mut self.doc), path)?.as_array_mut()
    }

    fn array_or_create(&mut self, path: &Path) -> Option<&mut Vec<Value>> {
        let doc = Rc::make_mut(&mut self.doc);
        access::create(doc, path, || Value::Array(Vec::new())).as_array_mut()
    }
}

impl From<Value> for JsonStore {
    fn from(doc: Value) -> Self {
        Self::new(doc)
    }
}

impl Store for JsonStore {
    fn get(&self, path: &Path) -> Option<Value> {
        access::get(&self.doc, path).cloned()
    }

    fn set(&mut self, path: &Path, value: Value) {
        access::set(Rc::make_mut(&mut self.doc), path, value);
    }

    fn has(&self, path: &Path) -> bool {
        access::has(&self.doc, path)
    }

    fn remove(&mut self, path: &Path) -> Option<Value> {
        if !access::has(&self.doc, path) {
            return None;
        }
        access::remove(Rc::make_mut(&mut self.doc), path)
    }

    fn all(&self) -> &Value {
        &self.doc
    }

    fn snapshot(&self) -> Rc<Value> {
        Rc::clone(&self.doc)
    }

    fn clone_store(&self) -> Box<dyn Store> {
        Box::new(JsonStore::new(Value::clone(&self.doc)))
    }

    fn array_push(&mut self, path: &Path, item: Value) -> Option<usize> {
        let items = self.array_or_create(path)?;
        items.push(item);
        Some(items.len() - 1)
    }

    fn array_insert(&mut self, path: &Path, index: usize, item: Value) -> Option<usize> {
        let items = self.array_or_create(path)?;
        Some(array::insert(items, index, item))
    }

    fn array_remove(&mut self, path: &Path, index: usize) -> Option<Value> {
        let len = access::get(&self.doc, path)?.as_array()?.len();
        if index >= len {
            return None;
        }
        array::remove(self.array_mut(path)?, index)
    }

    fn array_move(&mut self, path: &Path, from: usize, to: usize) -> bool {
        let Some(len) = access::get(&self.doc, path)
            .and_then(Value::as_array)
            .map(Vec::len)
        else {
            return false;
        };
        if from == to || from >= len || to >= len {
            return false;
        }
        self.array_mut(path)
            .is_some_and(|items| array::move_item(items, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: &str) -> Path {
        Path::parse(raw)
    }

    #[test]
    fn snapshot_does_not_alias_later_writes() {
        let mut store = JsonStore::new(json!({"a": 1}));
        let snap = store.snapshot();
        store.set(&p("a"), json!(2));
        assert_eq!(*snap, json!({"a": 1}));
        assert_eq!(store.get(&p("a")), Some(json!(2)));
    }

    #[test]
    fn clone_store_is_independent() {
        let mut store = JsonStore::new(json!({"list": [1]}));
        let copy = store.clone_store();
        store.array_push(&p("list"), json!(2));
        assert_eq!(copy.all(), &json!({"list": [1]}));
        assert_eq!(store.all(), &json!({"list": [1, 2]}));
    }

    #[test]
    fn array_ops_create_missing_arrays() {
        let mut store = JsonStore::default();
        assert_eq!(store.array_insert(&p("tags"), 5, json!("x")), Some(0));
        assert_eq!(store.array_push(&p("tags"), json!("y")), Some(1));
        assert_eq!(store.all(), &json!({"tags": ["x", "y"]}));
    }

    #[test]
    fn array_ops_ignore_non_arrays() {
        let mut store = JsonStore::new(json!({"name": "n"}));
        assert_eq!(store.array_push(&p("name"), json!(1)), None);
        assert_eq!(store.array_remove(&p("name"), 0), None);
        assert!(!store.array_move(&p("name"), 0, 1));
        assert_eq!(store.all(), &json!({"name": "n"}));
    }

    #[test]
    fn noop_edits_do_not_copy_shared_documents() {
        let mut store = JsonStore::new(json!({"list": [1, 2]}));
        let snap = store.snapshot();
        assert_eq!(store.array_remove(&p("list"), 9), None);
        assert!(!store.array_move(&p("list"), 0, 0));
        assert!(Rc::ptr_eq(&snap, &store.snapshot()));
    }

    #[test]
    fn move_and_remove_apply() {
        let mut store = JsonStore::new(json!({"list": ["a", "b", "c"]}));
        assert!(store.array_move(&p("list"), 0, 2));
        assert_eq!(store.all(), &json!({"list": ["b", "c", "a"]}));
        assert_eq!(store.array_remove(&p("list"), 1), Some(json!("c")));
        assert_eq!(store.all(), &json!({"list": ["b", "a"]}));
    }
}
