#![forbid(unsafe_code)]

//! Path-addressed access to `serde_json::Value` documents.
//!
//! All functions are pure with respect to anything but the document passed
//! in. Missing intermediate segments make reads return `None`/`false`
//! instead of failing; writes create the containers they need.
//!
//! # Container rules
//!
//! | segment | object | array | missing / scalar (write only) |
//! |---|---|---|---|
//! | `Key(k)` | key `k` | nothing on read; array becomes an object on write | new object |
//! | `Index(i)` | key `"i"` | slot `i` | new array |
//!
//! An index segment only addresses an array slot while it lies within
//! [`MAX_INDEX_GAP`] slots past the array's end. A write through an index
//! further out stores it as an object key instead, so the array becomes an
//! object exactly as it does for a `Key` segment. Writes never pad an array
//! with more than [`MAX_INDEX_GAP`] nulls.
//!
//! `remove` never changes an array's length: the slot is set to `null`.
//! Length changes belong to [`crate::array`].

use serde_json::{Map, Value};

use crate::path::{Path, Seg};

/// Most `null` slots a single write may append before the written index.
pub const MAX_INDEX_GAP: usize = 1024;

/// Whether a write of index `i` into an array of `len` items may pad it.
fn within_gap(i: usize, len: usize) -> bool {
    i <= len.saturating_add(MAX_INDEX_GAP)
}

/// Read the value at `path`.
#[must_use]
pub fn get<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path {
        current = child(current, seg)?;
    }
    Some(current)
}

/// Mutable access to the value at `path`, without creating anything.
pub fn get_mut<'a>(doc: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = doc;
    for seg in path {
        current = child_mut(current, seg)?;
    }
    Some(current)
}

/// True if the parent of `path` holds the final key or index.
///
/// A key holding `null` exists; so does an array slot cleared by
/// [`remove`]. The root always exists.
#[must_use]
pub fn has(doc: &Value, path: &Path) -> bool {
    let Some(last) = path.last() else {
        return true;
    };
    let parent = &path.segments()[..path.len() - 1];
    let mut current = doc;
    for seg in parent {
        match child(current, seg) {
            Some(next) => current = next,
            None => return false,
        }
    }
    child(current, last).is_some()
}

/// Write `value` at `path`, creating intermediate containers.
///
/// Writing the root replaces the whole document.
pub fn set(doc: &mut Value, path: &Path, value: Value) {
    let slot = create(doc, path, || Value::Null);
    *slot = value;
}

/// Get the value at `path`, creating it (and every missing container on
/// the way) with `default` if absent.
pub fn create<'a, F>(doc: &'a mut Value, path: &Path, default: F) -> &'a mut Value
where
    F: FnOnce() -> Value,
{
    let segments = path.segments();
    let mut current = doc;
    for (i, seg) in segments.iter().enumerate() {
        let next_is_index = segments
            .get(i + 1)
            .map(|s| s.as_index().is_some_and(|n| within_gap(n, 0)));
        current = child_or_insert(current, seg, next_is_index);
    }
    if current.is_null() && !path.is_root() {
        *current = default();
    }
    current
}

/// Remove the value at `path` and return it.
///
/// Object keys are deleted. Array slots are replaced by `null` so the
/// array keeps its length. Removing the root resets it to `null`.
pub fn remove(doc: &mut Value, path: &Path) -> Option<Value> {
    let Some(last) = path.last() else {
        return Some(std::mem::take(doc));
    };
    let parent = path.parent().unwrap_or_default();
    match get_mut(doc, &parent)? {
        Value::Object(map) => map.remove(&last.object_key()),
        Value::Array(items) => {
            let slot = items.get_mut(last.as_index()?)?;
            Some(std::mem::take(slot))
        }
        _ => None,
    }
}

fn child<'a>(current: &'a Value, seg: &Seg) -> Option<&'a Value> {
    match (current, seg) {
        (Value::Object(map), _) => map.get(&seg.object_key()),
        (Value::Array(items), Seg::Index(i)) => items.get(*i),
        _ => None,
    }
}

fn child_mut<'a>(current: &'a mut Value, seg: &Seg) -> Option<&'a mut Value> {
    match (current, seg) {
        (Value::Object(map), _) => map.get_mut(&seg.object_key()),
        (Value::Array(items), Seg::Index(i)) => items.get_mut(*i),
        _ => None,
    }
}

/// Step into `seg`, creating the container `current` must be.
///
/// `next_is_index` describes the segment after `seg` (`None` when `seg` is
/// last); it decides the shape of a freshly created child container.
fn child_or_insert<'a>(
    current: &'a mut Value,
    seg: &Seg,
    next_is_index: Option<bool>,
) -> &'a mut Value {
    match seg {
        Seg::Index(i) if !current.is_object() && within_gap(*i, array_len(current)) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(items) = current else {
                unreachable!("container was just made an array");
            };
            if items.len() <= *i {
                items.resize(*i + 1, Value::Null);
            }
            let slot = &mut items[*i];
            prepare_slot(slot, next_is_index);
            slot
        }
        _ => {
            if let Value::Array(items) = &mut *current {
                let converted: Map<String, Value> = std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect();
                *current = Value::Object(converted);
            } else if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                unreachable!("container was just made an object");
            };
            let slot = map.entry(seg.object_key()).or_insert(Value::Null);
            prepare_slot(slot, next_is_index);
            slot
        }
    }
}

fn array_len(value: &Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}

fn prepare_slot(slot: &mut Value, next_is_index: Option<bool>) {
    match next_is_index {
        Some(true) if !slot.is_array() && !slot.is_object() => *slot = Value::Array(Vec::new()),
        Some(false) if !slot.is_object() && !slot.is_array() => *slot = Value::Object(Map::new()),
        _ => {}
    }
}
