#![forbid(unsafe_code)]

//! The form-level error map: path string to validation messages.
//!
//! # Invariants
//!
//! 1. A stored entry never holds an empty list; clearing a path removes
//!    its key.
//! 2. Keys are canonical path strings (`Path::to_string` of the parsed key).

use std::collections::BTreeMap;

use formstate_doc::Path;

/// Validation messages keyed by dotted path.
pub type ErrorMap = BTreeMap<String, Vec<String>>;

/// Drop empty lists and canonicalize keys.
#[must_use]
pub fn normalize(map: ErrorMap) -> ErrorMap {
    map.into_iter()
        .filter(|(_, messages)| !messages.is_empty())
        .map(|(key, messages)| (Path::parse(&key).to_string(), messages))
        .collect()
}

/// Set or clear the entry for one path. Returns whether the map changed.
pub(crate) fn put(map: &mut ErrorMap, key: &str, messages: Vec<String>) -> bool {
    if messages.is_empty() {
        return map.remove(key).is_some();
    }
    if map.get(key) == Some(&messages) {
        return false;
    }
    map.insert(key.to_string(), messages);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_empty_lists() {
        let mut map = ErrorMap::new();
        map.insert("a".into(), vec![]);
        map.insert("b".into(), vec!["required".into()]);
        let map = normalize(map);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn put_removes_on_empty() {
        let mut map = ErrorMap::new();
        assert!(put(&mut map, "x", vec!["bad".into()]));
        assert_eq!(map["x"], vec!["bad"]);
        assert!(!put(&mut map, "x", vec!["bad".into()]));
        assert!(put(&mut map, "x", Vec::new()));
        assert!(map.is_empty());
        assert!(!put(&mut map, "x", Vec::new()));
    }
}
