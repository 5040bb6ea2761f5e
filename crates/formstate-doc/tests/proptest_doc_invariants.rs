//! Property-based invariant tests for path parsing, document access, and
//! array edits.
//!
//! 1. `Path::parse(s).to_string() == s` for any dotted string.
//! 2. `get(set(doc, p, v), p) == v` for any non-root path.
//! 3. `has` agrees with `get` after a `set`.
//! 4. `remove` never changes the length of an array.
//! 5. `insert` grows by one and places the item at the clamped index.
//! 6. `move_item` matches remove-then-insert.
//! 7. `moved_index` locates every element after a move.
//! 8. Writes through far-out indices never pad an array past the gap limit.

use formstate_doc::{Path, Seg, access, array};
use proptest::prelude::*;
use serde_json::{Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        (0usize..6).prop_map(|i| i.to_string()),
        Just("00".to_string()),
        Just(String::new()),
    ]
}

fn path_string_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment_strategy(), 1..5).prop_map(|segs| segs.join("."))
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn document_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z0-9]{1,3}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Parse/display round-trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn path_display_round_trips(raw in "[a-z0-9.]{0,16}") {
        prop_assert_eq!(Path::parse(&raw).to_string(), raw);
    }

    #[test]
    fn digit_segments_without_leading_zero_are_indices(i in 0usize..100_000) {
        let path = Path::parse(&format!("list.{i}"));
        prop_assert_eq!(&path.segments()[1], &Seg::Index(i));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–4. Document access
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn set_then_get_round_trips(
        mut doc in document_strategy(),
        raw in path_string_strategy(),
        value in scalar_strategy(),
    ) {
        let path = Path::parse(&raw);
        access::set(&mut doc, &path, value.clone());
        prop_assert_eq!(access::get(&doc, &path), Some(&value));
        prop_assert!(access::has(&doc, &path));
    }

    #[test]
    fn far_indices_round_trip_without_padding(
        items in proptest::collection::vec(scalar_strategy(), 0..4),
        index in prop_oneof![
            Just(usize::MAX),
            (access::MAX_INDEX_GAP + 4)..usize::MAX,
        ],
        value in scalar_strategy(),
    ) {
        let mut doc = json!({ "list": items.clone() });
        let path = Path::parse(&format!("list.{index}"));
        access::set(&mut doc, &path, value.clone());
        prop_assert_eq!(access::get(&doc, &path), Some(&value));
        prop_assert_eq!(doc["list"].as_object().map(|m| m.len()), Some(items.len() + 1));
    }

    #[test]
    fn remove_keeps_array_lengths(
        items in proptest::collection::vec(scalar_strategy(), 1..8),
        index in 0usize..10,
    ) {
        let mut doc = json!({ "list": items.clone() });
        let path = Path::parse(&format!("list.{index}"));
        access::remove(&mut doc, &path);
        prop_assert_eq!(doc["list"].as_array().map(Vec::len), Some(items.len()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5–7. Array primitives
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn insert_grows_by_one(
        mut items in proptest::collection::vec(any::<u8>(), 0..16),
        index in 0usize..32,
    ) {
        let len = items.len();
        let at = array::insert(&mut items, index, 255);
        prop_assert_eq!(items.len(), len + 1);
        prop_assert_eq!(at, index.min(len));
        prop_assert_eq!(items[at], 255);
    }

    #[test]
    fn move_matches_remove_then_insert(
        items in proptest::collection::vec(any::<u16>(), 1..16),
        from in 0usize..16,
        to in 0usize..16,
    ) {
        let mut moved = items.clone();
        let applied = array::move_item(&mut moved, from, to);
        if from == to || from >= items.len() || to >= items.len() {
            prop_assert!(!applied);
            prop_assert_eq!(&moved, &items);
        } else {
            let mut expected = items.clone();
            let item = expected.remove(from);
            expected.insert(to, item);
            prop_assert!(applied);
            prop_assert_eq!(&moved, &expected);
        }
    }

    #[test]
    fn moved_index_locates_elements(
        len in 1usize..16,
        from in 0usize..16,
        to in 0usize..16,
    ) {
        prop_assume!(from < len && to < len);
        let before: Vec<usize> = (0..len).collect();
        let mut after = before.clone();
        array::move_item(&mut after, from, to);
        for old in 0..len {
            prop_assert_eq!(after[array::moved_index(old, from, to)], before[old]);
        }
    }
}
