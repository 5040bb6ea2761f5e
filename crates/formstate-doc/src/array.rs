#![forbid(unsafe_code)]

//! In-place structural edits on arrays.
//!
//! These run inside the reactive write path on potentially large
//! collections, so none of them allocate a second buffer.
//!
//! # Invariants
//!
//! 1. `insert` always grows the array by one; the index is clamped to
//!    `[0, len]`.
//! 2. `remove` and `move_item` are no-ops for out-of-range indices.
//! 3. `move_item(v, i, j)` produces the same order as removing element `i`
//!    and re-inserting it at `j`.

/// Insert `item` at `index`, clamped to the array length. Returns the index
/// actually used.
pub fn insert<T>(items: &mut Vec<T>, index: usize, item: T) -> usize {
    let at = index.min(items.len());
    items.insert(at, item);
    at
}

/// Remove the element at `index`, shifting later elements down.
///
/// Returns `None` (and leaves the array untouched) when out of range.
pub fn remove<T>(items: &mut Vec<T>, index: usize) -> Option<T> {
    (index < items.len()).then(|| items.remove(index))
}

/// Relocate the element at `from` to `to`, shifting the range in between
/// by one position.
///
/// Returns `false` for a no-op (`from == to` or either index out of range).
pub fn move_item<T>(items: &mut [T], from: usize, to: usize) -> bool {
    let len = items.len();
    if from == to || from >= len || to >= len {
        return false;
    }
    if from < to {
        items[from..=to].rotate_left(1);
    } else {
        items[to..=from].rotate_right(1);
    }
    true
}

/// Where an element that sat at `index` before `move_item(from, to)` sits
/// afterwards.
#[must_use]
pub fn moved_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if from > to && index >= to && index < from {
        index + 1
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_clamps_past_end() {
        let mut v = vec![1, 2];
        assert_eq!(insert(&mut v, 10, 3), 2);
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn insert_shifts_later_entries() {
        let mut v = vec!['a', 'c'];
        assert_eq!(insert(&mut v, 1, 'b'), 1);
        assert_eq!(v, vec!['a', 'b', 'c']);
        insert(&mut v, 0, 'z');
        assert_eq!(v, vec!['z', 'a', 'b', 'c']);
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let mut v = vec![1, 2, 3];
        assert_eq!(remove(&mut v, 3), None);
        assert_eq!(v, vec![1, 2, 3]);
        assert_eq!(remove(&mut v, 0), Some(1));
        assert_eq!(v, vec![2, 3]);
    }

    #[test]
    fn move_forward_and_backward() {
        let mut v = vec!['a', 'b', 'c', 'd', 'e'];
        assert!(move_item(&mut v, 1, 3));
        assert_eq!(v, vec!['a', 'c', 'd', 'b', 'e']);
        assert!(move_item(&mut v, 3, 0));
        assert_eq!(v, vec!['b', 'a', 'c', 'd', 'e']);
    }

    #[test]
    fn move_noops() {
        let mut v = vec![1, 2, 3];
        assert!(!move_item(&mut v, 1, 1));
        assert!(!move_item(&mut v, 0, 3));
        assert!(!move_item(&mut v, 5, 0));
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn moved_index_tracks_every_element() {
        let before = vec![0usize, 1, 2, 3, 4, 5];
        for from in 0..before.len() {
            for to in 0..before.len() {
                let mut after = before.clone();
                move_item(&mut after, from, to);
                for (old, value) in before.iter().enumerate() {
                    assert_eq!(after[moved_index(old, from, to)], *value);
                }
            }
        }
    }
}
