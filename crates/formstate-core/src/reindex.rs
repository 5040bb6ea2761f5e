#![forbid(unsafe_code)]

//! Array-structural reindexing of field states and error entries.
//!
//! After an insert, remove, or move on the array at `base`, every field and
//! error entry keyed `base.<k>...` is relocated to the index its element now
//! occupies. Fields keep their identity; only their path changes.
//!
//! # Invariants
//!
//! 1. Each key is remapped exactly once. New keys are computed from the
//!    pre-edit key set, never from partially moved state.
//! 2. A removed element's fields and errors are dropped.
//! 3. After a move every error entry under `base.*` is cleared rather than
//!    remapped; the re-validation that follows rebuilds them.
//! 4. Keys outside `base.*` and keys whose next segment is not an index are
//!    untouched.

use formstate_doc::{Path, array};
use formstate_reactive::Observable;

use crate::error_map::ErrorMap;
use crate::registry::Registry;

/// A structural edit on one array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayEdit {
    Insert { index: usize },
    Remove { index: usize },
    Move { from: usize, to: usize },
}

impl ArrayEdit {
    /// New position of the element that sat at `index`, or `None` if it no
    /// longer exists or can no longer be addressed.
    #[must_use]
    pub fn remap(self, index: usize) -> Option<usize> {
        match self {
            Self::Insert { index: at } if index >= at => index.checked_add(1),
            Self::Insert { .. } => Some(index),
            Self::Remove { index: at } => match index.cmp(&at) {
                std::cmp::Ordering::Less => Some(index),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(index - 1),
            },
            Self::Move { from, to } => Some(array::moved_index(index, from, to)),
        }
    }

    fn clears_errors(self) -> bool {
        matches!(self, Self::Move { .. })
    }
}

/// What a reindex pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub fields_moved: usize,
    pub fields_dropped: usize,
    pub errors_moved: usize,
    pub errors_dropped: usize,
}

/// Relocate fields and error entries under `base` after `edit`.
pub(crate) fn reindex(
    base: &Path,
    edit: ArrayEdit,
    registry: &Registry,
    errors: &Observable<ErrorMap>,
) -> ReindexReport {
    let mut report = ReindexReport::default();

    // ── Fields ──────────────────────────────────────────────────────────
    let mut removed = Vec::new();
    let mut moved = Vec::new();
    for key in registry.keys_under(base) {
        let path = Path::parse(&key);
        let Some(index) = path.index_under(base) else {
            continue;
        };
        match edit.remap(index) {
            Some(next) if next == index => {}
            Some(next) => {
                if let Some(field) = registry.get(&key) {
                    moved.push((path.with_index_under(base, next), field));
                }
                removed.push(key);
                report.fields_moved += 1;
            }
            None => {
                removed.push(key);
                report.fields_dropped += 1;
            }
        }
    }
    if !removed.is_empty() {
        registry.rekey(&removed, moved);
    }

    // ── Errors ──────────────────────────────────────────────────────────
    errors.update_if(|map| {
        let affected: Vec<(String, Path, usize)> = map
            .keys()
            .filter_map(|key| {
                let path = Path::parse(key);
                let index = path.index_under(base)?;
                Some((key.clone(), path, index))
            })
            .collect();
        let mut relocated = Vec::new();
        for (key, path, index) in affected {
            let remapped = if edit.clears_errors() {
                None
            } else {
                edit.remap(index)
            };
            match remapped {
                Some(next) if next == index => {}
                Some(next) => {
                    if let Some(messages) = map.remove(&key) {
                        relocated.push((path.with_index_under(base, next).to_string(), messages));
                        report.errors_moved += 1;
                    }
                }
                None => {
                    map.remove(&key);
                    report.errors_dropped += 1;
                }
            }
        }
        map.extend(relocated);
        report.errors_moved + report.errors_dropped > 0
    });

    report
}
