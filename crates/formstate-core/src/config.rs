#![forbid(unsafe_code)]

//! Form configuration and per-call write options.

use serde::{Deserialize, Serialize};

/// How results of overlapping validations for the same target are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Only the most recently started request for a path may write its
    /// result. Older completions are dropped, and a reset or an array edit
    /// under the path invalidates everything in flight.
    #[default]
    LatestWins,
    /// Every completion merges in completion order, even after a reset.
    LastWriteWins,
}

/// Behaviour switches for a [`Form`](crate::Form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub merge_policy: MergePolicy,
    /// Re-validate the array path after insert, remove, and move.
    pub validate_on_array_edit: bool,
    /// Mark the array's own field dirty after a structural edit.
    pub mark_array_dirty: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::LatestWins,
            validate_on_array_edit: true,
            mark_array_dirty: true,
        }
    }
}

impl FormConfig {
    #[must_use]
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    #[must_use]
    pub fn with_validate_on_array_edit(mut self, enabled: bool) -> Self {
        self.validate_on_array_edit = enabled;
        self
    }

    #[must_use]
    pub fn with_mark_array_dirty(mut self, enabled: bool) -> Self {
        self.mark_array_dirty = enabled;
        self
    }
}

/// Options for [`Form::set_value`](crate::Form::set_value).
///
/// The default marks the field touched and dirty, and validates because the
/// write is dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetValueOptions {
    pub touch: bool,
    pub dirty: bool,
    /// Force validation on or off. `None` validates when `dirty` is set.
    pub validate: Option<bool>,
}

impl Default for SetValueOptions {
    fn default() -> Self {
        Self {
            touch: true,
            dirty: true,
            validate: None,
        }
    }
}

impl SetValueOptions {
    /// A programmatic write: no flags, no validation unless the field was
    /// validated before.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            touch: false,
            dirty: false,
            validate: None,
        }
    }

    #[must_use]
    pub fn with_touch(mut self, touch: bool) -> Self {
        self.touch = touch;
        self
    }

    #[must_use]
    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    #[must_use]
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Whether this write requests validation on its own.
    #[must_use]
    pub fn wants_validation(&self) -> bool {
        self.validate.unwrap_or(self.dirty)
    }
}
