#![forbid(unsafe_code)]

//! The validation seam.
//!
//! A [`Validator`] sees the path and an immutable snapshot of the whole
//! document, so it may consult sibling values. Both methods are async; the
//! form never awaits them while holding a borrow of its own state.

use async_trait::async_trait;
use formstate_doc::Path;
use serde_json::Value;

use crate::error::ValidatorError;
use crate::error_map::ErrorMap;

#[async_trait(?Send)]
pub trait Validator {
    /// Messages for a single path. An empty list means valid.
    async fn validate_field(&self, path: &Path, values: &Value)
    -> Result<Vec<String>, ValidatorError>;

    /// Messages for the whole document. Paths without errors may be absent
    /// or map to an empty list.
    async fn validate(&self, values: &Value) -> Result<ErrorMap, ValidatorError>;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

#[async_trait(?Send)]
impl Validator for NoopValidator {
    async fn validate_field(
        &self,
        _path: &Path,
        _values: &Value,
    ) -> Result<Vec<String>, ValidatorError> {
        Ok(Vec::new())
    }

    async fn validate(&self, _values: &Value) -> Result<ErrorMap, ValidatorError> {
        Ok(ErrorMap::new())
    }
}

type FieldFn = dyn Fn(&Path, &Value) -> Result<Vec<String>, ValidatorError>;
type FormFn = dyn Fn(&Value) -> Result<ErrorMap, ValidatorError>;

/// A synchronous validator built from closures.
///
/// Either closure may be left out; the missing side reports no errors.
#[derive(Default)]
pub struct FnValidator {
    field: Option<Box<FieldFn>>,
    form: Option<Box<FormFn>>,
}

impl FnValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_field(
        mut self,
        f: impl Fn(&Path, &Value) -> Result<Vec<String>, ValidatorError> + 'static,
    ) -> Self {
        self.field = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_form(
        mut self,
        f: impl Fn(&Value) -> Result<ErrorMap, ValidatorError> + 'static,
    ) -> Self {
        self.form = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnValidator")
            .field("field", &self.field.is_some())
            .field("form", &self.form.is_some())
            .finish()
    }
}

#[async_trait(?Send)]
impl Validator for FnValidator {
    async fn validate_field(
        &self,
        path: &Path,
        values: &Value,
    ) -> Result<Vec<String>, ValidatorError> {
        match &self.field {
            Some(f) => f(path, values),
            None => Ok(Vec::new()),
        }
    }

    async fn validate(&self, values: &Value) -> Result<ErrorMap, ValidatorError> {
        match &self.form {
            Some(f) => f(values),
            None => Ok(ErrorMap::new()),
        }
    }
}
