#![forbid(unsafe_code)]

//! Reactive field state for nested JSON forms.
//!
//! A [`Form`] wraps a JSON document and hands out one [`FieldState`] per
//! dotted path. Field values, errors, and validity are derived signals that
//! stay correct across writes at any depth and across array insert, remove,
//! and move, which relocate fields and error entries instead of rebuilding
//! them.
//!
//! ```
//! use formstate_core::{Form, SetValueOptions};
//! use serde_json::json;
//!
//! let form = Form::new(json!({"items": [{"name": "a"}, {"name": "b"}]}));
//! let second = form.field("items.1.name");
//!
//! let _ = form.array_remove("items", 0);
//! assert_eq!(second.path(), "items.0.name");
//! assert_eq!(second.value(), Some(json!("b")));
//!
//! let _ = form.set_value("items.0.name", json!("c"), SetValueOptions::silent());
//! assert_eq!(second.value(), Some(json!("c")));
//! ```

pub mod config;
pub mod error;
pub mod error_map;
pub mod field;
pub mod form;
pub mod pending;
mod registry;
pub mod reindex;
pub mod validator;

pub use config::{FormConfig, MergePolicy, SetValueOptions};
pub use error::{FormError, Result, ValidatorError};
pub use error_map::ErrorMap;
pub use field::FieldState;
pub use form::{Form, FormBuilder, FormSignals};
pub use pending::Pending;
pub use reindex::{ArrayEdit, ReindexReport};
pub use validator::{FnValidator, NoopValidator, Validator};
