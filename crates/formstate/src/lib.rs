#![forbid(unsafe_code)]

//! Reactive form state public facade crate.
//!
//! Re-exports the document layer, the reactive primitives, and the form
//! controller behind one dependency.

pub use formstate_core::{
    ArrayEdit, ErrorMap, FieldState, FnValidator, Form, FormBuilder, FormConfig, FormError,
    FormSignals, MergePolicy, NoopValidator, Pending, SetValueOptions, Validator, ValidatorError,
};
pub use formstate_doc::{JsonStore, Path, Seg, Store, path};

pub mod prelude {
    pub use formstate_core as core;
    pub use formstate_doc as doc;
    pub use formstate_reactive as reactive;

    pub use formstate_core::{Form, SetValueOptions, Validator};
    pub use formstate_doc::Path;
    pub use formstate_reactive::{Computed, Effect, Observable, batch};
}
