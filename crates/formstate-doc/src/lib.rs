#![forbid(unsafe_code)]

//! Document model for formstate: dotted paths, path-addressed access to
//! `serde_json::Value` trees, in-place array edits, and the [`Store`]
//! backend contract.

pub mod access;
pub mod array;
pub mod path;
pub mod store;

pub use path::{Path, Seg};
pub use store::{JsonStore, Store};
