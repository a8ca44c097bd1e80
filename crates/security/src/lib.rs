//! Filesystem sandboxing for model-initiated file access.

pub mod path;

pub use path::{PathValidationError, Sandbox};
