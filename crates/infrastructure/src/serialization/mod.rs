//! Deterministic JSON serialization for persisted records.
//!
//! Records are written with 2-space indentation and a trailing newline so
//! the file on disk is stable between writes of equal values.

mod json;

pub use json::*;
