//! Shared types for the Comedor floor coordination core
//!
//! This crate contains the entity models and the structured error taxonomy
//! used by `comedor-core`. It holds no business logic beyond pure helpers
//! on the types themselves (transition tables, interval math).

pub mod error;
pub mod models;

pub use error::{CoreError, CoreResult, Violation};
