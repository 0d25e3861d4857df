//! Structured error taxonomy
//!
//! Every rejected operation carries enough context for a caller to render a
//! precise error: validation failures list each individual violation,
//! conflicts name the current and requested state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Core error taxonomy
///
/// | Variant | Meaning |
/// |---------|---------|
/// | `Validation` | Malformed input, rejected before any state change |
/// | `Conflict` | State-machine or business-rule violation |
/// | `NotFound` | Referenced entity does not exist |
/// | `Infrastructure` | Failure outside the business taxonomies, never retried here |
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoreError {
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<Violation>),

    #[error("{entity}: {detail}")]
    Conflict {
        entity: String,
        current: String,
        requested: String,
        detail: String,
    },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl CoreError {
    /// Single-violation validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![Violation::new(field, message)])
    }

    /// Validation error from a collected violation list
    pub fn violations(violations: Vec<Violation>) -> Self {
        Self::Validation(violations)
    }

    /// Conflict for a rejected state-machine transition
    pub fn invalid_transition(
        entity: impl Into<String>,
        current: impl std::fmt::Debug,
        requested: impl std::fmt::Debug,
    ) -> Self {
        let current = format!("{current:?}");
        let requested = format!("{requested:?}");
        Self::Conflict {
            entity: entity.into(),
            detail: format!("invalid transition {current} -> {requested}"),
            current,
            requested,
        }
    }

    /// Conflict for a business-rule violation without a transition pair
    pub fn conflict(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
            current: String::new(),
            requested: String::new(),
            detail: detail.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Core-level Result type
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_all_violations() {
        let err = CoreError::violations(vec![
            Violation::new("lines", "line list must not be empty"),
            Violation::new("party_size", "must be positive"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("lines: line list must not be empty"));
        assert!(msg.contains("party_size: must be positive"));
    }

    #[test]
    fn test_invalid_transition_carries_both_states() {
        #[derive(Debug)]
        enum S {
            A,
            B,
        }
        let err = CoreError::invalid_transition("order", S::A, S::B);
        match &err {
            CoreError::Conflict {
                current, requested, ..
            } => {
                assert_eq!(current, "A");
                assert_eq!(requested, "B");
            }
            _ => panic!("expected Conflict"),
        }
        assert!(err.is_conflict());
    }

    #[test]
    fn test_not_found_display() {
        let err = CoreError::not_found("table", 12);
        assert_eq!(err.to_string(), "table not found: 12");
        assert!(err.is_not_found());
    }
}
