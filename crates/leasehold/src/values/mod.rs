//! Immutable value objects validated at construction.

pub mod email;
pub mod money;

pub use email::{Email, EmailPolicy};
pub use money::Money;

/// Failure raised by value objects and entity lifecycles.
///
/// Errors surface at the point of construction or mutation and are never
/// swallowed here; callers decide how to present them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

impl DomainError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
