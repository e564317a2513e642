//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations while resolving or expanding values.
/// These are independent of how documents were loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("missing reference: {reference}")]
    MissingReference { reference: String },

    #[error("malformed value '{value}': {reason}")]
    MalformedValue { value: String, reason: String },

    #[error("invalid path '{path}': absolute paths are not supported")]
    InvalidPath { path: String },

    #[error("cyclic reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("cannot convert value '{value}' at '{path}' to {target}")]
    Coercion {
        path: String,
        value: String,
        target: &'static str,
    },
}

impl DomainError {
    pub fn missing(reference: impl Into<String>) -> Self {
        Self::MissingReference {
            reference: reference.into(),
        }
    }

    pub fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedValue {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True for the failure kind the tolerant lookup converts into an absent value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingReference { .. })
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
