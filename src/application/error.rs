//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add load and lifecycle context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("configuration not initialized")]
    NotInitialized,

    #[error("load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("listener {listener} failed: {message}")]
    Listener { listener: String, message: String },

    #[error("invalid configuration sources: {message}")]
    InvalidSources { message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// Wrap any failure while loading `path`.
    pub fn load(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Load {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
