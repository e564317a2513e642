//! Error conversion helpers for load-time operations
//!
//! Provides extension traits for cleaner error handling with path context.

use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting fallible load steps to `ApplicationResult`.
pub trait LoadResultExt<T> {
    /// Attach the document path to a load failure.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&file)
    ///     .with_path_context(&file)?;
    /// ```
    fn with_path_context(self, path: &Path) -> ApplicationResult<T>;
}

impl<T, E> LoadResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_path_context(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::load(path, e))
    }
}
