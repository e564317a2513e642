//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::domain::Element;
use crate::infrastructure::error::DocumentError;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;
}

/// Environment variable and system property lookup.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Parser producing the element tree of one document.
pub trait DocumentParser: Send + Sync {
    /// Parse a complete document into its root element.
    fn parse(&self, content: &str) -> Result<Element, DocumentError>;

    /// Check a parsed document against a schema document.
    fn validate(&self, document: &Element, schema: &str) -> Result<(), DocumentError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Process environment.
#[derive(Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of properties, consulted before an optional fallback.
///
/// Plays the role of system properties layered over the process environment,
/// and keeps tests away from the global environment.
#[derive(Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
    fallback: Option<Box<dyn Environment>>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties backed by the process environment.
    pub fn over_process() -> Self {
        Self {
            vars: HashMap::new(),
            fallback: Some(Box::new(ProcessEnvironment)),
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| self.fallback.as_ref().and_then(|f| f.var(name)))
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapEnvironment {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |env, (k, v)| env.with_var(k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_map_over_process_when_looking_up_then_map_wins_then_falls_back() {
        let env = MapEnvironment::over_process().with_var("PATH", "overridden");

        assert_eq!(env.var("PATH").as_deref(), Some("overridden"));
        assert_eq!(env.var("RSCONF_SURELY_UNSET_VARIABLE"), None);
    }

    #[test]
    fn given_plain_map_when_looking_up_then_process_not_consulted() {
        let env = MapEnvironment::from([("A", "1")]);

        assert_eq!(env.var("A").as_deref(), Some("1"));
        assert_eq!(env.var("PATH"), None);
    }

    #[test]
    fn given_missing_file_when_checking_then_not_a_file() {
        let fs = RealFileSystem;
        assert!(!fs.is_file(Path::new("/definitely/not/here.xml")));
    }
}
