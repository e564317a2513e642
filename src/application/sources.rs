//! Ordered document sources for a configuration load.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;

/// Schema entry meaning "no schema for this document".
pub const NO_SCHEMA: &str = "-";

/// Extension of documents picked up from a directory.
pub const DOCUMENT_EXTENSION: &str = "xml";

/// Documents to load, in merge order, each with an optional schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    files: Vec<PathBuf>,
    schemas: Vec<Option<PathBuf>>,
}

impl ConfigSources {
    /// Documents without schemas.
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        let schemas = vec![None; files.len()];
        Self { files, schemas }
    }

    /// Documents with a parallel list of schemas.
    pub fn with_schemas(
        files: Vec<PathBuf>,
        schemas: Vec<Option<PathBuf>>,
    ) -> ApplicationResult<Self> {
        if files.len() != schemas.len() {
            return Err(ApplicationError::InvalidSources {
                message: format!(
                    "{} documents but {} schema entries",
                    files.len(),
                    schemas.len()
                ),
            });
        }
        Ok(Self { files, schemas })
    }

    /// All `*.xml` documents directly inside `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> ApplicationResult<Self> {
        if !dir.is_dir() {
            return Err(ApplicationError::InvalidSources {
                message: format!("not a directory: {}", dir.display()),
            });
        }
        let files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == DOCUMENT_EXTENSION)
                    .unwrap_or(false)
            })
            .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
            .collect();
        debug!("from_dir: {} documents in {}", files.len(), dir.display());
        Ok(Self::new(files))
    }

    /// Document list configured in settings.
    pub fn from_settings(settings: &Settings) -> ApplicationResult<Self> {
        if settings.schemas.is_empty() {
            return Ok(Self::new(settings.files.clone()));
        }
        let schemas = settings
            .schemas
            .iter()
            .map(|s| parse_schema_entry(s))
            .collect();
        Self::with_schemas(settings.files.clone(), schemas)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `(document, schema)` pairs in merge order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, Option<&Path>)> {
        self.files
            .iter()
            .zip(self.schemas.iter())
            .map(|(f, s)| (f.as_path(), s.as_deref()))
    }
}

/// Map a textual schema entry to an optional path; empty or `-` means none.
pub fn parse_schema_entry(entry: &str) -> Option<PathBuf> {
    let entry = entry.trim();
    if entry.is_empty() || entry == NO_SCHEMA {
        None
    } else {
        Some(PathBuf::from(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_mismatched_schema_count_when_creating_then_invalid() {
        let result = ConfigSources::with_schemas(vec!["a.xml".into()], vec![]);
        assert!(matches!(
            result,
            Err(ApplicationError::InvalidSources { .. })
        ));
    }

    #[test]
    fn given_sentinel_when_parsing_schema_entry_then_none() {
        assert_eq!(parse_schema_entry("-"), None);
        assert_eq!(parse_schema_entry(""), None);
        assert_eq!(
            parse_schema_entry("conf.xsd"),
            Some(PathBuf::from("conf.xsd"))
        );
    }

    #[test]
    fn given_directory_when_collecting_then_sorted_xml_only() {
        let temp = TempDir::new().unwrap();
        for name in ["b.xml", "a.xml", "notes.txt"] {
            std::fs::write(temp.path().join(name), "<c/>").unwrap();
        }
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested").join("c.xml"), "<c/>").unwrap();

        let sources = ConfigSources::from_dir(temp.path()).unwrap();
        let names: Vec<_> = sources
            .files()
            .iter()
            .filter_map(|p| p.file_name())
            .filter_map(|n| n.to_str())
            .collect();
        assert_eq!(names, vec!["a.xml", "b.xml"]);
    }
}
