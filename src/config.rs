//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rsconf/rsconf.toml`
//! 3. Local config: `<project_dir>/.rsconf.toml`
//! 4. Environment variables: `RSCONF_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::sources::parse_schema_entry;
use crate::application::ApplicationError;
use crate::domain::expand_env_vars;
use crate::domain::substitution::{DEFAULT_DELIMITER, DEFAULT_ENV_PREFIX, DEFAULT_MAX_DEPTH};
use crate::domain::MergeMode;

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub delimiter: Option<String>,
    pub env_prefix: Option<String>,
    pub merge_mode: Option<MergeMode>,
    pub expand_env_on_load: Option<bool>,
    pub max_depth: Option<usize>,
    pub files: Option<Vec<PathBuf>>,
    pub schemas: Option<Vec<String>>,
}

/// Engine settings for rsconf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Reference delimiter, a single character (default: `%`)
    pub delimiter: String,
    /// Prefix marking environment references (default: `env.`)
    pub env_prefix: String,
    /// How documents are combined
    pub merge_mode: MergeMode,
    /// Expand environment references while loading
    pub expand_env_on_load: bool,
    /// Maximum nesting of path references
    pub max_depth: usize,
    /// Default documents, in merge order
    pub files: Vec<PathBuf>,
    /// Schema per document; `-` means none
    pub schemas: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            merge_mode: MergeMode::default(),
            expand_env_on_load: false,
            max_depth: DEFAULT_MAX_DEPTH,
            files: Vec::new(),
            schemas: Vec::new(),
        }
    }
}

/// Get the XDG config directory for rsconf.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rsconf").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("rsconf.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".rsconf.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// The delimiter as a character.
    pub fn delimiter_char(&self) -> Result<char, ApplicationError> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ApplicationError::Config {
                message: format!(
                    "delimiter must be a single character, got '{}'",
                    self.delimiter
                ),
            }),
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.delimiter_char()?;
        if self.env_prefix.is_empty() {
            return Err(ApplicationError::Config {
                message: "env_prefix must not be empty".into(),
            });
        }
        if self.max_depth == 0 {
            return Err(ApplicationError::Config {
                message: "max_depth must be at least 1".into(),
            });
        }
        if !self.schemas.is_empty() && self.schemas.len() != self.files.len() {
            return Err(ApplicationError::Config {
                message: format!(
                    "{} files but {} schemas (use \"-\" for no schema)",
                    self.files.len(),
                    self.schemas.len()
                ),
            });
        }
        Ok(())
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.files = self
            .files
            .iter()
            .map(|f| PathBuf::from(expand_env_vars(f.to_string_lossy().as_ref())))
            .collect();
        self.schemas = self
            .schemas
            .iter()
            .map(|s| expand_env_vars(s))
            .collect();
    }

    /// Overlay config onto self: every specified field replaces the base.
    ///
    /// Document lists are replaced, never unioned, because their order decides
    /// merge precedence.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            delimiter: overlay
                .delimiter
                .clone()
                .unwrap_or_else(|| self.delimiter.clone()),
            env_prefix: overlay
                .env_prefix
                .clone()
                .unwrap_or_else(|| self.env_prefix.clone()),
            merge_mode: overlay.merge_mode.unwrap_or(self.merge_mode),
            expand_env_on_load: overlay
                .expand_env_on_load
                .unwrap_or(self.expand_env_on_load),
            max_depth: overlay.max_depth.unwrap_or(self.max_depth),
            files: overlay.files.clone().unwrap_or_else(|| self.files.clone()),
            schemas: overlay
                .schemas
                .clone()
                .unwrap_or_else(|| self.schemas.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), project_dir)
    }

    /// Load settings from an explicit global config path.
    ///
    /// Relative document and schema paths in the local config are resolved
    /// against the project directory.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let mut raw = load_raw_settings(&local_path)?;
                if let Some(files) = raw.files.as_mut() {
                    for f in files.iter_mut() {
                        if f.is_relative() {
                            *f = dir.join(&*f);
                        }
                    }
                }
                if let Some(schemas) = raw.schemas.as_mut() {
                    for s in schemas.iter_mut() {
                        if parse_schema_entry(s).is_some_and(|p| p.is_relative()) {
                            *s = dir.join(s.trim()).to_string_lossy().into_owned();
                        }
                    }
                }
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply RSCONF_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("RSCONF")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("files")
                .with_list_parse_key("schemas")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("delimiter") {
            settings.delimiter = val;
        }
        if let Ok(val) = config.get_string("env_prefix") {
            settings.env_prefix = val;
        }
        if let Ok(val) = config.get_string("merge_mode") {
            settings.merge_mode = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_bool("expand_env_on_load") {
            settings.expand_env_on_load = val;
        }
        if let Ok(val) = config.get_int("max_depth") {
            settings.max_depth = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("max_depth out of range: {val}"),
            })?;
        }
        if let Ok(val) = config.get::<Vec<String>>("files") {
            settings.files = val.into_iter().map(PathBuf::from).collect();
        }
        if let Ok(val) = config.get::<Vec<String>>("schemas") {
            settings.schemas = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# rsconf configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/rsconf/rsconf.toml
#   Local:  <project_dir>/.rsconf.toml
#   Env:    RSCONF_* environment variables (explicit overrides)

# Character enclosing references inside values: %db/host%
# delimiter = "%"

# Prefix of environment references: %env.HOME%
# env_prefix = "env."

# "merge" overlays later documents on earlier ones, "append" keeps them apart
# merge_mode = "merge"

# Expand environment references while loading documents
# expand_env_on_load = false

# Maximum nesting of references before failing
# max_depth = 64

# Documents to load, later ones override earlier ones
# files = ["defaults.xml", "local.xml"]

# Schema per document, "-" for none
# schemas = ["config.xsd", "-"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load_from(None, None).expect("load defaults");
        assert_eq!(settings.delimiter, "%");
        assert_eq!(settings.env_prefix, "env.");
        assert_eq!(settings.merge_mode, MergeMode::Merge);
        assert!(settings.files.is_empty());
    }

    #[test]
    fn given_multi_char_delimiter_when_validating_then_rejected() {
        let settings = Settings {
            delimiter: "%%".into(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            delimiter: String::new(),
            ..Settings::default()
        };
        assert!(settings.delimiter_char().is_err());
    }

    #[test]
    fn given_mismatched_schemas_when_validating_then_rejected() {
        let settings = Settings {
            files: vec!["a.xml".into(), "b.xml".into()],
            schemas: vec!["-".into()],
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn given_overlay_when_merging_then_specified_fields_replace() {
        let base = Settings {
            files: vec!["a.xml".into()],
            ..Settings::default()
        };
        let overlay = RawSettings {
            delimiter: Some("$".into()),
            files: Some(vec!["b.xml".into(), "c.xml".into()]),
            ..RawSettings::default()
        };

        let merged = base.merge_with(&overlay);
        assert_eq!(merged.delimiter, "$");
        assert_eq!(merged.env_prefix, "env.");
        assert_eq!(
            merged.files,
            vec![PathBuf::from("b.xml"), PathBuf::from("c.xml")]
        );
    }

    #[test]
    fn given_tilde_in_files_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            files: vec!["~/conf/app.xml".into()],
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let file = settings.files[0].to_string_lossy().to_string();
        assert!(file.starts_with(&home), "file should start with home: {file}");
        assert!(!file.contains('~'));
    }

    #[test]
    fn given_template_when_parsed_then_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.delimiter.is_none());
    }
}
