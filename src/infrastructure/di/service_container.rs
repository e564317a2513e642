//! Service container for dependency injection
//!
//! Wires up the configuration service with its dependencies.

use std::sync::Arc;

use crate::application::services::{ConfigurationService, LoadOptions};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::infrastructure::traits::{
    DocumentParser, Environment, FileSystem, MapEnvironment, RealFileSystem,
};
use crate::infrastructure::xml::XmlDocumentParser;

/// Container holding the engine's collaborators.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Environment lookup for `env.` references
    pub env: Arc<dyn Environment>,

    /// Document parser
    pub parser: Arc<dyn DocumentParser>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_properties(settings, Vec::<(String, String)>::new())
    }

    /// Real implementations, with `properties` shadowing the process
    /// environment for `env.` references.
    pub fn with_properties<I, K, V>(settings: Settings, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = properties
            .into_iter()
            .fold(MapEnvironment::over_process(), |env, (k, v)| {
                env.with_var(k, v)
            });
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(env),
            Arc::new(XmlDocumentParser),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        env: Arc<dyn Environment>,
        parser: Arc<dyn DocumentParser>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            env,
            parser,
        }
    }

    /// Build a configuration service from the container's settings.
    pub fn configuration_service(&self) -> ApplicationResult<ConfigurationService> {
        let options = LoadOptions::from_settings(&self.settings)?;
        Ok(ConfigurationService::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.parser),
            Arc::clone(&self.env),
            options,
        ))
    }
}
