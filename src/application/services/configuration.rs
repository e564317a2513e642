//! Configuration facade service
//!
//! Loads ordered documents into one merged tree, keeps the active instance,
//! and notifies listeners whenever a new instance becomes active.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::configuration::Configuration;
use crate::application::error_ext::LoadResultExt;
use crate::application::sources::ConfigSources;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{merge_trees, ConfigTree, Expander, MergeMode, NodeRef, TreeBuilder};
use crate::infrastructure::traits::{DocumentParser, Environment, FileSystem};

/// Lifecycle of the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    /// The last load failed and no earlier instance exists.
    Failed,
}

/// Engine options applied to every load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub expander: Expander,
    pub merge_mode: MergeMode,
    /// Expand `env.` references while building each document.
    pub expand_env_on_load: bool,
}

impl LoadOptions {
    pub fn from_settings(settings: &Settings) -> ApplicationResult<Self> {
        Ok(Self {
            expander: Expander::new(
                settings.delimiter_char()?,
                settings.env_prefix.clone(),
                settings.max_depth,
            ),
            merge_mode: settings.merge_mode,
            expand_env_on_load: settings.expand_env_on_load,
        })
    }
}

/// Observer notified after a configuration instance becomes active.
pub trait ConfigListener: Send + Sync {
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    fn on_config_loaded(&self, config: &Configuration) -> Result<(), String>;
}

/// Listener backed by a closure.
pub struct FnListener<F> {
    name: String,
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(&Configuration) -> Result<(), String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> ConfigListener for FnListener<F>
where
    F: Fn(&Configuration) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn on_config_loaded(&self, config: &Configuration) -> Result<(), String> {
        (self.callback)(config)
    }
}

/// Service owning the active configuration.
///
/// A load builds a complete new instance before swapping it in, so a failed
/// load leaves the active instance untouched. Listeners belong to the
/// service and survive every reload.
pub struct ConfigurationService {
    fs: Arc<dyn FileSystem>,
    parser: Arc<dyn DocumentParser>,
    env: Arc<dyn Environment>,
    options: LoadOptions,
    state: LoadState,
    active: Option<Arc<Configuration>>,
    last_sources: Option<ConfigSources>,
    listeners: Vec<Arc<dyn ConfigListener>>,
}

impl ConfigurationService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        parser: Arc<dyn DocumentParser>,
        env: Arc<dyn Environment>,
        options: LoadOptions,
    ) -> Self {
        Self {
            fs,
            parser,
            env,
            options,
            state: LoadState::Uninitialized,
            active: None,
            last_sources: None,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ConfigListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Load `sources` and make the result the active configuration.
    ///
    /// Listeners run after the swap; a listener failure is returned but the
    /// new instance stays active.
    #[instrument(level = "debug", skip(self, sources), fields(documents = sources.len()))]
    pub fn load(&mut self, sources: &ConfigSources) -> ApplicationResult<Arc<Configuration>> {
        self.state = LoadState::Loading;

        let config = match self.build_configuration(sources) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                warn!("load failed: {}", e);
                self.state = if self.active.is_some() {
                    LoadState::Ready
                } else {
                    LoadState::Failed
                };
                return Err(e);
            }
        };

        self.active = Some(Arc::clone(&config));
        self.last_sources = Some(sources.clone());
        self.state = LoadState::Ready;
        info!("configuration loaded from {} documents", sources.len());

        self.notify_listeners(&config)?;
        Ok(config)
    }

    /// Repeat the last load, picking up changed documents.
    pub fn reload(&mut self) -> ApplicationResult<Arc<Configuration>> {
        let sources = self
            .last_sources
            .clone()
            .ok_or(ApplicationError::NotInitialized)?;
        self.load(&sources)
    }

    fn notify_listeners(&self, config: &Configuration) -> ApplicationResult<()> {
        for listener in &self.listeners {
            debug!("notify listener {}", listener.name());
            listener
                .on_config_loaded(config)
                .map_err(|message| ApplicationError::Listener {
                    listener: listener.name(),
                    message,
                })?;
        }
        Ok(())
    }

    fn build_configuration(&self, sources: &ConfigSources) -> ApplicationResult<Configuration> {
        let mut trees = Vec::with_capacity(sources.len());
        for (file, schema) in sources.iter() {
            trees.push(self.build_document(file, schema)?);
        }

        let tree = merge_trees(&trees, self.options.merge_mode);
        Ok(Configuration::new(
            tree,
            self.options.expander.clone(),
            Arc::clone(&self.env),
        )
        .with_sources(sources.files().to_vec()))
    }

    fn build_document(&self, file: &Path, schema: Option<&Path>) -> ApplicationResult<ConfigTree> {
        debug!("build_document: {}", file.display());
        if !self.fs.is_file(file) {
            return Err(ApplicationError::load(
                file,
                std::io::Error::new(std::io::ErrorKind::NotFound, "document not found"),
            ));
        }
        let content = self.fs.read_to_string(file).with_path_context(file)?;
        let document = self.parser.parse(&content).with_path_context(file)?;

        if let Some(schema) = schema {
            let schema_content = self.fs.read_to_string(schema).with_path_context(schema)?;
            self.parser
                .validate(&document, &schema_content)
                .with_path_context(file)?;
        }

        let env = Arc::clone(&self.env);
        let builder = if self.options.expand_env_on_load {
            TreeBuilder::new()
                .with_env_expansion(self.options.expander.clone(), move |name| env.var(name))
        } else {
            TreeBuilder::new()
        };
        builder.build(&document).with_path_context(file)
    }

    /// The active configuration.
    pub fn current(&self) -> ApplicationResult<Arc<Configuration>> {
        self.active.clone().ok_or(ApplicationError::NotInitialized)
    }

    fn active(&self) -> ApplicationResult<&Configuration> {
        self.active.as_deref().ok_or(ApplicationError::NotInitialized)
    }

    /// Unexpanded value of the single node at `path`.
    pub fn raw_value(&self, path: &str) -> ApplicationResult<String> {
        Ok(self.active()?.raw_value(path)?)
    }

    /// Fully expanded value of the single node at `path`.
    pub fn value(&self, path: &str) -> ApplicationResult<String> {
        Ok(self.active()?.value(path)?)
    }

    /// Expanded value with `{n}` placeholders filled from `args`.
    pub fn value_with_args<S: AsRef<str>>(
        &self,
        path: &str,
        args: &[S],
    ) -> ApplicationResult<String> {
        Ok(self.active()?.value_with_args(path, args)?)
    }

    /// Expanded value, `None` when the path or a reference cannot be resolved.
    pub fn try_value(&self, path: &str) -> ApplicationResult<Option<String>> {
        Ok(self.active()?.try_value(path)?)
    }

    /// Every node at `path`.
    pub fn nodes(&self, path: &str) -> ApplicationResult<Vec<NodeRef<'_>>> {
        Ok(self.active()?.nodes(path)?)
    }
}
