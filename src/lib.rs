//! rsconf: hierarchical configuration engine.
//!
//! Documents are parsed into trees, merged in order under a synthetic `root`,
//! and queried by slash-separated paths. Leaf values may reference other
//! paths (`%db/host%`) or environment variables (`%env.HOME%`), expanded
//! recursively at query time.
//!
//! ```ignore
//! let container = ServiceContainer::new(Settings::load(None)?);
//! let mut service = container.configuration_service()?;
//! service.load(&ConfigSources::new(["defaults.xml", "local.xml"]))?;
//! let url = service.value("config/db/url")?;
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::{ConfigListener, ConfigurationService, LoadOptions, LoadState};
pub use application::{ApplicationError, ApplicationResult, ConfigSources, Configuration};
pub use config::Settings;
pub use domain::{DomainError, MergeMode};
pub use infrastructure::di::ServiceContainer;
