//! Application layer: the configuration facade and its query surface
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod configuration;
pub mod error;
pub mod error_ext;
pub mod services;
pub mod sources;

pub use configuration::Configuration;
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::LoadResultExt;
pub use sources::{ConfigSources, NO_SCHEMA};
