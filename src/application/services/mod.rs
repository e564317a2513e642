//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Environment, DocumentParser)
//! but are themselves concrete structs, not traits.

mod configuration;

pub use configuration::{
    ConfigListener, ConfigurationService, FnListener, LoadOptions, LoadState,
};
