//! Configuration for the Syllabus catalog service.
//!
//! Values come from three layers, highest priority first: process
//! environment (after `.env` is loaded), an optional `syllabus.toml`, then
//! built-in defaults.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    compose_config, redact_database_url,
};
pub use models::{
    CacheConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig,
    ServerConfig,
    sources::{EnvConfig, FileConfig},
};
pub use validation::{ConfigWarning, ConfigWarnings};
