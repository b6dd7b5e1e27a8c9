//! Configuration library for the gNXI tester.
//!
//! Settings are layered from built-in defaults, an optional TOML file and
//! environment variables (a `.env` file is read first). Guard rails reject
//! configurations the server cannot run with and collect warnings for the
//! ones it can run with but probably should not.

#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    CatalogConfig, Config, ConfigMetadata, CorsConfig, EngineConfig, RunConfig,
    ServerConfig, StorageConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
