//! subfox-config
//!
//! Persistent settings: remote backend, sandbox identity, cache location.
//! Owns the Config data structure plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;
pub mod paths;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{Config, RemoteConfig};
pub use paths::{app_data_dir, HOME_ENV};
