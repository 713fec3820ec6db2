//! Configuration Module
//!
//! Read-only application settings loaded from a JSON file at startup.
//! Session state is never written back.

pub mod storage;
pub mod types;

pub use storage::{config_dir, config_file, ConfigStorage, StorageError};
pub use types::{ApiSettings, AppConfig, AuthSettings, TelemetrySettings, CONFIG_VERSION};
