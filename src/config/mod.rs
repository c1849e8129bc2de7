//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `MDR_LIFECYCLE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use mdr_lifecycle::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Storage backend: {:?}", config.storage.backend);
//! ```

mod database;
mod error;
mod logging;
mod storage;
mod versioning;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use storage::{StorageBackend, StorageConfig};
pub use versioning::VersioningConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Which adapters back the ports
    #[serde(default)]
    pub storage: StorageConfig,

    /// Database configuration (PostgreSQL connection), required for the
    /// postgres backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Lifecycle engine tuning
    #[serde(default)]
    pub versioning: VersioningConfig,

    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `MDR_LIFECYCLE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `MDR_LIFECYCLE__STORAGE__BACKEND=postgres` -> `storage.backend = postgres`
    /// - `MDR_LIFECYCLE__DATABASE__URL=...` -> `database.url = ...`
    /// - `MDR_LIFECYCLE__VERSIONING__CASCADE_MAX_DEPTH=3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MDR_LIFECYCLE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The database section is only checked when the postgres backend is
    /// selected.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.storage.backend == StorageBackend::Postgres {
            self.database.validate()?;
        }
        self.versioning.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MDR_LIFECYCLE__STORAGE__BACKEND",
        "MDR_LIFECYCLE__DATABASE__URL",
        "MDR_LIFECYCLE__DATABASE__RUN_MIGRATIONS",
        "MDR_LIFECYCLE__VERSIONING__CASCADE_MAX_DEPTH",
        "MDR_LIFECYCLE__VERSIONING__UID_PADDING",
        "MDR_LIFECYCLE__LOGGING__FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_without_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.versioning.cascade_max_depth, 2);
        assert_eq!(config.versioning.uid_padding, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_postgres_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("MDR_LIFECYCLE__STORAGE__BACKEND", "postgres");
        env::set_var("MDR_LIFECYCLE__DATABASE__URL", "postgresql://test@localhost/mdr");
        env::set_var("MDR_LIFECYCLE__DATABASE__RUN_MIGRATIONS", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.database.url, "postgresql://test@localhost/mdr");
        assert!(config.database.run_migrations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_backend_requires_database_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("MDR_LIFECYCLE__STORAGE__BACKEND", "postgres");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("DATABASE_URL"))
        ));
    }

    #[test]
    fn test_versioning_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("MDR_LIFECYCLE__VERSIONING__CASCADE_MAX_DEPTH", "4");
        env::set_var("MDR_LIFECYCLE__VERSIONING__UID_PADDING", "8");
        env::set_var("MDR_LIFECYCLE__LOGGING__FORMAT", "json");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.versioning.cascade_max_depth, 4);
        assert_eq!(config.versioning.uid_padding, 8);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
