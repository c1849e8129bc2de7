//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Cascade depth must be between 1 and {max}")]
    InvalidCascadeDepth { max: usize },

    #[error("Uid padding must be between 1 and {max}")]
    InvalidUidPadding { max: usize },

    #[error("Scope lock timeout must be positive")]
    InvalidLockTimeout,

    #[error("Invalid log filter: {0}")]
    InvalidLogLevel(String),
}
