//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; binaries and test harnesses
//! call [`init_tracing`] once to install a subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use tracing_subscriber::util::TryInitError;

use crate::config::{LogFormat, LoggingConfig};

/// Installs a global subscriber writing to stderr.
///
/// `RUST_LOG` overrides `config.level` when set.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry();

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_filter(env_filter);
            registry.with(fmt_layer).try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(env_filter);
            registry.with(fmt_layer).try_init()?;
        }
    }

    tracing::info!(level = %config.level, format = ?config.format, "tracing initialized");
    Ok(())
}
