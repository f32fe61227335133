//! Logger Module
//!
//! Installs a `tracing-subscriber` registry driven by the resolved
//! [`LoggingConfig`](crate::config::LoggingConfig):
//! - `EnvFilter` built from the configured level directive
//! - JSON or human-readable text output on stderr

pub mod config;
pub mod error;

// Re-export main types
pub use config::{LogFormat, LoggerConfig};
pub use error::LoggerError;

use std::io::IsTerminal;
use tracing::Subscriber;
use tracing_subscriber::{Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Build a subscriber for the given configuration without installing it
///
/// Usable as a scoped default through `tracing::subscriber::with_default`.
pub fn build_subscriber(
    config: &LoggerConfig,
) -> Result<impl Subscriber + Send + Sync + 'static, LoggerError> {
    let filter = config.filter()?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .with_ansi(false)
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => {
            let use_ansi = config.colored && std::io::stderr().is_terminal();

            fmt::layer()
                .with_ansi(use_ansi)
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .boxed()
        }
    };

    Ok(tracing_subscriber::registry().with(layer).with(filter))
}

/// Initialize the global logger with the given configuration
///
/// Fails if the level directive is invalid or a global subscriber is
/// already installed.
pub fn init_logger(config: &LoggerConfig) -> Result<(), LoggerError> {
    build_subscriber(config)?
        .try_init()
        .map_err(|e| LoggerError::init(e.to_string()))
}
