//! Configuration management module for strata
//!
//! This module provides layered configuration loading with support for:
//! - YAML and JSON configuration files
//! - Environment variable overrides derived from field names
//! - `${VAR}` / `${VAR:-default}` / `$VAR` interpolation in every string
//! - A defaults hook run once after everything else
//!
//! # Configuration Priority (lowest to highest)
//! 1. The configuration file, if it exists
//! 2. `PREFIX` + `FIELD_KEY` environment variables (`PREFIX` + `PARENT_KEY_CHILD_KEY` when nested)
//! 3. Interpolation of the strings produced by 1 and 2
//! 4. `Defaults::set_defaults`, for values still unset after all of the above

pub mod env;
pub mod error;
pub mod format;
pub mod interpolate;
pub mod loader;
pub mod schema;
pub mod settings;

// Re-export public types
pub use env::{EnvSource, ProcessEnv, describe_keys};
pub use error::{CoercionError, ConfigError};
pub use format::FileFormat;
pub use interpolate::interpolate_str;
pub use loader::{ConfigLoader, load_from_env, load_from_file, load_with_defaults};
pub use schema::{Defaults, EnvKey, Field, Node, NodeMut, Record, Scalar, ScalarKind};
pub use settings::{
    BaseConfig,
    LoggingConfig,
    MetricsConfig,
    ObservabilityConfig,
    ServerConfig,
    TracingConfig,
};
