//! Strata Library
//!
//! Layered configuration resolver: a YAML or JSON file, environment variable
//! overrides derived from field names, `${VAR}` interpolation in every
//! string, and an optional defaults hook, applied in that order to one
//! caller-owned configuration value.
//!
//! ```ignore
//! use serde::{Deserialize, Serialize};
//! use strata::Configurable;
//! use strata::config::ConfigLoader;
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Configurable)]
//! struct Settings {
//!     port: u16,
//!     #[config(env = "DSN")]
//!     database_url: String,
//! }
//!
//! let mut settings = Settings::default();
//! // Reads APP_PORT and APP_DSN on top of config.yaml
//! ConfigLoader::new("config.yaml", "APP_").load(&mut settings)?;
//! ```

// Lets `#[derive(Configurable)]` refer to `::strata` inside this crate too.
extern crate self as strata;

pub mod cli;
pub mod config;
pub mod logger;

pub use config::{ConfigError, ConfigLoader};
pub use macros::Configurable;
