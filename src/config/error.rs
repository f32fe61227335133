//! Configuration error types

use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use thiserror::Error;

use crate::config::format::FileFormat;

/// Boxed decoder error carried by [`ConfigError::Parse`].
pub type DecodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration error types
///
/// Every variant is terminal for a load: nothing is retried, and the target
/// must be treated as partially mutated once any of these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The file content is malformed for its declared format
    #[error("Failed to parse {format} configuration file {}: {source}", path.display())]
    Parse {
        /// Path that was parsed
        path: PathBuf,
        /// Decoder selected from the file extension
        format: FileFormat,
        /// Decoder failure
        #[source]
        source: DecodeError,
    },

    /// The file extension does not select a known decoder
    #[error("Unsupported configuration file format: '{0}' (supported: .yaml, .yml, .json)")]
    UnsupportedFormat(String),

    /// An environment value could not be coerced into its field
    #[error("Failed to set field {field} from environment variable {key}={value:?}: {source}")]
    FieldBind {
        /// Dotted path of the target field
        field: String,
        /// Environment variable that supplied the value
        key: String,
        /// Raw environment value
        value: String,
        /// Coercion failure
        #[source]
        source: CoercionError,
    },

    /// The target cannot be walked as a record
    #[error("Invalid configuration target: {0}")]
    InvalidTarget(String),
}

impl ConfigError {
    /// Create a new field bind error
    pub fn field_bind<S: Into<String>>(field: S, key: S, value: S, source: CoercionError) -> Self {
        ConfigError::FieldBind {
            field: field.into(),
            key: key.into(),
            value: value.into(),
            source,
        }
    }

    /// Create a new invalid target error
    pub fn invalid_target<S: Into<String>>(message: S) -> Self {
        ConfigError::InvalidTarget(message.into())
    }
}

/// Failure to coerce a raw environment string into a field's scalar kind
#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("invalid integer: {0}")]
    Int(#[from] ParseIntError),

    #[error("invalid float: {0}")]
    Float(#[from] ParseFloatError),

    #[error("invalid boolean '{0}', expected one of 1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False")]
    Bool(String),

    #[error("invalid number '{0}'")]
    Number(String),

    #[error("a {0} field cannot be set from a single environment variable")]
    Unsupported(&'static str),
}
