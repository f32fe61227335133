//! Configuration file formats, selected by file extension

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::config::error::{ConfigError, DecodeError};

/// Decoder family for a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl FileFormat {
    /// Select the decoder from the path's extension (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] naming the rejected extension,
    /// with its leading dot, or an empty string when the path has none.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(FileFormat::Yaml),
            "json" => Ok(FileFormat::Json),
            "" => Err(ConfigError::UnsupportedFormat(String::new())),
            other => Err(ConfigError::UnsupportedFormat(format!(".{}", other))),
        }
    }

    /// Decode raw file content into `T`
    ///
    /// Keys unknown to `T` are ignored unless `T` itself denies them.
    pub fn decode<T: DeserializeOwned>(self, data: &[u8]) -> Result<T, DecodeError> {
        match self {
            FileFormat::Yaml => Ok(serde_yaml::from_slice(data)?),
            FileFormat::Json => Ok(serde_json::from_slice(data)?),
        }
    }

    /// Convert the format to a string slice
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Yaml => "YAML",
            FileFormat::Json => "JSON",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
