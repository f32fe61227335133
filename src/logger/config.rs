//! Runtime logger configuration, built from the resolved `LoggingConfig`

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::logger::error::LoggerError;

/// Log format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable lines
    Text,
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            _ => Err(LoggerError::config(format!(
                "Invalid log format '{}'. Valid formats are: json, text",
                s
            ))),
        }
    }
}

impl LogFormat {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        }
    }
}

/// Validated logger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// `EnvFilter` directive, e.g. "info" or "strata=debug,warn"
    pub level: String,
    pub format: LogFormat,
    /// Colored output, only honoured for text format on a terminal
    pub colored: bool,
}

impl LoggerConfig {
    /// Create a new logger configuration with validation
    pub fn new(level: impl Into<String>, format: LogFormat) -> Result<Self, LoggerError> {
        let config = Self {
            level: level.into(),
            format,
            colored: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LoggerError> {
        self.filter().map(|_| ())
    }

    /// Build the event filter for the configured level
    pub fn filter(&self) -> Result<EnvFilter, LoggerError> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            LoggerError::config(format!("Invalid log level '{}': {}", self.level, e))
        })
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            colored: true,
        }
    }
}

impl TryFrom<&LoggingConfig> for LoggerConfig {
    type Error = LoggerError;

    /// Empty fields fall back to the logger defaults.
    fn try_from(settings: &LoggingConfig) -> Result<Self, Self::Error> {
        let defaults = LoggerConfig::default();
        let level = if settings.level.is_empty() {
            defaults.level
        } else {
            settings.level.clone()
        };
        let format = if settings.format.is_empty() {
            defaults.format
        } else {
            settings.format.parse()?
        };

        LoggerConfig::new(level, format)
    }
}
