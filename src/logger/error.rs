//! Error types for the logger

use thiserror::Error;

/// Errors that can occur while configuring or installing the logger
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to install global subscriber: {message}")]
    Init { message: String },
}

impl LoggerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn init(message: impl Into<String>) -> Self {
        Self::Init { message: message.into() }
    }
}
