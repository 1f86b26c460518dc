//! SDK errors

use thiserror::Error;

/// Errors raised while configuring the SDK or bootstrapping logging
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {format} configuration: {message}")]
    Parse { format: &'static str, message: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Logging error: {0}")]
    Logging(String),
}

impl SdkError {
    pub(crate) fn parse(format: &'static str, error: impl std::fmt::Display) -> Self {
        SdkError::Parse {
            format,
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;
