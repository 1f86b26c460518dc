//! Error types for span context propagation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpanError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid {header} header: {value}")]
    InvalidHeader { header: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, SpanError>;
