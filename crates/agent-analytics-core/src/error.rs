//! Error types for entity construction and validation

use thiserror::Error;

/// Errors raised when an entity is malformed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A required field is absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field holds a value outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// Two fields contradict each other (e.g. an end before a start)
    #[error("Inconsistent fields {first} and {second}: {reason}")]
    Inconsistent {
        first: &'static str,
        second: &'static str,
        reason: String,
    },

    /// An enumerated label could not be parsed
    #[error("Unknown {kind} label: {label}")]
    UnknownLabel {
        kind: &'static str,
        label: String,
    },
}

impl ModelError {
    /// Create an invalid value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ModelError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Create an inconsistency error
    pub fn inconsistent(first: &'static str, second: &'static str, reason: impl Into<String>) -> Self {
        ModelError::Inconsistent {
            first,
            second,
            reason: reason.into(),
        }
    }

    /// Create an unknown label error
    pub fn unknown_label(kind: &'static str, label: impl Into<String>) -> Self {
        ModelError::UnknownLabel {
            kind,
            label: label.into(),
        }
    }
}

/// Result type alias for model operations
pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ModelError::MissingField("id").to_string(),
            "Missing required field: id"
        );
        assert_eq!(
            ModelError::invalid("confidence", "must be within [0, 1]").to_string(),
            "Invalid value for confidence: must be within [0, 1]"
        );
        assert_eq!(
            ModelError::unknown_label("issue level", "FATAL").to_string(),
            "Unknown issue level label: FATAL"
        );
    }
}
