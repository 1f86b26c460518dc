//! Envelope wrapping an operation's output with its span tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::{ExecutionSpan, SpanStatus};

/// Errors that carry a stable, machine-readable kind label
pub trait FailureKind: std::error::Error {
    /// Snake-case label, e.g. `division_by_zero`
    fn failure_kind(&self) -> &'static str;
}

/// Why an instrumented operation produced no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub kind: String,
    pub message: String,
    /// Name of the deepest span that ended with an error status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_span: Option<String>,
}

impl EnvelopeError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            failed_span: None,
        }
    }

    pub fn of<E: FailureKind>(error: &E) -> Self {
        Self::new(error.failure_kind(), error.to_string())
    }
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Output of an instrumented operation together with its span tree.
///
/// `success` is derived from the root span: a tree whose root carries an
/// error status is never successful, even when data is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    /// Always present, also on failure.
    pub span_tree: ExecutionSpan,
}

impl<T: Serialize> ExecutionEnvelope<T> {
    pub fn success(data: T, span_tree: ExecutionSpan) -> Self {
        Self {
            success: span_tree.status != SpanStatus::Error,
            data: Some(data),
            error: None,
            span_tree,
        }
    }

    /// Failed outcome; an unset `failed_span` is located in `span_tree`.
    pub fn failure(mut error: EnvelopeError, span_tree: ExecutionSpan) -> Self {
        if error.failed_span.is_none() {
            error.failed_span = deepest_failure(&span_tree).map(|span| span.name.clone());
        }
        Self {
            success: false,
            data: None,
            error: Some(error),
            span_tree,
        }
    }
}

fn deepest_failure(span: &ExecutionSpan) -> Option<&ExecutionSpan> {
    span.children
        .iter()
        .find_map(deepest_failure)
        .or_else(|| (span.status == SpanStatus::Error).then_some(span))
}
