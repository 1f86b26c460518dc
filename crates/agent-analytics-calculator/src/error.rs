//! Calculator errors

use agent_analytics_span::FailureKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("Unable to calculate {0}")]
    Unable(String),

    #[error("Invalid expression {expression}: {reason}")]
    Parse { expression: String, reason: String },

    #[error("Division by zero is not allowed")]
    DivisionByZero,

    #[error("Result {result} of {expression} failed validation")]
    InvalidResult { expression: String, result: f64 },

    #[error("Calculation server error: {0}")]
    Server(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalcError {
    pub(crate) fn parse(expression: &str, reason: impl Into<String>) -> Self {
        CalcError::Parse {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

impl FailureKind for CalcError {
    fn failure_kind(&self) -> &'static str {
        match self {
            CalcError::Unable(_) => "unable",
            CalcError::Parse { .. } => "parse",
            CalcError::DivisionByZero => "division_by_zero",
            CalcError::InvalidResult { .. } => "invalid_result",
            CalcError::Server(_) => "server",
            CalcError::Transport(_) => "transport",
            CalcError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
