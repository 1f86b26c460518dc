//! Calculator trait

use agent_analytics_span::ExecutionContext;

use crate::error::{CalcError, Result};

/// Relative tolerance for comparing results
pub const RESULT_TOLERANCE: f64 = 1e-9;

/// Evaluates arithmetic expressions, recording on the given context
pub trait Calculator: Send + Sync {
    fn name(&self) -> &str;

    fn calculate_expression(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64>;

    fn is_valid_expression(&self, _ctx: &ExecutionContext, _expression: &str) -> bool {
        false
    }

    fn is_valid_result(&self, _ctx: &ExecutionContext, _expression: &str, _result: f64) -> bool {
        false
    }
}

/// Terminal outcome of a calculator that cannot handle `expression`
pub fn unable(calculator: &str, expression: &str) -> CalcError {
    tracing::error!(calculator, expression, "unable to calculate");
    CalcError::Unable(expression.to_string())
}

/// Compare two results with [`RESULT_TOLERANCE`]
pub fn results_match(expected: f64, actual: f64) -> bool {
    if expected == actual {
        return true;
    }
    let scale = expected.abs().max(actual.abs()).max(1.0);
    (expected - actual).abs() <= RESULT_TOLERANCE * scale
}
