//! Calculator over a fixed table of expressions

use agent_analytics_span::ExecutionContext;
use std::collections::HashMap;

use crate::calculator::{results_match, unable, Calculator};
use crate::error::Result;

/// Answers only the expressions it was given
#[derive(Debug, Clone, Default)]
pub struct PredefinedCalculator {
    results: HashMap<String, f64>,
}

impl PredefinedCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expression and its result (builder pattern)
    pub fn with(mut self, expression: impl Into<String>, result: f64) -> Self {
        self.results.insert(expression.into(), result);
        self
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl From<HashMap<String, f64>> for PredefinedCalculator {
    fn from(results: HashMap<String, f64>) -> Self {
        Self { results }
    }
}

impl Calculator for PredefinedCalculator {
    fn name(&self) -> &str {
        "predefined"
    }

    fn calculate_expression(&self, _ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        match self.results.get(expression) {
            Some(result) => {
                tracing::info!(expression, result, "predefined result");
                Ok(*result)
            }
            None => {
                tracing::warn!(expression, "expression not predefined");
                Err(unable(self.name(), expression))
            }
        }
    }

    fn is_valid_expression(&self, _ctx: &ExecutionContext, expression: &str) -> bool {
        self.results.contains_key(expression)
    }

    fn is_valid_result(&self, _ctx: &ExecutionContext, expression: &str, result: f64) -> bool {
        self.results
            .get(expression)
            .is_some_and(|expected| results_match(*expected, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_analytics_span::Tracer;

    #[test]
    fn test_predefined_lookup() {
        let ctx = ExecutionContext::new(Tracer::in_memory("test").0);
        let calculator = PredefinedCalculator::new().with("2+2", 5.0);

        assert_eq!(calculator.calculate_expression(&ctx, "2+2").unwrap(), 5.0);
        assert!(calculator.calculate_expression(&ctx, "3+3").is_err());
        assert!(calculator.is_valid_expression(&ctx, "2+2"));
        assert!(calculator.is_valid_result(&ctx, "2+2", 5.0));
        assert!(!calculator.is_valid_result(&ctx, "2+2", 4.0));
        assert!(!calculator.is_valid_result(&ctx, "1+1", 2.0));
    }
}
