//! Delegation chain of calculators
//!
//! Calculators are tried in the order they were added. The first one to
//! return a result wins; failures are logged and the next one is tried.

use agent_analytics_span::ExecutionContext;
use std::sync::Arc;

use crate::calculator::{unable, Calculator};
use crate::error::Result;

#[derive(Default, Clone)]
pub struct DelegatingCalculator {
    calculators: Vec<Arc<dyn Calculator>>,
}

impl std::fmt::Debug for DelegatingCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatingCalculator")
            .field("calculators", &self.calculator_names())
            .finish()
    }
}

impl DelegatingCalculator {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a calculator to the chain (builder pattern)
    ///
    /// Calculators added first are tried first.
    pub fn with_calculator<C: Calculator + 'static>(mut self, calculator: C) -> Self {
        self.calculators.push(Arc::new(calculator));
        self
    }

    /// Add a pre-wrapped calculator
    pub fn add_arc_calculator(&mut self, calculator: Arc<dyn Calculator>) {
        self.calculators.push(calculator);
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Calculator names in priority order
    pub fn calculator_names(&self) -> Vec<&str> {
        self.calculators.iter().map(|c| c.name()).collect()
    }
}

impl Calculator for DelegatingCalculator {
    fn name(&self) -> &str {
        "delegating"
    }

    fn calculate_expression(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        for (index, calculator) in self.calculators.iter().enumerate() {
            match calculator.calculate_expression(ctx, expression) {
                Ok(result) => {
                    tracing::info!(
                        expression,
                        calculator = calculator.name(),
                        index,
                        "calculated by delegate"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        expression,
                        calculator = calculator.name(),
                        index,
                        error = %e,
                        "delegate failed"
                    );
                }
            }
        }
        Err(unable(self.name(), expression))
    }

    fn is_valid_expression(&self, ctx: &ExecutionContext, expression: &str) -> bool {
        self.calculators
            .iter()
            .any(|c| c.is_valid_expression(ctx, expression))
    }

    fn is_valid_result(&self, ctx: &ExecutionContext, expression: &str, result: f64) -> bool {
        self.calculators
            .iter()
            .any(|c| c.is_valid_result(ctx, expression, result))
    }
}
