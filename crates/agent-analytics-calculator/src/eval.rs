//! Arithmetic evaluation.
//!
//! Supports `+ - * /`, unary minus, integer and decimal literals, and
//! grouping with `()`, `[]` or `{}`. Square and curly brackets are
//! normalised to parentheses before parsing.

use agent_analytics_core::MetricCategory;
use agent_analytics_sdk::record_metric;
use agent_analytics_span::ExecutionContext;

use crate::calculator::{results_match, Calculator};
use crate::delegating::DelegatingCalculator;
use crate::error::{CalcError, Result};

/// Replace `[]` and `{}` with parentheses
pub fn normalize_brackets(expression: &str) -> String {
    expression
        .chars()
        .map(|c| match c {
            '[' | '{' => '(',
            ']' | '}' => ')',
            other => other,
        })
        .collect()
}

/// Deepest bracket or unary-sign nesting accepted by [`evaluate`]
pub const MAX_NESTING_DEPTH: usize = 256;

/// Deepest bracket nesting of an expression, any bracket type
pub fn nesting_depth(expression: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for c in expression.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Evaluate an expression
pub fn evaluate(expression: &str) -> Result<f64> {
    let normalized = normalize_brackets(expression);
    let mut parser = Parser {
        source: expression,
        chars: normalized.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(c) = parser.peek() {
        return Err(CalcError::parse(
            expression,
            format!("unexpected '{}' at {}", c, parser.pos),
        ));
    }
    if !value.is_finite() {
        return Err(CalcError::parse(expression, "result is not finite"));
    }
    Ok(value)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> CalcError {
        CalcError::parse(self.source, reason)
    }

    /// Run `parse` one nesting level deeper
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<f64>) -> Result<f64> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' {
                value * rhs
            } else if rhs == 0.0 {
                return Err(CalcError::DivisionByZero);
            } else {
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.nested(Self::factor)?)
            }
            Some('+') => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            Some('(') => {
                self.pos += 1;
                let value = self.nested(Self::expr)?;
                match self.bump() {
                    Some(')') => Ok(value),
                    _ => Err(self.error("unbalanced brackets")),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(self.error(format!("unexpected '{}' at {}", c, self.pos))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse()
            .map_err(|_| self.error(format!("invalid number '{}'", literal)))
    }
}

/// Evaluates directly, delegating to its chain on failure
#[derive(Debug, Clone, Default)]
pub struct EvalCalculator {
    chain: DelegatingCalculator,
}

impl EvalCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator with a delegate chain for expressions it cannot evaluate
    pub fn with_chain(chain: DelegatingCalculator) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &DelegatingCalculator {
        &self.chain
    }
}

impl Calculator for EvalCalculator {
    fn name(&self) -> &str {
        "eval"
    }

    fn calculate_expression(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        match evaluate(expression) {
            Ok(result) => {
                tracing::info!(expression, result, "evaluated");
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(expression, error = %e, "evaluation failed, delegating");
                self.chain.calculate_expression(ctx, expression)
            }
        }
    }

    fn is_valid_expression(&self, ctx: &ExecutionContext, expression: &str) -> bool {
        match evaluate(expression) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(expression, error = %e, "expression rejected, delegating");
                self.chain.is_valid_expression(ctx, expression)
            }
        }
    }

    /// A failed validation is recorded as a `QUALITY` metric on `ctx`.
    fn is_valid_result(&self, ctx: &ExecutionContext, expression: &str, result: f64) -> bool {
        match evaluate(expression) {
            Ok(expected) if results_match(expected, result) => return true,
            Ok(expected) => {
                tracing::warn!(expression, expected, result, "result mismatch");
            }
            Err(e) => {
                tracing::error!(expression, result, error = %e, "unable to validate result");
            }
        }
        let metric = record_metric(
            ctx,
            expression,
            "validation_failure",
            result,
            "result",
            MetricCategory::Quality,
        );
        tracing::debug!(metric_id = %metric.element.id, "validation failure recorded");
        self.chain.is_valid_result(ctx, expression, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_analytics_span::{AttrValue, Tracer};
    use proptest::prelude::*;

    #[test]
    fn test_evaluate_precedence_and_brackets() {
        assert_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_eq!(evaluate("3+[1+2+3/3]*5+6/((2+1)*2-3)").unwrap(), 25.0);
        assert_eq!(evaluate("7*[2+18/3]-9+(4*5-2)").unwrap(), 65.0);
        assert_eq!(evaluate("{1 + 1} * 2").unwrap(), 4.0);
        assert_eq!(evaluate("10-4-3").unwrap(), 3.0);
        assert_eq!(evaluate("8/4/2").unwrap(), 1.0);
    }

    #[test]
    fn test_evaluate_unary_and_decimals() {
        assert_eq!(evaluate("-3+5").unwrap(), 2.0);
        assert_eq!(evaluate("2*-3").unwrap(), -6.0);
        assert_eq!(evaluate("1.5*2").unwrap(), 3.0);
        assert_eq!(evaluate("--2").unwrap(), 2.0);
    }

    #[test]
    fn test_evaluate_errors() {
        assert!(matches!(evaluate("1/0"), Err(CalcError::DivisionByZero)));
        assert!(matches!(evaluate("(1+2"), Err(CalcError::Parse { .. })));
        assert!(matches!(evaluate("1+2)"), Err(CalcError::Parse { .. })));
        assert!(matches!(evaluate("2+x"), Err(CalcError::Parse { .. })));
        assert!(matches!(evaluate(""), Err(CalcError::Parse { .. })));
        assert!(matches!(evaluate("1..2"), Err(CalcError::Parse { .. })));
    }

    #[test]
    fn test_failed_validation_records_quality_metric() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let ctx = ExecutionContext::new(tracer);
        let calculator = EvalCalculator::new();

        assert!(calculator.is_valid_result(&ctx, "2+2", 4.0));
        assert!(exporter.is_empty());

        assert!(!calculator.is_valid_result(&ctx, "2+2", 5.0));
        let spans = exporter.take();
        assert_eq!(spans.len(), 1);
        let event = &spans[0].events[0];
        assert_eq!(event.name, "validation_failure.metric");
        assert_eq!(event.attribute("category"), Some(&AttrValue::from("QUALITY")));
        assert_eq!(event.attribute("affected_element_id"), Some(&AttrValue::from("2+2")));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = evaluate(&deep).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));

        let signs = format!("{}1", "-".repeat(100_000));
        assert!(evaluate(&signs).is_err());

        let limit = format!("{}7{}", "[".repeat(MAX_NESTING_DEPTH), "]".repeat(MAX_NESTING_DEPTH));
        assert_eq!(evaluate(&limit).unwrap(), 7.0);
        assert_eq!(nesting_depth(&limit), MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_eval_falls_back_to_chain() {
        let ctx = ExecutionContext::new(Tracer::in_memory("test").0);
        let chain = DelegatingCalculator::new()
            .with_calculator(crate::predefined::PredefinedCalculator::new().with("two", 2.0));
        let calculator = EvalCalculator::with_chain(chain);

        assert_eq!(calculator.calculate_expression(&ctx, "two").unwrap(), 2.0);
        assert!(calculator.is_valid_expression(&ctx, "two"));
        assert!(calculator.calculate_expression(&ctx, "three").is_err());
    }

    proptest! {
        #[test]
        fn prop_binary_operations_match(a in -1000i64..1000, b in 1i64..1000) {
            let (a, b) = (a as f64, b as f64);
            let cases = [
                (format!("{}+{}", a, b), a + b),
                (format!("{}-{}", a, b), a - b),
                (format!("{}*{}", a, b), a * b),
                (format!("[{}]/{}", a, b), a / b),
            ];
            for (expression, expected) in cases {
                let actual = evaluate(&expression).unwrap();
                prop_assert!(
                    results_match(actual, expected),
                    "{} gave {}, expected {}",
                    expression,
                    actual,
                    expected
                );
            }
        }
    }
}
