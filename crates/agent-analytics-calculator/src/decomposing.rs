//! Decompose, plan, execute and validate.
//!
//! An expression is split into named operations `E0, E1, ...`: top-level
//! bracket groups first, then `*` and `/` left to right, then `+` and `-`.
//! Each operation refers to literals or to earlier operations, so the list
//! is already in dependency order and the last operation yields the
//! result. The plan is captured as a workflow of nodes and edges.

use agent_analytics_core::{Record, Workflow, WorkflowEdge, WorkflowEdgeCategory, WorkflowNode};
use agent_analytics_sdk::{
    capture_workflow, capture_workflow_edge, capture_workflow_node, record_exception,
};
use agent_analytics_span::{ExecutionContext, SpanStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::calculator::Calculator;
use crate::error::{CalcError, Result};
use crate::eval::{nesting_depth, EvalCalculator};

/// Kind of a decomposed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Parentheses,
    SquareBrackets,
    CurlyBrackets,
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Parentheses => "parentheses",
            OperationKind::SquareBrackets => "square_brackets",
            OperationKind::CurlyBrackets => "curly_brackets",
            OperationKind::Addition => "addition",
            OperationKind::Subtraction => "subtraction",
            OperationKind::Multiplication => "multiplication",
            OperationKind::Division => "division",
        }
    }

    /// Bracket group whose inner expression is calculated recursively
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            OperationKind::Parentheses | OperationKind::SquareBrackets | OperationKind::CurlyBrackets
        )
    }

    fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Addition => "+",
            OperationKind::Subtraction => "-",
            OperationKind::Multiplication => "*",
            OperationKind::Division => "/",
            _ => "",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a decomposed expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    /// Inner expression for groups, first operand otherwise
    pub op1: String,
    /// Second operand; empty for groups
    pub op2: String,
}

impl Operation {
    /// Names of the operations this one consumes
    pub fn dependencies(&self) -> Vec<&str> {
        if self.kind.is_group() {
            return Vec::new();
        }
        [self.op1.as_str(), self.op2.as_str()]
            .into_iter()
            .filter(|op| is_variable(op))
            .collect()
    }
}

fn is_variable(operand: &str) -> bool {
    operand.starts_with('E')
}

/// Which bracket types to extract
#[derive(Debug, Clone, Copy)]
pub struct BracketSelection {
    pub parentheses: bool,
    pub square: bool,
    pub curly: bool,
}

impl BracketSelection {
    pub const ALL: Self = Self {
        parentheses: true,
        square: true,
        curly: true,
    };

    fn kind(&self, open: char) -> Option<OperationKind> {
        match open {
            '(' if self.parentheses => Some(OperationKind::Parentheses),
            '[' if self.square => Some(OperationKind::SquareBrackets),
            '{' if self.curly => Some(OperationKind::CurlyBrackets),
            _ => None,
        }
    }
}

fn closing(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Replace each selected top-level bracket group with a variable.
///
/// A group is top-level when no bracket of any type encloses it.
/// Mismatched closing brackets are ignored. Returns the rewritten
/// expression and one group operation per extracted bracket pair.
pub fn extract_upper_level_brackets(
    expression: &str,
    selection: BracketSelection,
) -> (String, Vec<Operation>) {
    let chars: Vec<char> = expression.chars().collect();
    let mut stack: Vec<(char, usize, bool)> = Vec::new();
    let mut groups: Vec<(usize, usize, OperationKind)> = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if closing(c).is_some() {
            let top_level = stack.is_empty() && selection.kind(c).is_some();
            stack.push((c, i, top_level));
        } else if matches!(c, ')' | ']' | '}') {
            let Some(&(open, start, top_level)) = stack.last() else {
                continue;
            };
            if closing(open) != Some(c) {
                continue;
            }
            stack.pop();
            if top_level && stack.is_empty() {
                if let Some(kind) = selection.kind(open) {
                    groups.push((start, i, kind));
                }
            }
        }
    }

    let mut rewritten = String::new();
    let mut operations = Vec::new();
    let mut cursor = 0;
    for (index, (start, end, kind)) in groups.into_iter().enumerate() {
        let name = format!("E{}", index);
        rewritten.extend(&chars[cursor..start]);
        rewritten.push_str(&name);
        operations.push(Operation {
            name,
            kind,
            op1: chars[start + 1..end].iter().collect(),
            op2: String::new(),
        });
        cursor = end + 1;
    }
    rewritten.extend(&chars[cursor..]);
    (rewritten, operations)
}

/// Append binary operations for a bracket-free expression.
///
/// Variable numbering continues after `operations`.
pub fn extract_arithmetic_operations(
    mut operations: Vec<Operation>,
    expression: &str,
) -> Result<Vec<Operation>> {
    let mut tokens = tokenize(expression);
    for (ops, pass) in [(['*', '/'], "multiplicative"), (['+', '-'], "additive")] {
        let mut i = 0;
        while i < tokens.len() {
            let op = match tokens[i].as_str() {
                "*" | "/" | "+" | "-" => tokens[i].chars().next().filter(|c| ops.contains(c)),
                _ => None,
            };
            let Some(op) = op else {
                i += 1;
                continue;
            };
            if i == 0 || i + 1 >= tokens.len() || tokens[i - 1].is_empty() || tokens[i + 1].is_empty() {
                return Err(CalcError::parse(
                    expression,
                    format!("missing operand for '{}' in {} pass", op, pass),
                ));
            }
            let kind = match op {
                '*' => OperationKind::Multiplication,
                '/' => OperationKind::Division,
                '+' => OperationKind::Addition,
                _ => OperationKind::Subtraction,
            };
            let name = format!("E{}", operations.len());
            operations.push(Operation {
                name: name.clone(),
                kind,
                op1: tokens[i - 1].clone(),
                op2: tokens[i + 1].clone(),
            });
            tokens[i - 1] = name;
            tokens.drain(i..i + 2);
        }
    }
    Ok(operations)
}

fn tokenize(expression: &str) -> Vec<String> {
    let mut tokens = vec![String::new()];
    for c in expression.chars().filter(|c| !c.is_whitespace()) {
        if matches!(c, '+' | '-' | '*' | '/') {
            tokens.push(c.to_string());
            tokens.push(String::new());
        } else if let Some(last) = tokens.last_mut() {
            last.push(c);
        }
    }
    tokens
}

/// Split an expression into operations
pub fn decompose(expression: &str) -> Result<Vec<Operation>> {
    let (rewritten, operations) = extract_upper_level_brackets(expression, BracketSelection::ALL);
    let operations = extract_arithmetic_operations(operations, &rewritten)?;
    if operations.is_empty() {
        return Err(CalcError::parse(expression, "nothing to decompose"));
    }
    Ok(operations)
}

/// Operations with the variable holding the final result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
    pub result_variable: String,
}

impl Plan {
    pub fn new(operations: Vec<Operation>) -> Result<Self> {
        let result_variable = operations
            .last()
            .map(|op| op.name.clone())
            .ok_or_else(|| CalcError::Unable("empty plan".to_string()))?;
        Ok(Self {
            operations,
            result_variable,
        })
    }

    /// Workflow, nodes and edges describing this plan
    pub fn to_workflow(&self, workflow_id: &str, expression: &str) -> (Workflow, Vec<WorkflowNode>, Vec<WorkflowEdge>) {
        let workflow = Workflow::new(workflow_id)
            .with_name(expression)
            .with_attribute("result_variable", self.result_variable.as_str());
        let node_id = |name: &str| format!("{}.calc_{}", workflow_id, name);

        let nodes = self
            .operations
            .iter()
            .map(|op| {
                let mut node = WorkflowNode::new(node_id(op.name.as_str()), op.kind.as_str())
                    .with_name(format!("calc_{}", op.name))
                    .with_owner(workflow_id)
                    .with_attribute("op1", op.op1.as_str());
                if !op.op2.is_empty() {
                    node = node.with_attribute("op2", op.op2.as_str());
                }
                node
            })
            .collect();

        let edges = self
            .operations
            .iter()
            .map(|op| {
                let deps = op.dependencies();
                let category = match deps.len() {
                    0 => WorkflowEdgeCategory::Enter,
                    1 => WorkflowEdgeCategory::Sequential,
                    _ => WorkflowEdgeCategory::Join,
                };
                WorkflowEdge::new(format!("{}.edge_{}", workflow_id, op.name))
                    .between(deps.iter().map(|&d| node_id(d)), [node_id(op.name.as_str())])
                    .with_category(category)
                    .with_owner(workflow_id)
            })
            .collect();

        (workflow, nodes, edges)
    }
}

/// Calculator that decomposes, plans, executes and validates, retrying a
/// bounded number of times before falling back to its eval calculator.
#[derive(Clone)]
pub struct DecomposingCalculator {
    max_iterations: usize,
    addition: Arc<dyn Calculator>,
    subtraction: Arc<dyn Calculator>,
    multiplication: Arc<dyn Calculator>,
    division: Arc<dyn Calculator>,
    parentheses: Option<Arc<dyn Calculator>>,
    square_brackets: Option<Arc<dyn Calculator>>,
    curly_brackets: Option<Arc<dyn Calculator>>,
    fallback: EvalCalculator,
}

impl fmt::Debug for DecomposingCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecomposingCalculator")
            .field("max_iterations", &self.max_iterations)
            .field("square_brackets", &self.square_brackets.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl Default for DecomposingCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl DecomposingCalculator {
    pub const DEFAULT_MAX_ITERATIONS: usize = 3;
    /// Deepest bracket nesting that is decomposed; deeper expressions are
    /// evaluated directly by the fallback.
    pub const MAX_GROUP_DEPTH: usize = 16;

    /// Eval calculators for every operator, recursion for every group
    pub fn new() -> Self {
        let eval: Arc<dyn Calculator> = Arc::new(EvalCalculator::new());
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            addition: eval.clone(),
            subtraction: eval.clone(),
            multiplication: eval.clone(),
            division: eval,
            parentheses: None,
            square_brackets: None,
            curly_brackets: None,
            fallback: EvalCalculator::new(),
        }
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations.max(1);
        self
    }

    /// Calculator for one binary operator
    pub fn with_operator(mut self, kind: OperationKind, calculator: Arc<dyn Calculator>) -> Self {
        match kind {
            OperationKind::Addition => self.addition = calculator,
            OperationKind::Subtraction => self.subtraction = calculator,
            OperationKind::Multiplication => self.multiplication = calculator,
            OperationKind::Division => self.division = calculator,
            OperationKind::Parentheses => self.parentheses = Some(calculator),
            OperationKind::SquareBrackets => self.square_brackets = Some(calculator),
            OperationKind::CurlyBrackets => self.curly_brackets = Some(calculator),
        }
        self
    }

    /// Eval calculator used for validation and as the final fallback
    pub fn with_fallback(mut self, fallback: EvalCalculator) -> Self {
        self.fallback = fallback;
        self
    }

    fn plan(&self, ctx: &ExecutionContext, expression: &str) -> Result<Plan> {
        let operations = {
            let scope = ctx.child("decompose");
            let operations = decompose(expression)?;
            scope.span().set_attribute("operations", operations.len() as i64);
            operations
        };

        let scope = ctx.child("plan");
        let plan = Plan::new(operations)?;
        let workflow_id = format!("workflow-{}", uuid::Uuid::new_v4());
        let (workflow, nodes, edges) = plan.to_workflow(&workflow_id, expression);
        capture_workflow(&scope, &workflow);
        for node in &nodes {
            capture_workflow_node(&scope, node);
        }
        for edge in &edges {
            capture_workflow_edge(&scope, edge);
        }
        tracing::debug!(expression, result_variable = %plan.result_variable, "plan ready");
        Ok(plan)
    }

    fn execute(&self, ctx: &ExecutionContext, plan: &Plan) -> Result<f64> {
        let scope = ctx.child("execute");
        let mut values: HashMap<&str, f64> = HashMap::new();
        for op in &plan.operations {
            let step = scope.child(format!("calc_{}", op.name));
            step.span().set_attribute("operation", op.kind.as_str());
            let result = self.run_operation(&step, op, &values);
            match result {
                Ok(value) => {
                    step.span().set_attribute("result", value);
                    step.span().set_status(SpanStatus::Ok, None);
                    values.insert(op.name.as_str(), value);
                }
                Err(e) => {
                    record_exception(&step, &e);
                    return Err(e);
                }
            }
        }
        values
            .get(plan.result_variable.as_str())
            .copied()
            .ok_or_else(|| CalcError::Unable(plan.result_variable.clone()))
    }

    fn run_operation(
        &self,
        ctx: &ExecutionContext,
        op: &Operation,
        values: &HashMap<&str, f64>,
    ) -> Result<f64> {
        if op.kind.is_group() {
            return self.calculate_group(ctx, op.kind, &op.op1);
        }
        let lhs = operand(&op.op1, values)?;
        let rhs = operand(&op.op2, values)?;
        if op.kind == OperationKind::Division && rhs == 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        let calculator = match op.kind {
            OperationKind::Addition => &self.addition,
            OperationKind::Subtraction => &self.subtraction,
            OperationKind::Multiplication => &self.multiplication,
            _ => &self.division,
        };
        calculator.calculate_expression(ctx, &format!("{}{}{}", lhs, op.kind.symbol(), rhs))
    }

    /// Calculate a bracket group with its dedicated calculator, falling
    /// back to recursion when there is none or it fails.
    fn calculate_group(&self, ctx: &ExecutionContext, kind: OperationKind, inner: &str) -> Result<f64> {
        let dedicated = match kind {
            OperationKind::Parentheses => self.parentheses.as_ref(),
            OperationKind::SquareBrackets => self.square_brackets.as_ref(),
            _ => self.curly_brackets.as_ref(),
        };
        if let Some(calculator) = dedicated {
            match calculator.calculate_expression(ctx, inner) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::error!(
                        expression = inner,
                        calculator = calculator.name(),
                        error = %e,
                        "group calculator failed, calculating locally"
                    );
                }
            }
        }
        self.calculate_expression(ctx, inner)
    }

    fn attempt(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        for iteration in 0..self.max_iterations {
            let plan = self.plan(ctx, expression)?;
            let result = self.execute(ctx, &plan)?;

            let valid = {
                let scope = ctx.child("validate");
                scope.span().set_attribute("iteration", iteration as i64);
                self.fallback.is_valid_result(&scope, expression, result)
            };
            if valid {
                return Ok(result);
            }
            tracing::warn!(expression, iteration = iteration as u64, result, "result failed validation");
        }
        Err(CalcError::Unable(expression.to_string()))
    }
}

fn operand(token: &str, values: &HashMap<&str, f64>) -> Result<f64> {
    if is_variable(token) {
        return values
            .get(token)
            .copied()
            .ok_or_else(|| CalcError::parse(token, "unknown variable"));
    }
    token
        .parse()
        .map_err(|_| CalcError::parse(token, "operand is not a number"))
}

impl Calculator for DecomposingCalculator {
    fn name(&self) -> &str {
        "decomposing"
    }

    fn calculate_expression(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        let scope = ctx.child(format!("calculate {}", expression));
        scope.span().set_attribute("expression", expression);

        let decomposable = nesting_depth(expression) <= Self::MAX_GROUP_DEPTH;
        if !decomposable {
            tracing::warn!(expression, "nested too deeply to decompose, evaluating directly");
        }
        if decomposable && self.is_valid_expression(&scope, expression) {
            match self.attempt(&scope, expression) {
                Ok(result) => {
                    scope.span().set_attribute("result", result);
                    tracing::info!(expression, result, "calculated");
                    return Ok(result);
                }
                Err(e) => {
                    tracing::error!(expression, error = %e, "decomposition failed, falling back");
                }
            }
        }
        let result = self.fallback.calculate_expression(&scope, expression);
        if let Err(e) = &result {
            record_exception(&scope, e);
        }
        result
    }

    fn is_valid_expression(&self, ctx: &ExecutionContext, expression: &str) -> bool {
        self.fallback.is_valid_expression(ctx, expression)
    }

    fn is_valid_result(&self, ctx: &ExecutionContext, expression: &str, result: f64) -> bool {
        self.fallback.is_valid_result(ctx, expression, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predefined::PredefinedCalculator;
    use agent_analytics_span::{SpanTreeBuilder, Tracer};

    fn names(operations: &[Operation]) -> Vec<(String, OperationKind, String, String)> {
        operations
            .iter()
            .map(|o| (o.name.clone(), o.kind, o.op1.clone(), o.op2.clone()))
            .collect()
    }

    #[test]
    fn test_extract_upper_level_brackets() {
        let (rewritten, ops) =
            extract_upper_level_brackets("3+[1+2+3/3]*5+6/((2+1)*2-3)", BracketSelection::ALL);
        assert_eq!(rewritten, "3+E0*5+6/E1");
        assert_eq!(ops[0].kind, OperationKind::SquareBrackets);
        assert_eq!(ops[0].op1, "1+2+3/3");
        assert_eq!(ops[1].kind, OperationKind::Parentheses);
        assert_eq!(ops[1].op1, "(2+1)*2-3");
    }

    #[test]
    fn test_extract_respects_selection() {
        let selection = BracketSelection {
            parentheses: true,
            square: false,
            curly: false,
        };
        let (rewritten, ops) = extract_upper_level_brackets("[1+(2)]*(3)", selection);
        assert_eq!(rewritten, "[1+(2)]*E0");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op1, "3");
    }

    #[test]
    fn test_decompose_orders_operations() {
        let ops = decompose("3+[1+2+3/3]*5+6/((2+1)*2-3)").unwrap();
        let expected = vec![
            ("E0", OperationKind::SquareBrackets, "1+2+3/3", ""),
            ("E1", OperationKind::Parentheses, "(2+1)*2-3", ""),
            ("E2", OperationKind::Multiplication, "E0", "5"),
            ("E3", OperationKind::Division, "6", "E1"),
            ("E4", OperationKind::Addition, "3", "E2"),
            ("E5", OperationKind::Addition, "E4", "E3"),
        ];
        let expected: Vec<_> = expected
            .into_iter()
            .map(|(n, k, a, b)| (n.to_string(), k, a.to_string(), b.to_string()))
            .collect();
        assert_eq!(names(&ops), expected);
        assert_eq!(ops[5].dependencies(), vec!["E4", "E3"]);
    }

    #[test]
    fn test_decompose_rejects_dangling_operator() {
        assert!(decompose("-3+4").is_err());
        assert!(decompose("5").is_err());
    }

    #[test]
    fn test_plan_workflow_edges() {
        let plan = Plan::new(decompose("7*[2+18/3]-9+(4*5-2)").unwrap()).unwrap();
        let (workflow, nodes, edges) = plan.to_workflow("wf", "7*[2+18/3]-9+(4*5-2)");

        assert_eq!(workflow.display_name(), "7*[2+18/3]-9+(4*5-2)");
        assert_eq!(nodes.len(), plan.operations.len());
        assert_eq!(edges[0].category, WorkflowEdgeCategory::Enter);
        let e2 = &edges[2];
        assert_eq!(e2.category, WorkflowEdgeCategory::Sequential);
        assert_eq!(e2.relation.source_ids, Some(vec!["wf.calc_E0".to_string()]));
        let last = edges.last().unwrap();
        assert_eq!(last.category, WorkflowEdgeCategory::Join);
    }

    #[test]
    fn test_calculate_with_trace() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let ctx = ExecutionContext::new(tracer);
        let calculator = DecomposingCalculator::new();

        let result = calculator
            .calculate_expression(&ctx, "3+[1+2+3/3]*5+6/((2+1)*2-3)")
            .unwrap();
        assert_eq!(result, 25.0);

        let mut tree = SpanTreeBuilder::new();
        tree.extend(exporter.take());
        let root = tree.finalize_root().unwrap();
        assert_eq!(root.status, SpanStatus::Unset);
        let plan = root.find("plan").unwrap();
        assert!(plan.events.iter().any(|e| e.name.ends_with(".workflow")));
        assert_eq!(plan.events_named("calc_E0.workflow_node").count(), 1);
        assert!(root.find("calc_E5").is_some());
    }

    #[test]
    fn test_wrong_operator_calculator_falls_back() {
        let ctx = ExecutionContext::new(Tracer::in_memory("test").0);
        let wrong = PredefinedCalculator::new().with("2*3", 7.0);
        let calculator = DecomposingCalculator::new()
            .with_operator(OperationKind::Multiplication, Arc::new(wrong));

        assert_eq!(calculator.calculate_expression(&ctx, "1+2*3").unwrap(), 7.0);
    }

    #[test]
    fn test_deep_groups_are_evaluated_directly() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let ctx = ExecutionContext::new(tracer);
        let depth = DecomposingCalculator::MAX_GROUP_DEPTH + 4;
        let expression = format!("{}1+1{}*3", "(".repeat(depth), ")".repeat(depth));

        let result = DecomposingCalculator::new().calculate_expression(&ctx, &expression);
        assert_eq!(result.unwrap(), 6.0);

        let mut tree = SpanTreeBuilder::new();
        tree.extend(exporter.take());
        let root = tree.finalize_root().unwrap();
        assert!(root.find("decompose").is_none());
        assert_eq!(root.span_count(), 1);
    }

    #[test]
    fn test_overly_nested_expression_fails_without_recursing() {
        let ctx = ExecutionContext::new(Tracer::in_memory("test").0);
        let expression = format!("{}2{}", "[".repeat(100_000), "]".repeat(100_000));

        let result = DecomposingCalculator::new().calculate_expression(&ctx, &expression);
        assert!(result.is_err());
    }

    #[test]
    fn test_division_by_zero_fails() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let ctx = ExecutionContext::new(tracer);

        let result = DecomposingCalculator::new().calculate_expression(&ctx, "4/(2-2)");
        assert!(result.is_err());

        let mut tree = SpanTreeBuilder::new();
        tree.extend(exporter.take());
        assert_eq!(tree.finalize_root().unwrap().status, SpanStatus::Error);
    }
}
