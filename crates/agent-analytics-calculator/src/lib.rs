//! Instrumented calculators.
//!
//! Demonstrates agent analytics instrumentation on arithmetic: a
//! [`DelegatingCalculator`] chain, an [`EvalCalculator`] that records a
//! quality metric when validation fails, a [`DecomposingCalculator`] that
//! captures its plan as a workflow, and a [`DistributedCalculator`] whose
//! calculation servers join the caller's trace.

pub mod calculator;
pub mod cli;
pub mod config;
pub mod decomposing;
pub mod delegating;
pub mod distributed;
pub mod error;
pub mod eval;
pub mod predefined;

pub use calculator::{results_match, Calculator, RESULT_TOLERANCE};
pub use cli::{calculate_traced, run, Cli, Commands, ExitCode, Mode, OutputFormat};
pub use config::{CalculatorConfig, CalculatorConfigBuilder};
pub use decomposing::{decompose, DecomposingCalculator, Operation, OperationKind, Plan};
pub use delegating::DelegatingCalculator;
pub use distributed::{
    CalculateRequest, CalculateResponse, CalculationServer, DistributedCalculator, RemoteCalculator,
};
pub use error::{CalcError, Result};
pub use eval::{evaluate, nesting_depth, EvalCalculator, MAX_NESTING_DEPTH};
pub use predefined::PredefinedCalculator;
