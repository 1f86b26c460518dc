//! Command-line interface of the `calc` binary.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: The expression could not be calculated
//! - 10: Internal error (logging, server startup)

use agent_analytics_sdk::{initialize_logging, record_exception, ExporterKind, SdkConfig};
use agent_analytics_span::{
    Attributes, EnvelopeError, ExecutionContext, ExecutionEnvelope, FanoutExporter, InMemoryExporter,
    LogExporter, SpanTreeBuilder, Tracer,
};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use crate::calculator::Calculator;
use crate::config::CalculatorConfig;
use crate::decomposing::DecomposingCalculator;
use crate::distributed::{CalculationServer, DistributedCalculator};
use crate::eval::EvalCalculator;

/// Exit codes for the calc binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Calculation succeeded
    Success = 0,
    /// The expression could not be calculated
    CalculationError = 1,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

#[derive(Parser, Debug)]
#[command(name = "calc")]
#[command(about = "Instrumented calculator with span trees")]
#[command(version)]
pub struct Cli {
    /// Write JSON logs and finished spans to this directory
    #[arg(long, global = true, env = "AGENT_ANALYTICS_LOGS_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calculate an expression
    Calculate {
        /// Arithmetic expression, e.g. "3+[1+2]*5"
        expression: String,

        #[arg(short, long, value_enum, default_value_t = Mode::Decompose)]
        mode: Mode,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Number of calculation servers (distributed mode)
        #[arg(long)]
        servers: Option<usize>,

        /// First server port, 0 for ephemeral ports (distributed mode)
        #[arg(long)]
        base_port: Option<u16>,
    },

    /// Serve a decomposing calculator over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000", env = "CALCULATOR_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Eval,
    Decompose,
    Distributed,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Eval => "eval",
            Mode::Decompose => "decompose",
            Mode::Distributed => "distributed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Run the CLI and return the exit code
pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::InternalError
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let resource = match &cli.log_dir {
        Some(dir) => {
            let config = SdkConfig::builder()
                .app_name("calc")
                .exporter(ExporterKind::Log)
                .logs_dir(dir.clone())
                .build();
            let telemetry = initialize_logging(&config).context("failed to initialize logging")?;
            telemetry.tracer().resource().clone()
        }
        None => Attributes::new(),
    };

    match cli.command {
        Commands::Calculate {
            expression,
            mode,
            format,
            servers,
            base_port,
        } => {
            let mut config = CalculatorConfig::from_env();
            if let Some(servers) = servers {
                config.server_count = servers;
            }
            if let Some(base_port) = base_port {
                config.base_port = base_port;
            }
            calculate_command(&expression, mode, format, &config, resource)
        }
        Commands::Serve { port, host } => serve_command(&host, port, resource),
    }
}

fn calculate_command(
    expression: &str,
    mode: Mode,
    format: OutputFormat,
    config: &CalculatorConfig,
    resource: Attributes,
) -> anyhow::Result<ExitCode> {
    let memory = Arc::new(InMemoryExporter::new());
    let exporter = FanoutExporter::new()
        .with(memory.clone())
        .with(Arc::new(LogExporter));
    let tracer = Tracer::new("calc", Arc::new(exporter)).with_resource(resource);

    let calculator: Box<dyn Calculator> = match mode {
        Mode::Eval => Box::new(EvalCalculator::new()),
        Mode::Decompose => {
            Box::new(DecomposingCalculator::new().with_max_iterations(config.max_iterations))
        }
        Mode::Distributed => Box::new(
            DistributedCalculator::start(config, tracer.clone())
                .context("failed to start calculation servers")?,
        ),
    };

    let envelope = calculate_traced(calculator.as_ref(), &ExecutionContext::new(tracer), &memory, expression)?;
    drop(calculator);

    match format {
        OutputFormat::Text => match (&envelope.data, &envelope.error) {
            (Some(result), _) => println!("The result of {} is {}", expression, result),
            (None, Some(error)) => eprintln!(
                "Unable to calculate {}: {} [{}]",
                expression, error.message, error.kind
            ),
            (None, None) => eprintln!("Unable to calculate {}", expression),
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
    }

    Ok(if envelope.data.is_some() {
        ExitCode::Success
    } else {
        ExitCode::CalculationError
    })
}

/// Calculate under a root `calculate` span and wrap the outcome with the
/// assembled span tree.
///
/// `memory` must be an exporter of `ctx`'s tracer; its spans are drained.
pub fn calculate_traced(
    calculator: &dyn Calculator,
    ctx: &ExecutionContext,
    memory: &InMemoryExporter,
    expression: &str,
) -> anyhow::Result<ExecutionEnvelope<f64>> {
    let outcome = {
        let scope = ctx.child("calculate");
        scope.span().set_attribute("expression", expression);
        scope.span().set_attribute("calculator", calculator.name());
        let outcome = calculator.calculate_expression(&scope, expression);
        match &outcome {
            Ok(result) => scope.span().set_attribute("result", *result),
            Err(e) => record_exception(&scope, e),
        }
        outcome
    };

    let mut tree = SpanTreeBuilder::new();
    tree.extend(memory.take());
    let root = tree.finalize_root().context("no spans were recorded")?;

    Ok(match outcome {
        Ok(result) => ExecutionEnvelope::success(result, root),
        Err(e) => ExecutionEnvelope::failure(EnvelopeError::of(&e), root),
    })
}

fn serve_command(host: &str, port: u16, resource: Attributes) -> anyhow::Result<ExitCode> {
    let tracer = Tracer::new("calc-server", Arc::new(LogExporter)).with_resource(resource);
    let mut server = CalculationServer::start(host, port, Arc::new(DecomposingCalculator::new()), tracer)
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    tracing::info!("Serving calculations on {}", server.url());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;

    server.stop();
    Ok(ExitCode::Success)
}
