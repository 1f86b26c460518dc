//! Logging bootstrap
//!
//! Installs a JSON-lines `tracing` subscriber (log file or stdout) and
//! returns a [`Telemetry`] handle whose tracer exports finished spans as
//! structured log events.

use agent_analytics_span::{
    AttrValue, Attributes, ExecutionContext, InMemoryExporter, LogExporter, Tracer,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{ExporterKind, SdkConfig};
use crate::error::Result;

/// Handle returned by [`initialize_logging`]
#[derive(Debug, Clone)]
pub struct Telemetry {
    app_name: String,
    tracer: Tracer,
    log_path: Option<PathBuf>,
    memory: Option<Arc<InMemoryExporter>>,
}

impl Telemetry {
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Fresh execution context without a current span
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.tracer.clone())
    }

    /// Log file written to, in log mode
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Exporter holding finished spans, in memory mode
    pub fn memory_exporter(&self) -> Option<&Arc<InMemoryExporter>> {
        self.memory.as_ref()
    }
}

/// Filter from `RUST_LOG`, falling back to `level`
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// JSON-lines subscriber writing to `writer`
pub fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(false),
    )
}

/// Configure logging and span export.
///
/// In log mode the logs directory is created when missing and JSON lines
/// are appended to [`SdkConfig::log_path`]. Console mode writes the same
/// lines to stdout. Memory mode installs nothing and keeps finished spans
/// in an in-memory exporter. An already installed global subscriber is
/// kept; spans then go to it.
pub fn initialize_logging(config: &SdkConfig) -> Result<Telemetry> {
    let app_name = config.resolved_app_name();
    let resource = resource_attributes(&app_name, config);

    let telemetry = match config.exporter {
        ExporterKind::Log => {
            let path = config.log_path();
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            install(json_subscriber(env_filter(&config.log_level), Mutex::new(file)));
            tracing::info!(path = %path.display(), app_name = %app_name, "logging initialized");

            Telemetry {
                tracer: Tracer::new(app_name.clone(), Arc::new(LogExporter)).with_resource(resource),
                app_name,
                log_path: Some(path),
                memory: None,
            }
        }
        ExporterKind::Console => {
            install(json_subscriber(env_filter(&config.log_level), std::io::stdout));
            tracing::info!(app_name = %app_name, "logging initialized on stdout");

            Telemetry {
                tracer: Tracer::new(app_name.clone(), Arc::new(LogExporter)).with_resource(resource),
                app_name,
                log_path: None,
                memory: None,
            }
        }
        ExporterKind::Memory => {
            let (tracer, exporter) = Tracer::in_memory(app_name.clone());
            Telemetry {
                tracer: tracer.with_resource(resource),
                app_name,
                log_path: None,
                memory: Some(exporter),
            }
        }
    };

    Ok(telemetry)
}

fn install(subscriber: impl Subscriber + Send + Sync + 'static) {
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        tracing::warn!(error = %e, "global subscriber already installed, keeping it");
    }
}

fn resource_attributes(app_name: &str, config: &SdkConfig) -> Attributes {
    let mut resource: Attributes = config
        .resource_attributes
        .iter()
        .map(|(k, v)| (k.clone(), AttrValue::from(v.as_str())))
        .collect();
    resource
        .entry("service.name".to_string())
        .or_insert_with(|| AttrValue::from(app_name));
    resource
}
