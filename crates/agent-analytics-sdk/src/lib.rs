//! Agent Analytics SDK
//!
//! Captures taxonomy entities as span events. Every capture call takes an
//! explicit [`ExecutionContext`]: the entity is flattened into scalar
//! attributes and appended as one event to the context's current span, or
//! to a short-lived fallback span when none is recording.
//!
//! # Example
//!
//! ```rust
//! use agent_analytics_core::{Issue, IssueLevel, Record};
//! use agent_analytics_sdk::capture_issue;
//! use agent_analytics_span::{ExecutionContext, Tracer};
//!
//! let (tracer, exporter) = Tracer::in_memory("example");
//! let ctx = ExecutionContext::new(tracer);
//!
//! let issue = Issue::new("issue-1", IssueLevel::Warning).with_name("slow");
//! capture_issue(&ctx, &issue);
//!
//! assert_eq!(exporter.take()[0].events[0].name, "slow.issue");
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod exception;
pub mod flatten;
pub mod logging;

pub use capture::{
    capture, capture_agent, capture_ai_event, capture_data_annotation, capture_entity,
    capture_issue, capture_metric, capture_organization, capture_recommendation, capture_resource,
    capture_role, capture_runnable, capture_service, capture_span, capture_task, capture_trace,
    capture_trace_group, capture_workflow, capture_workflow_edge, capture_workflow_node, emit,
    fallback_span_name, flatten, Capturable,
};
pub use config::{ExporterKind, SdkConfig, SdkConfigBuilder};
pub use error::{Result, SdkError};
pub use exception::{record_exception, record_exceptions, record_metric};
pub use flatten::{normalize, Flattener};
pub use logging::{initialize_logging, Telemetry};

pub use agent_analytics_span::ExecutionContext;
