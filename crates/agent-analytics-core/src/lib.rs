//! Agent Analytics Core
//!
//! Entity model of the agentic-AI observability taxonomy.
//!
//! Every entity embeds a base [`Element`] (identity, type discriminator,
//! display metadata, open attributes). Intermediate bases [`IUnit`] and
//! [`Relation`] are shared by units and links. Concrete types implement
//! [`Record`], which exposes the base element, validation and an explicit
//! field registry consumed by the instrumentation layer.
//!
//! # Example
//!
//! ```rust
//! use agent_analytics_core::{Issue, IssueLevel, Record};
//!
//! let issue = Issue::new("issue-1", IssueLevel::Warning)
//!     .with_name("slow response")
//!     .affecting("agent-1")
//!     .with_effect("latency");
//!
//! assert!(issue.validate().is_ok());
//! assert_eq!(issue.display_name(), "slow response");
//! ```

#[macro_use]
mod macros;

pub mod agents;
pub mod annotations;
pub mod elements;
pub mod entity;
pub mod error;
pub mod events;
pub mod issues;
pub mod iunits;
pub mod metrics;
pub mod organizations;
pub mod recommendations;
pub mod resources;
pub mod service;
pub mod store;
pub mod tasks;
pub mod traces;
pub mod values;
pub mod workflows;

pub use agents::Agent;
pub use annotations::{AnnotationType, DataAnnotation};
pub use elements::{Element, Record, Tag};
pub use entity::{Entity, EntityKind};
pub use error::{ModelError, ModelResult};
pub use events::{AiEvent, AiEventStatus};
pub use issues::{Issue, IssueLevel};
pub use iunits::{IUnit, Relation};
pub use metrics::{Metric, MetricCategory};
pub use organizations::{Organization, Role};
pub use recommendations::{Recommendation, RecommendationLevel};
pub use resources::{Resource, ResourceCategory};
pub use service::Service;
pub use store::InMemoryStore;
pub use tasks::Task;
pub use traces::{Event, Link, Span, SpanContext, SpanKind, Trace, TraceGroup};
pub use values::{AttributeValue, FieldValue, Fields, Scalar};
pub use workflows::{Runnable, Workflow, WorkflowEdge, WorkflowEdgeCategory, WorkflowNode};
