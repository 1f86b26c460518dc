//! In-process span collaborator for agent analytics instrumentation.
//!
//! A [`Tracer`] starts spans and hands them to a [`SpanExporter`] when they
//! end. Instrumentation records on the current span of an explicit
//! [`ExecutionContext`]; there is no ambient span state.
//!
//! # Usage
//!
//! 1. Build a `Tracer` over an exporter (`InMemoryExporter`, `LogExporter`).
//! 2. Pass an `ExecutionContext` to instrumented code; use
//!    `ExecutionContext::child` for nested work.
//! 3. Use `TraceContextExtractor` in Axum handlers to continue a trace
//!    propagated through `x-trace-id` / `x-parent-span-id`.
//! 4. Assemble exported spans with `SpanTreeBuilder` and wrap results in an
//!    `ExecutionEnvelope`.

pub mod context;
pub mod error;
pub mod extract;
pub mod response;
pub mod span;
pub mod tracer;
pub mod tree;

pub use context::{ExecutionContext, RemoteParent, SpanScope, PARENT_SPAN_ID_HEADER, TRACE_ID_HEADER};
pub use error::{Result, SpanError};
pub use extract::TraceContextExtractor;
pub use response::{EnvelopeError, ExecutionEnvelope, FailureKind};
pub use span::{AttrValue, Attributes, ExecutionSpan, SpanEvent, SpanKind, SpanStatus};
pub use tracer::{ActiveSpan, FanoutExporter, InMemoryExporter, LogExporter, SpanExporter, Tracer};
pub use tree::SpanTreeBuilder;
