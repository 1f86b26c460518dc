//! Tracer, live span handles and exporters.

use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::RemoteParent;
use crate::span::{AttrValue, Attributes, ExecutionSpan, SpanEvent, SpanKind, SpanStatus};

/// Receives spans once they end.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: ExecutionSpan);
}

/// Keeps finished spans in memory.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    spans: Mutex<Vec<ExecutionSpan>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the finished spans, in end order.
    pub fn finished_spans(&self) -> Vec<ExecutionSpan> {
        self.spans.lock().clone()
    }

    /// Drain the finished spans.
    pub fn take(&self) -> Vec<ExecutionSpan> {
        std::mem::take(&mut *self.spans.lock())
    }

    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.lock().is_empty()
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: ExecutionSpan) {
        self.spans.lock().push(span);
    }
}

/// Emits each finished span as a structured `tracing` event.
#[derive(Debug, Default, Clone)]
pub struct LogExporter;

impl SpanExporter for LogExporter {
    fn export(&self, span: ExecutionSpan) {
        let events = serde_json::to_string(&span.events).unwrap_or_default();
        let attributes = serde_json::to_string(&span.attributes).unwrap_or_default();
        tracing::info!(
            target: "agent_analytics::span",
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            parent_span_id = ?span.parent_span_id,
            name = %span.name,
            status = ?span.status,
            status_message = ?span.status_message,
            duration_ms = ?span.duration_ms,
            attributes = %attributes,
            events = %events,
            "span finished"
        );
    }
}

/// Forwards finished spans to several exporters.
#[derive(Default, Clone)]
pub struct FanoutExporter {
    exporters: Vec<Arc<dyn SpanExporter>>,
}

impl FanoutExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, exporter: Arc<dyn SpanExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }
}

impl SpanExporter for FanoutExporter {
    fn export(&self, span: ExecutionSpan) {
        if let Some((last, rest)) = self.exporters.split_last() {
            for exporter in rest {
                exporter.export(span.clone());
            }
            last.export(span);
        }
    }
}

/// Starts spans and hands them to an exporter when they end.
#[derive(Clone)]
pub struct Tracer {
    name: String,
    exporter: Arc<dyn SpanExporter>,
    resource: Arc<Attributes>,
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("name", &self.name)
            .field("resource", &self.resource)
            .finish()
    }
}

impl Tracer {
    pub fn new(name: impl Into<String>, exporter: Arc<dyn SpanExporter>) -> Self {
        Self {
            name: name.into(),
            exporter,
            resource: Arc::new(Attributes::new()),
        }
    }

    /// Attributes copied onto every span this tracer starts.
    pub fn with_resource(mut self, resource: Attributes) -> Self {
        self.resource = Arc::new(resource);
        self
    }

    pub fn resource(&self) -> &Attributes {
        &self.resource
    }

    /// A tracer recording into a fresh in-memory exporter.
    pub fn in_memory(name: impl Into<String>) -> (Self, Arc<InMemoryExporter>) {
        let exporter = Arc::new(InMemoryExporter::new());
        (Self::new(name, exporter.clone()), exporter)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a span beginning a new trace.
    pub fn start_span(&self, name: impl Into<String>) -> ActiveSpan {
        self.activate(ExecutionSpan::new_root(name))
    }

    /// Start a span under a live parent.
    pub fn start_child(&self, parent: &ActiveSpan, name: impl Into<String>) -> ActiveSpan {
        self.activate(ExecutionSpan::new_child(
            parent.trace_id(),
            parent.span_id(),
            name,
        ))
    }

    /// Start a server span under a parent received from another process.
    pub fn start_remote_child(&self, parent: &RemoteParent, name: impl Into<String>) -> ActiveSpan {
        let mut span = ExecutionSpan::new_child(parent.trace_id, parent.parent_span_id, name);
        span.kind = SpanKind::Server;
        self.activate(span)
    }

    fn activate(&self, mut span: ExecutionSpan) -> ActiveSpan {
        for (key, value) in self.resource.iter() {
            span.set_attribute(key.clone(), value.clone());
        }
        span.set_attribute("tracer.name", self.name.as_str());
        ActiveSpan {
            inner: Arc::new(SpanInner {
                trace_id: span.trace_id,
                span_id: span.span_id,
                span: Mutex::new(span),
                exporter: self.exporter.clone(),
            }),
        }
    }
}

struct SpanInner {
    trace_id: Uuid,
    span_id: Uuid,
    span: Mutex<ExecutionSpan>,
    exporter: Arc<dyn SpanExporter>,
}

/// Handle to a live span.
///
/// Cloning shares the span. Once ended, the span stops recording and
/// further calls are ignored.
#[derive(Clone)]
pub struct ActiveSpan {
    inner: Arc<SpanInner>,
}

impl std::fmt::Debug for ActiveSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSpan")
            .field("trace_id", &self.inner.trace_id)
            .field("span_id", &self.inner.span_id)
            .finish()
    }
}

impl ActiveSpan {
    pub fn trace_id(&self) -> Uuid {
        self.inner.trace_id
    }

    pub fn span_id(&self) -> Uuid {
        self.inner.span_id
    }

    pub fn name(&self) -> String {
        self.inner.span.lock().name.clone()
    }

    /// Whether the span still accepts events.
    pub fn is_recording(&self) -> bool {
        !self.inner.span.lock().is_ended()
    }

    pub fn set_kind(&self, kind: SpanKind) {
        let mut span = self.inner.span.lock();
        if !span.is_ended() {
            span.kind = kind;
        }
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttrValue>) {
        let mut span = self.inner.span.lock();
        if !span.is_ended() {
            span.set_attribute(key, value);
        }
    }

    pub fn add_event(&self, name: impl Into<String>, attributes: Attributes) {
        let mut span = self.inner.span.lock();
        if !span.is_ended() {
            span.add_event(SpanEvent::new(name, attributes));
        }
    }

    /// Append an `exception` event describing the error and its causes.
    pub fn record_exception<E>(&self, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        self.record_exception_parts(
            std::any::type_name::<E>(),
            &error.to_string(),
            (!causes.is_empty()).then(|| causes.join("\ncaused by: ")),
        );
    }

    /// Append an `exception` event from its parts.
    pub fn record_exception_parts(&self, type_name: &str, message: &str, stacktrace: Option<String>) {
        let mut attributes = Attributes::new();
        attributes.insert("exception.type".to_string(), type_name.into());
        attributes.insert("exception.message".to_string(), message.into());
        if let Some(stacktrace) = stacktrace {
            attributes.insert("exception.stacktrace".to_string(), stacktrace.into());
        }
        self.add_event("exception", attributes);
    }

    pub fn set_status(&self, status: SpanStatus, message: Option<String>) {
        let mut span = self.inner.span.lock();
        if !span.is_ended() {
            span.set_status(status, message);
        }
    }

    /// End the span and export it. Ending twice is a no-op.
    pub fn end(&self) {
        let finished = {
            let mut span = self.inner.span.lock();
            if span.is_ended() {
                return;
            }
            span.complete();
            span.clone()
        };
        self.inner.exporter.export(finished);
    }

    /// Copy of the span data as it stands.
    pub fn snapshot(&self) -> ExecutionSpan {
        self.inner.span.lock().clone()
    }
}
