//! Explicit execution context.
//!
//! An `ExecutionContext` carries the tracer and the span instrumentation
//! should record on. It is passed by reference to every capture call;
//! nested work gets a child context through [`ExecutionContext::child`],
//! whose span ends when the returned scope is dropped.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use uuid::Uuid;

use crate::error::{Result, SpanError};
use crate::tracer::{ActiveSpan, Tracer};

/// Header carrying the trace identifier.
pub const TRACE_ID_HEADER: &str = "x-trace-id";
/// Header carrying the caller's span identifier.
pub const PARENT_SPAN_ID_HEADER: &str = "x-parent-span-id";

/// Parent span living in another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParent {
    pub trace_id: Uuid,
    pub parent_span_id: Uuid,
}

impl RemoteParent {
    /// Read the parent from request headers.
    ///
    /// Returns `Ok(None)` when neither header is present; a lone or
    /// malformed header is an error.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>> {
        let trace_id = parse_header(headers, TRACE_ID_HEADER)?;
        let parent_span_id = parse_header(headers, PARENT_SPAN_ID_HEADER)?;

        match (trace_id, parent_span_id) {
            (None, None) => Ok(None),
            (Some(trace_id), Some(parent_span_id)) => Ok(Some(Self {
                trace_id,
                parent_span_id,
            })),
            (None, Some(_)) => Err(SpanError::MissingHeader(TRACE_ID_HEADER)),
            (Some(_), None) => Err(SpanError::MissingHeader(PARENT_SPAN_ID_HEADER)),
        }
    }

    /// Header pairs propagating this parent.
    pub fn headers(&self) -> [(&'static str, String); 2] {
        [
            (TRACE_ID_HEADER, self.trace_id.to_string()),
            (PARENT_SPAN_ID_HEADER, self.parent_span_id.to_string()),
        ]
    }
}

fn parse_header(headers: &HeaderMap, name: &'static str) -> Result<Option<Uuid>> {
    let Some(raw) = headers.get(name) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or_else(|| SpanError::InvalidHeader {
            header: name,
            value: String::from_utf8_lossy(raw.as_bytes()).into_owned(),
        })
}

/// Tracer plus the current span, if any.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    tracer: Tracer,
    current: Option<ActiveSpan>,
}

impl ExecutionContext {
    /// Context without a current span.
    pub fn new(tracer: Tracer) -> Self {
        Self {
            tracer,
            current: None,
        }
    }

    /// Context whose current span is `span`. The span is not ended by
    /// this context.
    pub fn with_span(tracer: Tracer, span: ActiveSpan) -> Self {
        Self {
            tracer,
            current: Some(span),
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn current_span(&self) -> Option<&ActiveSpan> {
        self.current.as_ref()
    }

    /// Start a span under the current one (or a new trace) and make it
    /// current in the returned scope.
    pub fn child(&self, name: impl Into<String>) -> SpanScope {
        let span = match self.current.as_ref().filter(|s| s.is_recording()) {
            Some(parent) => self.tracer.start_child(parent, name),
            None => self.tracer.start_span(name),
        };
        SpanScope {
            context: Self::with_span(self.tracer.clone(), span.clone()),
            span,
        }
    }

    /// Parent descriptor for propagating the current span to another
    /// process.
    pub fn remote_parent(&self) -> Option<RemoteParent> {
        self.current.as_ref().map(|span| RemoteParent {
            trace_id: span.trace_id(),
            parent_span_id: span.span_id(),
        })
    }
}

/// A child context owning its span; ends the span when dropped.
#[derive(Debug)]
pub struct SpanScope {
    context: ExecutionContext,
    span: ActiveSpan,
}

impl SpanScope {
    /// The span owned by this scope.
    pub fn span(&self) -> &ActiveSpan {
        &self.span
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

impl Deref for SpanScope {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        self.span.end();
    }
}
