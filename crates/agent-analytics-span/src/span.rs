//! Span record types.
//!
//! `ExecutionSpan` is the plain data of a span: identity, timing, status,
//! attributes and the events appended to it. Live spans wrap it in an
//! [`ActiveSpan`](crate::tracer::ActiveSpan); exporters receive it once the
//! span ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

/// Role of a span in a request flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
}

/// Attribute value accepted by spans and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::I64(v) => write!(f, "{}", v),
            AttrValue::F64(v) => write!(f, "{}", v),
            AttrValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::I64(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::F64(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

/// Span and event attributes, ordered by key.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A named, timestamped event appended to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl SpanEvent {
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            attributes,
        }
    }

    /// Look up an attribute of this event.
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

/// A single span.
///
/// Spans form a tree through `parent_span_id`; every span of a tree shares
/// the same `trace_id`. `children` is only filled when a tree is assembled
/// from exported spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSpan {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub kind: SpanKind,
    pub status: SpanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub events: Vec<SpanEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExecutionSpan>,
}

impl ExecutionSpan {
    /// Create a span starting a new trace.
    pub fn new_root(name: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), None, name)
    }

    /// Create a span under a parent identified by trace and span id.
    pub fn new_child(trace_id: Uuid, parent_span_id: Uuid, name: impl Into<String>) -> Self {
        Self::new(trace_id, Some(parent_span_id), name)
    }

    fn new(trace_id: Uuid, parent_span_id: Option<Uuid>, name: impl Into<String>) -> Self {
        Self {
            trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id,
            name: name.into(),
            kind: SpanKind::Internal,
            status: SpanStatus::Unset,
            status_message: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            attributes: Attributes::new(),
            events: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Set the status. `Ok` is final; `Unset` never overrides.
    pub fn set_status(&mut self, status: SpanStatus, message: Option<String>) {
        if self.status == SpanStatus::Ok || status == SpanStatus::Unset {
            return;
        }
        self.status = status;
        self.status_message = match status {
            SpanStatus::Error => message,
            _ => None,
        };
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn add_event(&mut self, event: SpanEvent) {
        self.events.push(event);
    }

    /// Mark the span as ended.
    pub fn complete(&mut self) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
    }

    /// Mark the span as failed with an error message and end it.
    pub fn fail(&mut self, error: String) {
        self.set_status(SpanStatus::Error, Some(error));
        self.complete();
    }

    /// Events with the given name, in append order.
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SpanEvent> + 'a {
        self.events.iter().filter(move |e| e.name == name)
    }

    /// Depth-first search of this span and its assembled children.
    pub fn find(&self, name: &str) -> Option<&ExecutionSpan> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Number of spans in this subtree, this span included.
    pub fn span_count(&self) -> usize {
        1 + self.children.iter().map(ExecutionSpan::span_count).sum::<usize>()
    }
}
