//! Tracing record vocabulary: spans, traces and trace groups
//!
//! These are plain records describing telemetry after the fact. The live
//! span machinery used for instrumentation lives in `agent-analytics-span`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::values::{AttributeValue, FieldValue, Fields};

labeled_enum! {
    #[derive(Default)]
    pub enum SpanKind ("span kind") {
        #[default]
        Internal => "internal",
        Server => "server",
        Client => "client",
        Producer => "producer",
        Consumer => "consumer",
    }
}

/// A timestamped occurrence recorded on a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
}

/// Identity of a span within its trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub trace_state: Vec<AttributeValue>,
}

/// Reference to a span in another trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
}

fn check_window(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> ModelResult<()> {
    match end {
        Some(end) if end < start => Err(ModelError::inconsistent(
            "start_time",
            "end_time",
            "end time precedes start time",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(flatten)]
    pub element: Element,

    pub context: SpanContext,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub kind: SpanKind,

    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub events: Vec<Event>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl Span {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        context: SpanContext,
        start_time: DateTime<Utc>,
    ) -> Self {
        let mut element = Element::of_kind(id, EntityKind::Span);
        element.name = Some(name.into());
        Self {
            element,
            context,
            parent_id: None,
            kind: SpanKind::default(),
            start_time,
            end_time: None,
            events: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl Record for Span {
    const KIND: EntityKind = EntityKind::Span;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("context", FieldValue::dump(&self.context)),
            ("parent_id", FieldValue::from(self.parent_id.as_ref())),
            ("kind", FieldValue::label(self.kind)),
            ("start_time", FieldValue::from(self.start_time)),
            ("end_time", FieldValue::from(self.end_time)),
            ("events", FieldValue::dump_list(&self.events)),
            ("links", FieldValue::dump_list(&self.links)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Span(span) => Some(span),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element.validate()?;
        if self.element.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(ModelError::MissingField("name"));
        }
        check_window(self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(flatten)]
    pub element: Element,

    pub service_name: String,

    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Trace {
    pub fn new(
        id: impl Into<String>,
        service_name: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Trace),
            service_name: service_name.into(),
            start_time,
            end_time: None,
        }
    }
}

impl Record for Trace {
    const KIND: EntityKind = EntityKind::Trace;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("service_name", FieldValue::from(&self.service_name)),
            ("start_time", FieldValue::from(self.start_time)),
            ("end_time", FieldValue::from(self.end_time)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Trace(trace) => Some(trace),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element.validate()?;
        check_window(self.start_time, self.end_time)
    }
}

/// A named group of traces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceGroup {
    #[serde(flatten)]
    pub element: Element,

    pub traces_ids: Vec<String>,
}

impl TraceGroup {
    pub fn new<I>(id: impl Into<String>, traces_ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            element: Element::of_kind(id, EntityKind::TraceGroup),
            traces_ids: traces_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl Record for TraceGroup {
    const KIND: EntityKind = EntityKind::TraceGroup;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.push(("traces_ids", FieldValue::from(&self.traces_ids)));
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::TraceGroup(group) => Some(group),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn context() -> SpanContext {
        SpanContext {
            trace_id: "t1".to_string(),
            span_id: "s1".to_string(),
            trace_state: Vec::new(),
        }
    }

    #[test]
    fn test_span_kind_is_lowercase() {
        assert_eq!(serde_json::to_string(&SpanKind::Client).unwrap(), "\"client\"");
        assert_eq!(SpanKind::default(), SpanKind::Internal);
    }

    #[test]
    fn test_span_window_validation() {
        let start = Utc::now();
        let mut span = Span::new("s1", "calculate", context(), start);
        assert!(span.validate().is_ok());

        span.end_time = Some(start - Duration::milliseconds(1));
        assert!(matches!(span.validate(), Err(ModelError::Inconsistent { .. })));
    }

    #[test]
    fn test_span_requires_name() {
        let mut span = Span::new("s1", "calculate", context(), Utc::now());
        span.element.name = None;
        assert_eq!(span.validate(), Err(ModelError::MissingField("name")));
    }

    #[test]
    fn test_trace_window_validation() {
        let start = Utc::now();
        let mut trace = Trace::new("t1", "calculator", start);
        trace.end_time = Some(start + Duration::seconds(1));
        assert!(trace.validate().is_ok());
        trace.end_time = Some(start - Duration::seconds(1));
        assert!(trace.validate().is_err());
    }

    #[test]
    fn test_span_composites_dump_as_json() {
        let span = Span::new("s1", "calculate", context(), Utc::now());
        let fields = span.fields();
        let (_, ctx) = fields.iter().find(|(k, _)| *k == "context").unwrap();
        match ctx {
            FieldValue::Dump(json) => assert_eq!(json["trace_id"], "t1"),
            other => panic!("expected dump, got {:?}", other),
        }
    }
}
