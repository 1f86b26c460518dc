//! Capture of entities as span events.
//!
//! Each capture call appends one event to the context's current span. When
//! no recording span is current, a fallback span named after the caller's
//! source location hosts the event and is ended right after it.

use agent_analytics_core::{
    Agent, AiEvent, DataAnnotation, Entity, FieldValue, IUnit, Issue, Metric, Organization,
    Recommendation, Record, Relation, Resource, Role, Runnable, Service, Span, Task, Trace,
    TraceGroup, Workflow, WorkflowEdge, WorkflowNode,
};
use agent_analytics_span::{ActiveSpan, Attributes, ExecutionContext};
use chrono::Utc;
use std::panic::Location;

use crate::flatten::Flattener;

/// An entity that can be captured as a span event
pub trait Capturable: Record {
    /// Prefix of fields emitted by the remaining-fields pass
    const REMAINDER_PREFIX: &'static str;

    /// Event name: `{name or id}.{type_tag}`
    fn event_name(&self) -> String {
        format!("{}.{}", self.display_name(), Self::KIND.type_tag())
    }

    /// Emit the fields with dedicated keys
    fn structural(&self, _flat: &mut Flattener) {}

    /// Emit events for owned entities before this one
    fn emit_owned(&self, _span: &ActiveSpan) {}
}

/// Flat attribute map of an entity
pub fn flatten<E: Capturable>(entity: &E) -> Attributes {
    let mut flat = Flattener::new(entity.element());
    entity.structural(&mut flat);
    flat.finish(entity.fields(), E::REMAINDER_PREFIX)
}

/// Append the entity's event to `span`
pub fn emit<E: Capturable>(span: &ActiveSpan, entity: &E) {
    entity.emit_owned(span);
    span.add_event(entity.event_name(), flatten(entity));
}

/// Capture an entity on the current span, or on a fallback span named
/// `<file>:<line>.<type_tag>` after the caller.
#[track_caller]
pub fn capture<E: Capturable>(ctx: &ExecutionContext, entity: &E) {
    let location = Location::caller();
    with_recording_span(ctx, location, E::KIND.type_tag(), |span| emit(span, entity));
}

/// Capture a type-erased entity
#[track_caller]
pub fn capture_entity(ctx: &ExecutionContext, entity: &Entity) {
    match entity {
        Entity::Agent(e) => capture(ctx, e),
        Entity::Organization(e) => capture(ctx, e),
        Entity::Role(e) => capture(ctx, e),
        Entity::Workflow(e) => capture(ctx, e),
        Entity::WorkflowNode(e) => capture(ctx, e),
        Entity::WorkflowEdge(e) => capture(ctx, e),
        Entity::Runnable(e) => capture(ctx, e),
        Entity::Task(e) => capture(ctx, e),
        Entity::Issue(e) => capture(ctx, e),
        Entity::Metric(e) => capture(ctx, e),
        Entity::Recommendation(e) => capture(ctx, e),
        Entity::Resource(e) => capture(ctx, e),
        Entity::Service(e) => capture(ctx, e),
        Entity::Span(e) => capture(ctx, e),
        Entity::Trace(e) => capture(ctx, e),
        Entity::TraceGroup(e) => capture(ctx, e),
        Entity::AiEvent(e) => capture(ctx, e),
        Entity::DataAnnotation(e) => capture(ctx, e),
    }
}

/// Fallback span name for a caller location
pub fn fallback_span_name(location: &Location<'_>, suffix: &str) -> String {
    format!("{}:{}.{}", location.file(), location.line(), suffix)
}

/// Run `f` on the current recording span, or on a fresh span that is
/// ended once `f` returns.
pub(crate) fn with_recording_span<R>(
    ctx: &ExecutionContext,
    location: &Location<'_>,
    suffix: &str,
    f: impl FnOnce(&ActiveSpan) -> R,
) -> R {
    if let Some(span) = ctx.current_span().filter(|s| s.is_recording()) {
        return f(span);
    }
    let span = ctx.tracer().start_span(fallback_span_name(location, suffix));
    let result = f(&span);
    span.end();
    result
}

fn put_iunit(flat: &mut Flattener, iunit: &IUnit) {
    flat.put("code_id", iunit.code_id.as_ref());
    flat.put("is_generated", iunit.is_generated);
    flat.put("consumed_resources", iunit.consumed_resources.as_ref());
}

fn put_relation(flat: &mut Flattener, relation: &Relation) {
    flat.put("source_ids", relation.source_ids.as_ref());
    flat.put("destination_ids", relation.destination_ids.as_ref());
    flat.put("weight", relation.weight);
}

fn put_agent(flat: &mut Flattener, agent: &Agent) {
    put_iunit(flat, &agent.iunit);
    flat.put("resource_ids", &agent.resource_ids);
    flat.put("tool_ids", &agent.tool_ids);
    flat.put("skill_ids", &agent.skill_ids);
}

impl Capturable for Resource {
    const REMAINDER_PREFIX: &'static str = "";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("category", FieldValue::opt_label(self.category));
        flat.put("format", self.format.as_ref());
        let payload = self.payload.as_ref().map(|p| {
            serde_json::to_string(p).unwrap_or_else(|_| format!("{:?}", p))
        });
        flat.put("payload", payload);
    }
}

impl Capturable for Role {
    const REMAINDER_PREFIX: &'static str = "role_";

    fn structural(&self, flat: &mut Flattener) {
        put_relation(flat, &self.relation);
        flat.put("instructions", self.instructions.as_ref());
    }
}

impl Capturable for Organization {
    const REMAINDER_PREFIX: &'static str = "organization_";

    fn structural(&self, flat: &mut Flattener) {
        put_agent(flat, &self.agent);
        flat.skip("roles");
        if !self.roles.is_empty() {
            flat.put_as("roles", "role_ids", &self.role_ids());
        }
    }

    fn emit_owned(&self, span: &ActiveSpan) {
        for role in &self.roles {
            emit(span, role);
        }
    }
}

impl Capturable for Agent {
    const REMAINDER_PREFIX: &'static str = "agent_";

    fn structural(&self, flat: &mut Flattener) {
        put_agent(flat, self);
    }
}

impl Capturable for Workflow {
    const REMAINDER_PREFIX: &'static str = "workflow_";
}

impl Capturable for WorkflowNode {
    const REMAINDER_PREFIX: &'static str = "node_";

    fn structural(&self, flat: &mut Flattener) {
        put_iunit(flat, &self.iunit);
        flat.put("task_counter", self.task_counter);
        flat.put("runnable_id", &self.runnable_id);
    }
}

impl Capturable for WorkflowEdge {
    const REMAINDER_PREFIX: &'static str = "edge_";

    fn structural(&self, flat: &mut Flattener) {
        put_relation(flat, &self.relation);
        flat.put("is_conditional", self.is_conditional);
        flat.put("category", FieldValue::label(self.category));
    }
}

impl Capturable for Runnable {
    const REMAINDER_PREFIX: &'static str = "runnable_";

    fn structural(&self, flat: &mut Flattener) {
        put_iunit(flat, &self.iunit);
        flat.put("input_schema", self.input_schema.as_ref());
        flat.put("output_schema", self.output_schema.as_ref());
        flat.put("workflow_id", self.workflow_id.as_ref());
        flat.put("task_counter", self.task_counter);
    }
}

impl Capturable for Task {
    const REMAINDER_PREFIX: &'static str = "task_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("input_resource_ids", &self.input_resource_ids);
        flat.put("input_data", self.input_data.as_ref().map(FieldValue::dump));
        flat.put("output_data", self.output_data.as_ref().map(FieldValue::dump));
        flat.put("output_data_ranking", self.output_data_ranking.as_ref());
        flat.put("created_resource_ids", &self.created_resource_ids);
        flat.put("dependencies_ids", &self.dependencies_ids);
        flat.put("runnable_id", self.runnable_id.as_ref());
        flat.put("expected_start_time", self.expected_start_time);
        flat.put("expected_end_time", self.expected_end_time);
        flat.put("priority", self.priority);
        flat.put("is_generated", self.is_generated);
    }
}

impl Capturable for Service {
    const REMAINDER_PREFIX: &'static str = "service_";

    fn event_name(&self) -> String {
        format!("{}.service", self.service_name())
    }

    fn structural(&self, flat: &mut Flattener) {
        flat.put_as("name", "service.name", self.service_name());
        flat.put_as("namespace", "service.namespace", self.namespace.as_ref());
        flat.put_as("instance_id", "service.instance.id", self.instance_id.as_ref());
        flat.put_as("version", "service.version", self.version.as_ref());
        flat.put_as("environment", "service.environment", self.environment.as_ref());
    }
}

impl Capturable for Recommendation {
    const REMAINDER_PREFIX: &'static str = "recommendation_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("level", FieldValue::label(self.level));
        flat.put("generated_time", self.generated_time.unwrap_or_else(Utc::now));
        flat.put("affected_element_ids", &self.affected_element_ids);
        flat.put("effect", &self.effect);
    }
}

impl Capturable for DataAnnotation {
    const REMAINDER_PREFIX: &'static str = "annotation_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("element_id", &self.element_id);
        flat.put("segment_start", self.segment_start);
        flat.put("segment_end", self.segment_end);
        flat.put("annotation_type", FieldValue::label(self.annotation_type));
    }
}

impl Capturable for Issue {
    const REMAINDER_PREFIX: &'static str = "";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("level", FieldValue::label(self.level));
        flat.put("time", self.time.unwrap_or_else(Utc::now));
        flat.put("affected_element_ids", &self.affected_element_ids);
        flat.put("effect", &self.effect);
    }
}

impl Capturable for AiEvent {
    const REMAINDER_PREFIX: &'static str = "event_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("status", FieldValue::opt_label(self.status));
        flat.put_as("timestamp", "event_timestamp", self.timestamp);
    }
}

impl Capturable for Metric {
    const REMAINDER_PREFIX: &'static str = "metric_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("affected_element_id", &self.affected_element_id);
        flat.put("value", self.value);
        flat.put("units", &self.units);
        flat.put("confidence", self.confidence);
        flat.put("category", FieldValue::label(self.category));
        flat.put("generation_time", self.generation_time);
    }
}

impl Capturable for Span {
    const REMAINDER_PREFIX: &'static str = "span_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("trace_id", &self.context.trace_id);
        flat.put("span_id", &self.context.span_id);
        flat.skip("context");
        flat.put("parent_id", self.parent_id.as_ref());
        flat.put("kind", FieldValue::label(self.kind));
        flat.put("start_time", self.start_time);
        flat.put("end_time", self.end_time);
    }
}

impl Capturable for Trace {
    const REMAINDER_PREFIX: &'static str = "trace_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("service_name", &self.service_name);
        flat.put("start_time", self.start_time);
        flat.put("end_time", self.end_time);
    }
}

impl Capturable for TraceGroup {
    const REMAINDER_PREFIX: &'static str = "trace_group_";

    fn structural(&self, flat: &mut Flattener) {
        flat.put("traces_ids", &self.traces_ids);
    }
}

macro_rules! capture_fns {
    ($($(#[$doc:meta])* $name:ident($ty:ty);)+) => {
        $(
            $(#[$doc])*
            #[track_caller]
            pub fn $name(ctx: &ExecutionContext, entity: &$ty) {
                capture(ctx, entity)
            }
        )+
    };
}

capture_fns! {
    capture_resource(Resource);
    capture_role(Role);
    /// Also captures each owned role on the same span, before the
    /// organization itself.
    capture_organization(Organization);
    capture_agent(Agent);
    capture_workflow(Workflow);
    capture_workflow_node(WorkflowNode);
    capture_workflow_edge(WorkflowEdge);
    capture_runnable(Runnable);
    capture_task(Task);
    capture_service(Service);
    capture_recommendation(Recommendation);
    capture_data_annotation(DataAnnotation);
    /// A missing time is filled with the current time.
    capture_issue(Issue);
    capture_ai_event(AiEvent);
    capture_metric(Metric);
    capture_span(Span);
    capture_trace(Trace);
    capture_trace_group(TraceGroup);
}
