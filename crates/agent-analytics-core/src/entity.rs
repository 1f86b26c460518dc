//! Type-erased entity and its kind discriminator

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agents::Agent;
use crate::annotations::DataAnnotation;
use crate::elements::{Element, Record};
use crate::error::{ModelError, ModelResult};
use crate::events::AiEvent;
use crate::issues::Issue;
use crate::metrics::Metric;
use crate::organizations::{Organization, Role};
use crate::recommendations::Recommendation;
use crate::resources::Resource;
use crate::service::Service;
use crate::tasks::Task;
use crate::traces::{Span, Trace, TraceGroup};
use crate::values::Fields;
use crate::workflows::{Runnable, Workflow, WorkflowEdge, WorkflowNode};

/// Concrete entity types of the taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Agent,
    Organization,
    Role,
    Workflow,
    WorkflowNode,
    WorkflowEdge,
    Runnable,
    Task,
    Issue,
    Metric,
    Recommendation,
    Resource,
    Service,
    Span,
    Trace,
    TraceGroup,
    #[serde(rename = "AIEvent")]
    AiEvent,
    DataAnnotation,
}

impl EntityKind {
    pub const ALL: &'static [EntityKind] = &[
        EntityKind::Agent,
        EntityKind::Organization,
        EntityKind::Role,
        EntityKind::Workflow,
        EntityKind::WorkflowNode,
        EntityKind::WorkflowEdge,
        EntityKind::Runnable,
        EntityKind::Task,
        EntityKind::Issue,
        EntityKind::Metric,
        EntityKind::Recommendation,
        EntityKind::Resource,
        EntityKind::Service,
        EntityKind::Span,
        EntityKind::Trace,
        EntityKind::TraceGroup,
        EntityKind::AiEvent,
        EntityKind::DataAnnotation,
    ];

    /// Type discriminator stored in an element's `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Agent => "Agent",
            EntityKind::Organization => "Organization",
            EntityKind::Role => "Role",
            EntityKind::Workflow => "Workflow",
            EntityKind::WorkflowNode => "WorkflowNode",
            EntityKind::WorkflowEdge => "WorkflowEdge",
            EntityKind::Runnable => "Runnable",
            EntityKind::Task => "Task",
            EntityKind::Issue => "Issue",
            EntityKind::Metric => "Metric",
            EntityKind::Recommendation => "Recommendation",
            EntityKind::Resource => "Resource",
            EntityKind::Service => "Service",
            EntityKind::Span => "Span",
            EntityKind::Trace => "Trace",
            EntityKind::TraceGroup => "TraceGroup",
            EntityKind::AiEvent => "AIEvent",
            EntityKind::DataAnnotation => "DataAnnotation",
        }
    }

    /// Short tag used in span and event names
    pub fn type_tag(&self) -> &'static str {
        match self {
            EntityKind::Agent => "agent",
            EntityKind::Organization => "organization",
            EntityKind::Role => "role",
            EntityKind::Workflow => "workflow",
            EntityKind::WorkflowNode => "workflow_node",
            EntityKind::WorkflowEdge => "workflow_edge",
            EntityKind::Runnable => "runnable",
            EntityKind::Task => "task",
            EntityKind::Issue => "issue",
            EntityKind::Metric => "metric",
            EntityKind::Recommendation => "recommendation",
            EntityKind::Resource => "resource",
            EntityKind::Service => "service",
            EntityKind::Span => "span",
            EntityKind::Trace => "trace",
            EntityKind::TraceGroup => "trace_group",
            EntityKind::AiEvent => "ai_event",
            EntityKind::DataAnnotation => "data_annotation",
        }
    }

    /// Resolve a type discriminator
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any entity of the taxonomy
///
/// Serializes as the wrapped entity; deserialization dispatches on the
/// `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Agent(Agent),
    Organization(Organization),
    Role(Role),
    Workflow(Workflow),
    WorkflowNode(WorkflowNode),
    WorkflowEdge(WorkflowEdge),
    Runnable(Runnable),
    Task(Task),
    Issue(Issue),
    Metric(Metric),
    Recommendation(Recommendation),
    Resource(Resource),
    Service(Service),
    Span(Span),
    Trace(Trace),
    TraceGroup(TraceGroup),
    AiEvent(AiEvent),
    DataAnnotation(DataAnnotation),
}

macro_rules! each_entity {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Entity::Agent($inner) => $body,
            Entity::Organization($inner) => $body,
            Entity::Role($inner) => $body,
            Entity::Workflow($inner) => $body,
            Entity::WorkflowNode($inner) => $body,
            Entity::WorkflowEdge($inner) => $body,
            Entity::Runnable($inner) => $body,
            Entity::Task($inner) => $body,
            Entity::Issue($inner) => $body,
            Entity::Metric($inner) => $body,
            Entity::Recommendation($inner) => $body,
            Entity::Resource($inner) => $body,
            Entity::Service($inner) => $body,
            Entity::Span($inner) => $body,
            Entity::Trace($inner) => $body,
            Entity::TraceGroup($inner) => $body,
            Entity::AiEvent($inner) => $body,
            Entity::DataAnnotation($inner) => $body,
        }
    };
}

macro_rules! entity_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(value)
                }
            }
        )+
    };
}

entity_from!(
    Agent(Agent),
    Organization(Organization),
    Role(Role),
    Workflow(Workflow),
    WorkflowNode(WorkflowNode),
    WorkflowEdge(WorkflowEdge),
    Runnable(Runnable),
    Task(Task),
    Issue(Issue),
    Metric(Metric),
    Recommendation(Recommendation),
    Resource(Resource),
    Service(Service),
    Span(Span),
    Trace(Trace),
    TraceGroup(TraceGroup),
    AiEvent(AiEvent),
    DataAnnotation(DataAnnotation),
);

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Agent(_) => EntityKind::Agent,
            Entity::Organization(_) => EntityKind::Organization,
            Entity::Role(_) => EntityKind::Role,
            Entity::Workflow(_) => EntityKind::Workflow,
            Entity::WorkflowNode(_) => EntityKind::WorkflowNode,
            Entity::WorkflowEdge(_) => EntityKind::WorkflowEdge,
            Entity::Runnable(_) => EntityKind::Runnable,
            Entity::Task(_) => EntityKind::Task,
            Entity::Issue(_) => EntityKind::Issue,
            Entity::Metric(_) => EntityKind::Metric,
            Entity::Recommendation(_) => EntityKind::Recommendation,
            Entity::Resource(_) => EntityKind::Resource,
            Entity::Service(_) => EntityKind::Service,
            Entity::Span(_) => EntityKind::Span,
            Entity::Trace(_) => EntityKind::Trace,
            Entity::TraceGroup(_) => EntityKind::TraceGroup,
            Entity::AiEvent(_) => EntityKind::AiEvent,
            Entity::DataAnnotation(_) => EntityKind::DataAnnotation,
        }
    }

    pub fn element(&self) -> &Element {
        each_entity!(self, inner => inner.element())
    }

    pub fn element_mut(&mut self) -> &mut Element {
        each_entity!(self, inner => inner.element_mut())
    }

    pub fn id(&self) -> &str {
        &self.element().id
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.element().owner_id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        each_entity!(self, inner => inner.display_name())
    }

    /// Field registry of the wrapped entity
    pub fn fields(&self) -> Fields {
        each_entity!(self, inner => inner.fields())
    }

    /// Validate the wrapped entity
    pub fn validate(&self) -> ModelResult<()> {
        each_entity!(self, inner => inner.validate())
    }

    /// Borrow the wrapped entity as a concrete type
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        T::from_entity(self)
    }

    /// Build an entity from its JSON form, dispatching on `type`
    pub fn from_value(value: serde_json::Value) -> ModelResult<Self> {
        let type_name = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(ModelError::MissingField("type"))?;
        let kind = EntityKind::from_type_name(type_name)
            .ok_or_else(|| ModelError::unknown_label("entity type", type_name))?;

        fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> ModelResult<T> {
            serde_json::from_value(value).map_err(|e| ModelError::invalid("entity", e.to_string()))
        }

        let entity = match kind {
            EntityKind::Agent => Entity::Agent(parse(value)?),
            EntityKind::Organization => Entity::Organization(parse(value)?),
            EntityKind::Role => Entity::Role(parse(value)?),
            EntityKind::Workflow => Entity::Workflow(parse(value)?),
            EntityKind::WorkflowNode => Entity::WorkflowNode(parse(value)?),
            EntityKind::WorkflowEdge => Entity::WorkflowEdge(parse(value)?),
            EntityKind::Runnable => Entity::Runnable(parse(value)?),
            EntityKind::Task => Entity::Task(parse(value)?),
            EntityKind::Issue => Entity::Issue(parse(value)?),
            EntityKind::Metric => Entity::Metric(parse(value)?),
            EntityKind::Recommendation => Entity::Recommendation(parse(value)?),
            EntityKind::Resource => Entity::Resource(parse(value)?),
            EntityKind::Service => Entity::Service(parse(value)?),
            EntityKind::Span => Entity::Span(parse(value)?),
            EntityKind::Trace => Entity::Trace(parse(value)?),
            EntityKind::TraceGroup => Entity::TraceGroup(parse(value)?),
            EntityKind::AiEvent => Entity::AiEvent(parse(value)?),
            EntityKind::DataAnnotation => Entity::DataAnnotation(parse(value)?),
        };
        Ok(entity)
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Entity::from_value(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_type_name(kind.as_str()), Some(*kind));
        }
        assert_eq!(EntityKind::from_type_name("Nope"), None);
    }

    #[test]
    fn test_entity_dispatch_on_type() {
        let json = serde_json::json!({
            "id": "i1",
            "type": "Issue",
            "level": "ERROR",
            "affected_element_ids": ["a1"]
        });
        let entity: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(entity.kind(), EntityKind::Issue);
        assert_eq!(entity.id(), "i1");

        let issue = entity.downcast_ref::<Issue>().unwrap();
        assert_eq!(issue.affected_element_ids, vec!["a1".to_string()]);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = serde_json::json!({"id": "x", "type": "Gadget"});
        let err = Entity::from_value(json).unwrap_err();
        assert_eq!(err, ModelError::unknown_label("entity type", "Gadget"));
    }

    #[test]
    fn test_serializes_without_wrapper() {
        let entity = Entity::from(Agent::new("a1"));
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "Agent");
        assert_eq!(json["id"], "a1");
    }
}
