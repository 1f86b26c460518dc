//! Workflows, their nodes and edges, and runnables

use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::iunits::{IUnit, Relation};
use crate::values::{FieldValue, Fields};

labeled_enum! {
    /// Control-flow role of a workflow edge
    #[derive(Default)]
    pub enum WorkflowEdgeCategory ("workflow edge category") {
        Enter => "ENTER",
        Exit => "EXIT",
        Join => "JOIN",
        Fork => "FORK",
        #[default]
        Sequential => "SEQUENTIAL",
    }
}

/// A named container of nodes and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(flatten)]
    pub element: Element,
}

impl Workflow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Workflow),
        }
    }
}

impl Record for Workflow {
    const KIND: EntityKind = EntityKind::Workflow;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        self.element.fields()
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Workflow(workflow) => Some(workflow),
            _ => None,
        }
    }
}

/// A node of a workflow, bound to the runnable it executes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    #[serde(flatten)]
    pub iunit: IUnit,

    /// Number of tasks executed through this node
    #[serde(default)]
    pub task_counter: i64,

    pub runnable_id: String,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, runnable_id: impl Into<String>) -> Self {
        Self {
            iunit: IUnit::new(Element::of_kind(id, EntityKind::WorkflowNode)),
            task_counter: 0,
            runnable_id: runnable_id.into(),
        }
    }
}

impl Record for WorkflowNode {
    const KIND: EntityKind = EntityKind::WorkflowNode;

    fn element(&self) -> &Element {
        &self.iunit.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.iunit.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.iunit.fields();
        fields.extend([
            ("task_counter", FieldValue::from(self.task_counter)),
            ("runnable_id", FieldValue::from(&self.runnable_id)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::WorkflowNode(node) => Some(node),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element().validate()?;
        if self.runnable_id.trim().is_empty() {
            return Err(ModelError::MissingField("runnable_id"));
        }
        Ok(())
    }
}

/// A control-flow link between workflow nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    #[serde(flatten)]
    pub relation: Relation,

    #[serde(default)]
    pub is_conditional: bool,

    #[serde(default)]
    pub category: WorkflowEdgeCategory,
}

impl WorkflowEdge {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            relation: Relation::new(Element::of_kind(id, EntityKind::WorkflowEdge)),
            is_conditional: false,
            category: WorkflowEdgeCategory::default(),
        }
    }

    /// Set the source and destination node identifiers
    pub fn between<S, D>(mut self, sources: S, destinations: D) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        self.relation.source_ids = Some(sources.into_iter().map(Into::into).collect());
        self.relation.destination_ids = Some(destinations.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_category(mut self, category: WorkflowEdgeCategory) -> Self {
        self.category = category;
        self
    }

    pub fn conditional(mut self) -> Self {
        self.is_conditional = true;
        self
    }
}

impl Record for WorkflowEdge {
    const KIND: EntityKind = EntityKind::WorkflowEdge;

    fn element(&self) -> &Element {
        &self.relation.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.relation.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.relation.fields();
        fields.extend([
            ("is_conditional", FieldValue::from(self.is_conditional)),
            ("category", FieldValue::label(self.category)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::WorkflowEdge(edge) => Some(edge),
            _ => None,
        }
    }
}

/// An executable unit with JSON-Schema described input and output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runnable {
    #[serde(flatten)]
    pub iunit: IUnit,

    /// Stringified JSON Schema of the input parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<String>,

    /// Stringified JSON Schema of the output parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    #[serde(default)]
    pub task_counter: i64,
}

impl Runnable {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            iunit: IUnit::new(Element::of_kind(id, EntityKind::Runnable)),
            input_schema: None,
            output_schema: None,
            workflow_id: None,
            task_counter: 0,
        }
    }
}

impl Record for Runnable {
    const KIND: EntityKind = EntityKind::Runnable;

    fn element(&self) -> &Element {
        &self.iunit.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.iunit.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.iunit.fields();
        fields.extend([
            ("input_schema", FieldValue::from(self.input_schema.as_ref())),
            ("output_schema", FieldValue::from(self.output_schema.as_ref())),
            ("workflow_id", FieldValue::from(self.workflow_id.as_ref())),
            ("task_counter", FieldValue::from(self.task_counter)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Runnable(runnable) => Some(runnable),
            _ => None,
        }
    }
}
