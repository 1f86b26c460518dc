//! Intelligent units and relations
//!
//! `IUnit` models the non-deterministic building blocks of an agentic system
//! (agents, nodes, runnables); `Relation` links units to each other (roles,
//! edges). Neither is an entity on its own; concrete types embed them.

use serde::{Deserialize, Serialize};

use crate::elements::Element;
use crate::values::{FieldValue, Fields};

/// Base for elements reflecting a non-deterministic unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IUnit {
    #[serde(flatten)]
    pub element: Element,

    /// Code identifier of the unit (e.g. `module.class.method`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_id: Option<String>,

    /// Whether the unit was generated dynamically
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_generated: Option<bool>,

    /// Identifiers of the resources consumed by the unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_resources: Option<Vec<String>>,
}

impl IUnit {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            code_id: None,
            is_generated: None,
            consumed_resources: None,
        }
    }

    pub fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("code_id", FieldValue::from(self.code_id.as_ref())),
            ("is_generated", FieldValue::from(self.is_generated)),
            (
                "consumed_resources",
                FieldValue::from(self.consumed_resources.as_ref()),
            ),
        ]);
        fields
    }
}

/// Base for elements connecting units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(flatten)]
    pub element: Element,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

impl Relation {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            source_ids: None,
            destination_ids: None,
            weight: None,
        }
    }

    pub fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("source_ids", FieldValue::from(self.source_ids.as_ref())),
            (
                "destination_ids",
                FieldValue::from(self.destination_ids.as_ref()),
            ),
            ("weight", FieldValue::from(self.weight)),
        ]);
        fields
    }
}
