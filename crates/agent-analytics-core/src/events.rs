use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::values::{FieldValue, Fields};

labeled_enum! {
    /// Lifecycle stage of an AI element
    pub enum AiEventStatus ("AI event status") {
        Creation => "CREATION",
        Update => "UPDATE",
        Start => "START",
        End => "END",
        Suspension => "SUSPENSION",
        Abortion => "ABORTION",
        Failure => "FAILURE",
        Delete => "DELETE",
    }
}

/// An event capturing a lifecycle stage of an AI element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiEvent {
    #[serde(flatten)]
    pub element: Element,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AiEventStatus>,
}

impl AiEvent {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::AiEvent),
            timestamp,
            status: None,
        }
    }

    pub fn with_status(mut self, status: AiEventStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl Record for AiEvent {
    const KIND: EntityKind = EntityKind::AiEvent;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("timestamp", FieldValue::from(self.timestamp)),
            ("status", FieldValue::opt_label(self.status)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::AiEvent(event) => Some(event),
            _ => None,
        }
    }
}
