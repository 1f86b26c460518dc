use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::values::{AttributeValue, FieldValue, Fields};

labeled_enum! {
    pub enum ResourceCategory ("resource category") {
        Template => "TEMPLATE",
        Text => "TEXT",
        Image => "IMAGE",
        Audio => "AUDIO",
        Video => "VIDEO",
        Code => "CODE",
        Encoding => "ENCODING",
        File => "FILE",
        Db => "DB",
    }
}

/// Content consumed or produced by units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub element: Element,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ResourceCategory>,

    /// Format of the content (e.g. CSV, PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Serialized content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<AttributeValue>,
}

impl Resource {
    pub fn new(id: impl Into<String>, category: ResourceCategory) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Resource),
            category: Some(category),
            format: None,
            payload: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<AttributeValue>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

impl Record for Resource {
    const KIND: EntityKind = EntityKind::Resource;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("category", FieldValue::opt_label(self.category)),
            ("format", FieldValue::from(self.format.as_ref())),
            ("payload", FieldValue::from(self.payload.as_ref())),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Resource(resource) => Some(resource),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Scalar;

    #[test]
    fn test_resource_payload_accepts_lists() {
        let resource: Resource = serde_json::from_str(
            r#"{"id": "res1", "type": "Resource", "category": "TEXT", "payload": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(resource.category, Some(ResourceCategory::Text));
        assert_eq!(
            resource.payload,
            Some(AttributeValue::List(vec![
                Scalar::String("a".to_string()),
                Scalar::String("b".to_string())
            ]))
        );
    }
}
