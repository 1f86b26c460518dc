use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::values::{FieldValue, Fields};

labeled_enum! {
    /// Expected impact of applying a recommendation
    #[derive(Default, PartialOrd, Ord)]
    pub enum RecommendationLevel ("recommendation level") {
        Critical => "CRITICAL",
        Major => "MAJOR",
        #[default]
        Moderate => "MODERATE",
        Minor => "MINOR",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub element: Element,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub affected_element_ids: Vec<String>,

    #[serde(default)]
    pub effect: Vec<String>,

    #[serde(default)]
    pub level: RecommendationLevel,
}

impl Recommendation {
    pub fn new(id: impl Into<String>, level: RecommendationLevel) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Recommendation),
            generated_time: None,
            affected_element_ids: Vec::new(),
            effect: Vec::new(),
            level,
        }
    }

    pub fn affecting(mut self, element_id: impl Into<String>) -> Self {
        self.affected_element_ids.push(element_id.into());
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect.push(effect.into());
        self
    }
}

impl Record for Recommendation {
    const KIND: EntityKind = EntityKind::Recommendation;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("generated_time", FieldValue::from(self.generated_time)),
            ("affected_element_ids", FieldValue::from(&self.affected_element_ids)),
            ("effect", FieldValue::from(&self.effect)),
            ("level", FieldValue::label(self.level)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Recommendation(rec) => Some(rec),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_is_moderate() {
        assert_eq!(RecommendationLevel::default(), RecommendationLevel::Moderate);
        let rec: Recommendation =
            serde_json::from_str(r#"{"id": "r1", "type": "Recommendation", "level": "MINOR"}"#)
                .unwrap();
        assert_eq!(rec.level, RecommendationLevel::Minor);
    }
}
