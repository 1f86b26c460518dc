use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::values::{FieldValue, Fields};

labeled_enum! {
    /// Severity of a detected issue
    #[derive(Default, PartialOrd, Ord)]
    pub enum IssueLevel ("issue level") {
        Critical => "CRITICAL",
        Error => "ERROR",
        #[default]
        Warning => "WARNING",
        Info => "INFO",
        Debug => "DEBUG",
    }
}

/// A problem detected on one or more elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(flatten)]
    pub element: Element,

    /// Detection time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub affected_element_ids: Vec<String>,

    /// Effect of the issue on the affected elements
    #[serde(default)]
    pub effect: Vec<String>,

    #[serde(default)]
    pub level: IssueLevel,
}

impl Issue {
    pub fn new(id: impl Into<String>, level: IssueLevel) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Issue),
            time: None,
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

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

impl Record for Issue {
    const KIND: EntityKind = EntityKind::Issue;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("time", FieldValue::from(self.time)),
            ("affected_element_ids", FieldValue::from(&self.affected_element_ids)),
            ("effect", FieldValue::from(&self.effect)),
            ("level", FieldValue::label(self.level)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Issue(issue) => Some(issue),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_defaults_to_warning() {
        let issue: Issue = serde_json::from_str(r#"{"id": "i1", "type": "Issue"}"#).unwrap();
        assert_eq!(issue.level, IssueLevel::Warning);
        assert!(issue.time.is_none());
    }

    #[test]
    fn test_level_order_is_most_severe_first() {
        assert!(IssueLevel::Critical < IssueLevel::Debug);
    }

    #[test]
    fn test_time_accepts_rfc3339() {
        let issue: Issue = serde_json::from_str(
            r#"{"id": "i1", "type": "Issue", "time": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(issue.time.unwrap().to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }
}
