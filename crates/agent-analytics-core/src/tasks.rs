use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::values::{FieldValue, Fields};

/// A unit of work executed by a runnable
///
/// Everything is held by reference; tasks carry no scheduling behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub element: Element,

    #[serde(default)]
    pub input_resource_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<serde_json::Value>,

    /// Ranking scores for the produced outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data_ranking: Option<Vec<f64>>,

    #[serde(default)]
    pub created_resource_ids: Vec<String>,

    #[serde(default)]
    pub dependencies_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runnable_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_end_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_generated: Option<bool>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Task),
            input_resource_ids: Vec::new(),
            input_data: None,
            output_data: None,
            output_data_ranking: None,
            created_resource_ids: Vec::new(),
            dependencies_ids: Vec::new(),
            runnable_id: None,
            expected_start_time: None,
            expected_end_time: None,
            priority: None,
            is_generated: None,
        }
    }

    pub fn with_runnable(mut self, runnable_id: impl Into<String>) -> Self {
        self.runnable_id = Some(runnable_id.into());
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies_ids.push(task_id.into());
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.expected_start_time = Some(start);
        self.expected_end_time = Some(end);
        self
    }
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("input_resource_ids", FieldValue::from(&self.input_resource_ids)),
            ("input_data", FieldValue::from(self.input_data.as_ref())),
            ("output_data", FieldValue::from(self.output_data.as_ref())),
            (
                "output_data_ranking",
                FieldValue::from(self.output_data_ranking.as_ref()),
            ),
            ("created_resource_ids", FieldValue::from(&self.created_resource_ids)),
            ("dependencies_ids", FieldValue::from(&self.dependencies_ids)),
            ("runnable_id", FieldValue::from(self.runnable_id.as_ref())),
            ("expected_start_time", FieldValue::from(self.expected_start_time)),
            ("expected_end_time", FieldValue::from(self.expected_end_time)),
            ("priority", FieldValue::from(self.priority)),
            ("is_generated", FieldValue::from(self.is_generated)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Task(task) => Some(task),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element.validate()?;
        if let (Some(start), Some(end)) = (self.expected_start_time, self.expected_end_time) {
            if end < start {
                return Err(ModelError::inconsistent(
                    "expected_start_time",
                    "expected_end_time",
                    "expected end precedes expected start",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_window_validation() {
        let start = Utc::now();
        assert!(Task::new("t1")
            .with_window(start, start + Duration::seconds(5))
            .validate()
            .is_ok());

        let err = Task::new("t1")
            .with_window(start, start - Duration::seconds(5))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ModelError::Inconsistent { .. }));
    }

    #[test]
    fn test_task_fields_expose_json_payloads() {
        let mut task = Task::new("t1");
        task.input_data = Some(serde_json::json!({"expression": "2+2"}));
        let fields = task.fields();
        let (_, input) = fields.iter().find(|(k, _)| *k == "input_data").unwrap();
        assert!(matches!(input, FieldValue::Map(_)));
    }
}
