use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::values::{FieldValue, Fields};

labeled_enum! {
    #[derive(Default)]
    pub enum MetricCategory ("metric category") {
        Performance => "PERFORMANCE",
        Quality => "QUALITY",
        Cost => "COST",
        HumanInTheLoop => "HUMAN_IN_THE_LOOP",
        Security => "SECURITY",
        #[default]
        Info => "INFO",
        Debug => "DEBUG",
    }
}

/// A measured value tied to exactly one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(flatten)]
    pub element: Element,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<DateTime<Utc>>,

    pub affected_element_id: String,

    pub value: f64,

    pub units: String,

    /// Confidence in the value, within [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub category: MetricCategory,
}

impl Metric {
    pub fn new(
        id: impl Into<String>,
        affected_element_id: impl Into<String>,
        value: f64,
        units: impl Into<String>,
    ) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::Metric),
            generation_time: None,
            affected_element_id: affected_element_id.into(),
            value,
            units: units.into(),
            confidence: None,
            category: MetricCategory::default(),
        }
    }

    pub fn with_category(mut self, category: MetricCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl Record for Metric {
    const KIND: EntityKind = EntityKind::Metric;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("generation_time", FieldValue::from(self.generation_time)),
            ("affected_element_id", FieldValue::from(&self.affected_element_id)),
            ("value", FieldValue::from(self.value)),
            ("units", FieldValue::from(&self.units)),
            ("confidence", FieldValue::from(self.confidence)),
            ("category", FieldValue::label(self.category)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Metric(metric) => Some(metric),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element.validate()?;
        if self.affected_element_id.trim().is_empty() {
            return Err(ModelError::MissingField("affected_element_id"));
        }
        if !self.value.is_finite() {
            return Err(ModelError::invalid("value", "must be a finite number"));
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ModelError::invalid(
                    "confidence",
                    format!("{} is outside [0, 1]", confidence),
                ));
            }
        }
        Ok(())
    }
}
