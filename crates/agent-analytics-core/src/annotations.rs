use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::values::{FieldValue, Fields};

labeled_enum! {
    /// Classification of an annotated data segment
    pub enum AnnotationType ("annotation type") {
        // structural
        RawText => "raw_text",
        StructuredData => "structured_data",
        CodeSnippet => "code_snippet",
        MultimodalData => "multimodal_data",
        // memory and persistence
        ShortTermMemory => "short_term_memory",
        LongTermMemory => "long_term_memory",
        StaticData => "static_data",
        DynamicData => "dynamic_data",
        // semantic and functional
        Hint => "hint",
        Reference => "reference",
        FactualResponse => "factual_response",
        AnalyticalInsight => "analytical_insight",
        CreativeGeneration => "creative_generation",
        CodeGeneration => "code_generation",
        DecisionSupport => "decision_support",
        // privacy
        Pii => "pii",
        Confidential => "confidential",
        Regulated => "regulated",
        Proprietary => "proprietary",
        SensitiveContent => "sensitive_content",
        // provenance
        GeneratedByLlm => "generated_by_llm",
        MirroredFromInput => "mirrored_from_input",
        Paraphrased => "paraphrased",
        Summarization => "summarization",
        HallucinatedContent => "hallucinated_content",
        // error detection
        SpuriousInformation => "spurious_information",
        BiasFlagged => "bias_flagged",
        LowConfidenceResponse => "low_confidence_response",
        InconsistentResponse => "inconsistent_response",
        AmbiguousQuery => "ambiguous_query",
    }
}

/// Annotation of a segment of an element's input or output data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAnnotation {
    #[serde(flatten)]
    pub element: Element,

    /// The annotated element
    pub element_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_start: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_end: Option<u64>,

    pub annotation_type: AnnotationType,
}

impl DataAnnotation {
    pub fn new(
        id: impl Into<String>,
        element_id: impl Into<String>,
        annotation_type: AnnotationType,
    ) -> Self {
        Self {
            element: Element::of_kind(id, EntityKind::DataAnnotation),
            element_id: element_id.into(),
            segment_start: None,
            segment_end: None,
            annotation_type,
        }
    }

    pub fn with_segment(mut self, start: u64, end: u64) -> Self {
        self.segment_start = Some(start);
        self.segment_end = Some(end);
        self
    }
}

impl Record for DataAnnotation {
    const KIND: EntityKind = EntityKind::DataAnnotation;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("element_id", FieldValue::from(&self.element_id)),
            ("segment_start", FieldValue::from(self.segment_start)),
            ("segment_end", FieldValue::from(self.segment_end)),
            ("annotation_type", FieldValue::label(self.annotation_type)),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::DataAnnotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element.validate()?;
        if self.element_id.trim().is_empty() {
            return Err(ModelError::MissingField("element_id"));
        }
        if let (Some(start), Some(end)) = (self.segment_start, self.segment_end) {
            if end < start {
                return Err(ModelError::inconsistent(
                    "segment_start",
                    "segment_end",
                    format!("segment end {} precedes start {}", end, start),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_labels() {
        assert_eq!(AnnotationType::ALL.len(), 30);
        assert_eq!(AnnotationType::Pii.as_str(), "pii");
        assert_eq!(
            "hallucinated_content".parse::<AnnotationType>().unwrap(),
            AnnotationType::HallucinatedContent
        );
    }

    #[test]
    fn test_segment_order() {
        let annotation = DataAnnotation::new("d1", "task-1", AnnotationType::Hint);
        assert!(annotation.clone().with_segment(3, 7).validate().is_ok());
        assert!(annotation.clone().with_segment(5, 5).validate().is_ok());
        assert!(matches!(
            annotation.with_segment(7, 3).validate(),
            Err(ModelError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_segment_fields_keep_full_range() {
        let annotation =
            DataAnnotation::new("d1", "task-1", AnnotationType::Hint).with_segment(7, u64::MAX);
        let fields: std::collections::HashMap<_, _> = annotation.fields().into_iter().collect();

        assert_eq!(fields["segment_start"], FieldValue::Int(7));
        assert_eq!(fields["segment_end"], FieldValue::Str(u64::MAX.to_string()));
    }
}
