//! Integration tests for the entity model

use agent_analytics_core::*;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

fn sample_entities() -> Vec<Entity> {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    vec![
        Agent::new("agent-1").with_name("planner").with_tag("LLM").into(),
        Organization::new("org-1")
            .with_role(Role::new("role-1").with_instruction("route requests"))
            .into(),
        Workflow::new("wf-1").into(),
        WorkflowNode::new("node-1", "runnable-1").into(),
        WorkflowEdge::new("edge-1")
            .between(["node-1"], ["node-2"])
            .with_category(WorkflowEdgeCategory::Enter)
            .into(),
        Runnable::new("runnable-1").into(),
        Task::new("task-1").with_runnable("runnable-1").into(),
        Issue::new("issue-1", IssueLevel::Critical).affecting("agent-1").into(),
        Metric::new("metric-1", "agent-1", 0.5, "ratio")
            .with_category(MetricCategory::Cost)
            .into(),
        Recommendation::new("rec-1", RecommendationLevel::Major).into(),
        Resource::new("res-1", ResourceCategory::Code)
            .with_payload("fn main() {}")
            .into(),
        Service::new("svc-1", "calculator").with_version("0.3.0").into(),
        Span::new(
            "span-1",
            "calculate",
            SpanContext {
                trace_id: "trace-1".to_string(),
                span_id: "span-1".to_string(),
                trace_state: Vec::new(),
            },
            at,
        )
        .into(),
        Trace::new("trace-1", "calculator", at).into(),
        TraceGroup::new("group-1", ["trace-1"]).into(),
        AiEvent::new("event-1", at).with_status(AiEventStatus::End).into(),
        DataAnnotation::new("ann-1", "task-1", AnnotationType::Pii)
            .with_segment(0, 4)
            .into(),
    ]
}

#[test]
fn test_every_kind_roundtrips_through_json() {
    let entities = sample_entities();
    assert_eq!(entities.len(), EntityKind::ALL.len() - 1);

    for entity in entities {
        let json = serde_json::to_string(&entity).unwrap();
        let parsed: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entity, "roundtrip failed for {}", entity.kind());
        assert!(parsed.validate().is_ok());
    }
}

#[test]
fn test_type_discriminator_matches_kind() {
    for entity in sample_entities() {
        assert_eq!(entity.element().element_type, entity.kind().as_str());
    }
}

#[test]
fn test_field_registry_starts_with_base_fields() {
    for entity in sample_entities() {
        let names: Vec<&str> = entity.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(&names[..2], &["id", "type"]);

        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len(), "duplicate field for {}", entity.kind());
    }
}

#[test]
fn test_store_holds_every_kind() {
    let mut store = InMemoryStore::new();
    for entity in sample_entities() {
        store.store(entity).unwrap();
    }
    // the organization's role is owned, not stored separately
    assert_eq!(store.len(), 17);
    assert!(store.get_all(EntityKind::Role).is_empty());
    assert!(store.get_as::<Service>("svc-1").is_some());
}

proptest! {
    #[test]
    fn prop_confidence_validation(confidence in -2.0f64..3.0) {
        let metric = Metric::new("m", "a", 1.0, "ms").with_confidence(confidence);
        prop_assert_eq!(metric.validate().is_ok(), (0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn prop_segment_validation(start in 0u64..1000, end in 0u64..1000) {
        let annotation = DataAnnotation::new("d", "e", AnnotationType::Hint).with_segment(start, end);
        prop_assert_eq!(annotation.validate().is_ok(), end >= start);
    }

    #[test]
    fn prop_custom_tags_roundtrip(label in "[a-z][a-z0-9_-]{0,12}") {
        let tag = Tag::from(label.clone());
        prop_assert_eq!(String::from(tag), label);
    }
}
