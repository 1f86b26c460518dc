//! Integration tests for span collection and tree assembly

use agent_analytics_span::*;
use std::thread;

#[test]
fn test_context_tree_envelope_flow() {
    let (tracer, exporter) = Tracer::in_memory("calculator");
    let ctx = ExecutionContext::new(tracer);

    {
        let root = ctx.child("calculate");
        {
            let plan = root.child("plan");
            plan.span().add_event("wf.workflow", Attributes::new());
        }
        let step = root.child("E0");
        step.span().set_status(SpanStatus::Ok, None);
    }

    let mut tree = SpanTreeBuilder::new();
    tree.extend(exporter.take());
    let root = tree.finalize_root().unwrap();

    assert_eq!(root.name, "calculate");
    assert_eq!(root.span_count(), 3);
    assert_eq!(root.find("plan").unwrap().events.len(), 1);

    let envelope = ExecutionEnvelope::success(4.0, root);
    assert!(envelope.success);
}

#[test]
fn test_span_handles_are_shared_across_threads() {
    let (tracer, exporter) = Tracer::in_memory("calculator");
    let span = tracer.start_span("parallel");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let span = span.clone();
            thread::spawn(move || {
                let mut attributes = Attributes::new();
                attributes.insert("worker".to_string(), AttrValue::I64(i));
                span.add_event("tick", attributes);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    span.end();

    let spans = exporter.take();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].events_named("tick").count(), 4);
}

#[test]
fn test_remote_child_continues_trace() {
    let (tracer, exporter) = Tracer::in_memory("calculator");
    let ctx = ExecutionContext::new(tracer.clone());
    let client = ctx.child("client");
    let parent = client.remote_parent().unwrap();

    let server = tracer.start_remote_child(&parent, "server.calculate");
    server.end();
    drop(client);

    let mut tree = SpanTreeBuilder::new();
    tree.extend(exporter.take());
    let roots = tree.finalize();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].children[0].name, "server.calculate");
    assert_eq!(roots[0].children[0].kind, SpanKind::Server);
}
