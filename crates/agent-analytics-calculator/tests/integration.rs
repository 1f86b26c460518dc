//! Integration tests for the calculators and calculation servers

use agent_analytics_calculator::{
    calculate_traced, CalculationServer, Calculator, CalculatorConfig, DecomposingCalculator,
    DelegatingCalculator, DistributedCalculator, EvalCalculator, OperationKind, PredefinedCalculator,
};
use agent_analytics_span::{AttrValue, ExecutionContext, ExecutionSpan, SpanKind, SpanStatus, Tracer};
use proptest::prelude::*;
use std::net::TcpListener;
use std::sync::Arc;

fn collect<'a>(span: &'a ExecutionSpan, name: &str, out: &mut Vec<&'a ExecutionSpan>) {
    if span.name == name {
        out.push(span);
    }
    for child in &span.children {
        collect(child, name, out);
    }
}

fn spans_named<'a>(root: &'a ExecutionSpan, name: &str) -> Vec<&'a ExecutionSpan> {
    let mut out = Vec::new();
    collect(root, name, &mut out);
    out
}

fn distributed_config() -> CalculatorConfig {
    CalculatorConfig::builder()
        .base_port(0)
        .server_count(2)
        .request_timeout_ms(2000)
        .build()
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[test]
fn test_decomposing_examples() {
    let (tracer, memory) = Tracer::in_memory("test");
    let ctx = ExecutionContext::new(tracer);
    let calculator = DecomposingCalculator::new();

    for (expression, expected) in [
        ("3+[1+2+3/3]*5+6/((2+1)*2-3)", 25.0),
        ("7*[2+18/3]-9+(4*5-2)", 65.0),
    ] {
        let envelope = calculate_traced(&calculator, &ctx, &memory, expression).unwrap();
        assert!(envelope.success, "{} failed: {:?}", expression, envelope.error);
        assert_eq!(envelope.data, Some(expected));
    }
}

#[test]
fn test_decomposition_plan_is_captured_as_workflow() {
    let (tracer, memory) = Tracer::in_memory("test");
    let ctx = ExecutionContext::new(tracer);

    let envelope =
        calculate_traced(&DecomposingCalculator::new(), &ctx, &memory, "7*[2+18/3]-9+(4*5-2)").unwrap();
    let plan = envelope.span_tree.find("plan").unwrap();

    let workflow = plan.events_named("7*[2+18/3]-9+(4*5-2).workflow").next().unwrap();
    assert_eq!(
        workflow.attribute("attr_result_variable"),
        Some(&AttrValue::String("E4".to_string()))
    );
    assert_eq!(plan.events.iter().filter(|e| e.name.ends_with(".workflow_node")).count(), 5);

    let join = plan
        .events
        .iter()
        .filter(|e| e.name.ends_with(".edge_E4.workflow_edge"))
        .last()
        .unwrap();
    assert_eq!(join.attribute("category"), Some(&AttrValue::String("JOIN".to_string())));
}

#[test]
fn test_wrong_calculator_records_quality_metric() {
    let (tracer, memory) = Tracer::in_memory("test");
    let ctx = ExecutionContext::new(tracer);
    let calculator = DecomposingCalculator::new()
        .with_max_iterations(1)
        .with_operator(OperationKind::Addition, Arc::new(PredefinedCalculator::new().with("1+1", 3.0)));

    let envelope = calculate_traced(&calculator, &ctx, &memory, "1+1").unwrap();
    assert_eq!(envelope.data, Some(2.0));

    let validate = envelope.span_tree.find("validate").unwrap();
    let metric = validate.events_named("validation_failure.metric").next().unwrap();
    assert_eq!(metric.attribute("category"), Some(&AttrValue::String("QUALITY".to_string())));
    assert_eq!(metric.attribute("value"), Some(&AttrValue::F64(3.0)));
}

#[test]
fn test_eval_chain_fallback() {
    let ctx = ExecutionContext::new(Tracer::in_memory("test").0);
    let chain = DelegatingCalculator::new().with_calculator(PredefinedCalculator::new().with("two plus two", 4.0));
    let calculator = EvalCalculator::with_chain(chain);

    assert_eq!(calculator.calculate_expression(&ctx, "two plus two").unwrap(), 4.0);
    assert!(calculator.calculate_expression(&ctx, "three plus three").is_err());
}

#[test]
fn test_distributed_servers_join_caller_trace() {
    let (tracer, memory) = Tracer::in_memory("test");
    let mut calculator = DistributedCalculator::start(&distributed_config(), tracer.clone()).unwrap();
    assert_eq!(calculator.servers().len(), 2);

    let ctx = ExecutionContext::new(tracer);
    let envelope = calculate_traced(&calculator, &ctx, &memory, "7*[2+18/3]-9+(4*5-2)").unwrap();
    calculator.stop_servers();

    assert_eq!(envelope.data, Some(65.0));
    assert!(envelope.success);

    let client = spans_named(&envelope.span_tree, "remote.calculate");
    assert_eq!(client.len(), 1);
    assert_eq!(client[0].kind, SpanKind::Client);

    let server = &client[0].children[0];
    assert_eq!(server.name, "server.calculate");
    assert_eq!(server.kind, SpanKind::Server);
    assert_eq!(server.trace_id, envelope.span_tree.trace_id);
    assert_eq!(server.status, SpanStatus::Ok);
}

#[test]
fn test_distributed_round_robin() {
    let (tracer, memory) = Tracer::in_memory("test");
    let calculator = DistributedCalculator::start(&distributed_config(), tracer.clone()).unwrap();
    let endpoints = calculator.endpoints().to_vec();

    let ctx = ExecutionContext::new(tracer);
    let envelope = calculate_traced(&calculator, &ctx, &memory, "[1+1]+[2+2]+[3+3]").unwrap();
    assert_eq!(envelope.data, Some(12.0));

    let used: Vec<String> = spans_named(&envelope.span_tree, "remote.calculate")
        .iter()
        .map(|s| s.attributes.get("endpoint").map(|v| v.to_string()).unwrap_or_default())
        .collect();
    assert_eq!(used, vec![endpoints[0].clone(), endpoints[1].clone(), endpoints[0].clone()]);
    assert_eq!(spans_named(&envelope.span_tree, "server.calculate").len(), 3);
}

#[test]
fn test_unreachable_server_falls_back_locally() {
    let (tracer, memory) = Tracer::in_memory("test");
    let config = CalculatorConfig::builder().request_timeout_ms(1000).build();
    let calculator = DistributedCalculator::with_endpoints(vec![closed_port_url()], &config).unwrap();

    let ctx = ExecutionContext::new(tracer);
    let envelope = calculate_traced(&calculator, &ctx, &memory, "3+[1+2+3/3]*5+6/((2+1)*2-3)").unwrap();

    assert_eq!(envelope.data, Some(25.0));
    assert!(envelope.success);
    let client = spans_named(&envelope.span_tree, "remote.calculate");
    assert_eq!(client[0].events_named("exception").count(), 1);
    assert_eq!(client[0].status, SpanStatus::Unset);
}

#[test]
fn test_server_http_surface() {
    let (tracer, _memory) = Tracer::in_memory("test");
    let server = CalculationServer::start("127.0.0.1", 0, Arc::new(EvalCalculator::new()), tracer).unwrap();
    let client = reqwest::blocking::Client::new();

    let health: serde_json::Value = client
        .get(format!("{}/health", server.url()))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["calculator"], "eval");

    let ok = client
        .post(format!("{}/calculate", server.url()))
        .json(&serde_json::json!({"expression": "6/(1+2)"}))
        .send()
        .unwrap();
    assert_eq!(ok.status(), 200);
    let body: serde_json::Value = ok.json().unwrap();
    assert_eq!(body["result"], 2.0);

    let failed = client
        .post(format!("{}/calculate", server.url()))
        .json(&serde_json::json!({"expression": "6/0"}))
        .send()
        .unwrap();
    assert_eq!(failed.status(), 400);
    let body: serde_json::Value = failed.json().unwrap();
    assert!(body["detail"].as_str().unwrap().contains("6/0"));

    let rejected = client
        .post(format!("{}/calculate", server.url()))
        .header("x-trace-id", "not-a-uuid")
        .json(&serde_json::json!({"expression": "1+1"}))
        .send()
        .unwrap();
    assert_eq!(rejected.status(), 400);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decomposing_matches_eval(a in 1i64..50, b in 1i64..50, c in 1i64..50, d in 1i64..50) {
        let expression = format!("{}+[{}*{}]-({}+{})/{}", a, b, c, d, a, b);
        let ctx = ExecutionContext::new(Tracer::in_memory("prop").0);

        let expected = agent_analytics_calculator::evaluate(&expression).unwrap();
        let actual = DecomposingCalculator::new().calculate_expression(&ctx, &expression).unwrap();
        prop_assert!(agent_analytics_calculator::results_match(expected, actual));
    }
}
