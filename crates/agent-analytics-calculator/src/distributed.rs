//! Calculation servers and the calculator that delegates to them.
//!
//! Each [`CalculationServer`] hosts a calculator behind `POST /calculate`
//! on its own runtime thread. [`RemoteCalculator`] spreads requests over
//! server endpoints round-robin and propagates the caller's span through
//! `x-trace-id` / `x-parent-span-id`, so server spans join the caller's
//! trace. [`DistributedCalculator`] sends square-bracket groups to the
//! servers and calculates everything else locally.

use agent_analytics_sdk::record_exception;
use agent_analytics_span::{
    ExecutionContext, RemoteParent, SpanKind, SpanStatus, TraceContextExtractor, Tracer,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use crate::calculator::{unable, Calculator};
use crate::config::CalculatorConfig;
use crate::decomposing::{DecomposingCalculator, OperationKind};
use crate::error::{CalcError, Result};

/// Body of `POST /calculate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

/// Response of `POST /calculate`: `result` on success, `detail` otherwise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CalculateResponse {
    pub fn result(result: f64) -> Self {
        Self {
            result: Some(result),
            detail: None,
        }
    }

    pub fn detail(detail: impl Into<String>) -> Self {
        Self {
            result: None,
            detail: Some(detail.into()),
        }
    }
}

/// State shared by the server routes
pub struct ServerState {
    calculator: Arc<dyn Calculator>,
    tracer: Tracer,
    start_time: Instant,
}

impl ServerState {
    pub fn new(calculator: Arc<dyn Calculator>, tracer: Tracer) -> Self {
        Self {
            calculator,
            tracer,
            start_time: Instant::now(),
        }
    }

    /// Calculate under a server span, continuing the caller's trace when
    /// one was propagated.
    pub fn calculate(&self, parent: Option<RemoteParent>, expression: &str) -> Result<f64> {
        let span = match parent {
            Some(parent) => self.tracer.start_remote_child(&parent, "server.calculate"),
            None => {
                let span = self.tracer.start_span("server.calculate");
                span.set_kind(SpanKind::Server);
                span
            }
        };
        span.set_attribute("expression", expression);
        let ctx = ExecutionContext::with_span(self.tracer.clone(), span.clone());

        let result = self.calculator.calculate_expression(&ctx, expression);
        match &result {
            Ok(value) => {
                span.set_attribute("result", *value);
                span.set_status(SpanStatus::Ok, None);
            }
            Err(e) => record_exception(&ctx, e),
        }
        span.end();
        result
    }
}

/// Build the server router
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn calculate_handler(
    State(state): State<Arc<ServerState>>,
    TraceContextExtractor(parent): TraceContextExtractor,
    Json(request): Json<CalculateRequest>,
) -> Response {
    let expression = request.expression;
    tracing::info!(expression = %expression, "calculation requested");

    let outcome = tokio::task::spawn_blocking(move || state.calculate(parent, &expression)).await;
    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, Json(CalculateResponse::result(result))).into_response(),
        Ok(Err(e)) => (StatusCode::BAD_REQUEST, Json(CalculateResponse::detail(e.to_string()))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CalculateResponse::detail(e.to_string())),
        )
            .into_response(),
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "calculator": state.calculator.name(),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

/// HTTP server hosting a calculator on a dedicated runtime thread.
///
/// Stops when [`stop`](Self::stop) is called or the value is dropped.
pub struct CalculationServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CalculationServer {
    /// Bind `host:port` and start serving. Port 0 picks a free port.
    pub fn start(host: &str, port: u16, calculator: Arc<dyn Calculator>, tracer: Tracer) -> Result<Self> {
        let listener = TcpListener::bind((host, port))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let router = create_router(Arc::new(ServerState::new(calculator, tracer)));
        let (shutdown, signal) = oneshot::channel::<()>();

        let handle = std::thread::Builder::new()
            .name(format!("calc-server-{}", addr.port()))
            .spawn(move || serve(listener, router, signal))?;

        tracing::info!(%addr, "calculation server started");
        Ok(Self {
            addr,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal shutdown and wait for the server thread
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(addr = %self.addr, "calculation server thread panicked");
            }
            tracing::info!(addr = %self.addr, "calculation server stopped");
        }
    }
}

impl Drop for CalculationServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CalculationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculationServer")
            .field("addr", &self.addr)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

fn serve(listener: TcpListener, router: Router, signal: oneshot::Receiver<()>) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to build server runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match tokio::net::TcpListener::from_std(listener) {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "failed to register listener");
                return;
            }
        };
        let shutdown = async {
            let _ = signal.await;
        };
        if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
            tracing::error!(error = %e, "calculation server failed");
        }
    });
}

/// Calculator that sends expressions to calculation servers
pub struct RemoteCalculator {
    client: reqwest::blocking::Client,
    endpoints: Vec<String>,
    next: AtomicUsize,
}

impl RemoteCalculator {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            client,
            endpoints,
            next: AtomicUsize::new(0),
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Next endpoint in round-robin order
    pub fn next_endpoint(&self) -> Option<&str> {
        if self.endpoints.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        Some(self.endpoints[index].as_str())
    }

    fn send(&self, endpoint: &str, parent: Option<RemoteParent>, expression: &str) -> Result<f64> {
        let mut request = self
            .client
            .post(format!("{}/calculate", endpoint))
            .json(&CalculateRequest {
                expression: expression.to_string(),
            });
        if let Some(parent) = parent {
            for (name, value) in parent.headers() {
                request = request.header(name, value);
            }
        }

        let response = request.send()?;
        let status = response.status();
        let body: CalculateResponse = response.json()?;
        match (status.is_success(), body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(CalcError::Server(
                body.detail.unwrap_or_else(|| status.to_string()),
            )),
        }
    }
}

impl std::fmt::Debug for RemoteCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCalculator")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Calculator for RemoteCalculator {
    fn name(&self) -> &str {
        "remote"
    }

    fn calculate_expression(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        let Some(endpoint) = self.next_endpoint() else {
            return Err(unable(self.name(), expression));
        };

        let scope = ctx.child("remote.calculate");
        let span = scope.span();
        span.set_kind(SpanKind::Client);
        span.set_attribute("endpoint", endpoint);
        span.set_attribute("expression", expression);

        match self.send(endpoint, scope.remote_parent(), expression) {
            Ok(result) => {
                span.set_attribute("result", result);
                Ok(result)
            }
            Err(e) => {
                // The caller may recover locally; keep the span status unset.
                span.record_exception(&e);
                tracing::warn!(endpoint, expression, error = %e, "remote calculation failed");
                Err(e)
            }
        }
    }
}

/// Decomposing calculator whose square-bracket groups run on calculation
/// servers
#[derive(Debug)]
pub struct DistributedCalculator {
    calculator: DecomposingCalculator,
    remote: Arc<RemoteCalculator>,
    servers: Vec<CalculationServer>,
}

impl DistributedCalculator {
    /// Start `config.server_count` servers and route to them.
    ///
    /// Servers that fail to bind are skipped; with none running, every
    /// group is calculated locally.
    pub fn start(config: &CalculatorConfig, tracer: Tracer) -> Result<Self> {
        let mut servers = Vec::new();
        for port in config.ports() {
            let hosted: Arc<dyn Calculator> =
                Arc::new(DecomposingCalculator::new().with_max_iterations(config.max_iterations));
            match CalculationServer::start(&config.host, port, hosted, tracer.clone()) {
                Ok(server) => servers.push(server),
                Err(e) => tracing::warn!(host = %config.host, port, error = %e, "skipping calculation server"),
            }
        }
        let endpoints = servers.iter().map(CalculationServer::url).collect();
        let mut calculator = Self::with_endpoints(endpoints, config)?;
        calculator.servers = servers;
        Ok(calculator)
    }

    /// Route to already running servers
    pub fn with_endpoints(endpoints: Vec<String>, config: &CalculatorConfig) -> Result<Self> {
        let remote = Arc::new(RemoteCalculator::new(endpoints, config.request_timeout())?);
        let calculator = DecomposingCalculator::new()
            .with_max_iterations(config.max_iterations)
            .with_operator(OperationKind::SquareBrackets, remote.clone());
        Ok(Self {
            calculator,
            remote,
            servers: Vec::new(),
        })
    }

    pub fn servers(&self) -> &[CalculationServer] {
        &self.servers
    }

    pub fn endpoints(&self) -> &[String] {
        self.remote.endpoints()
    }

    pub fn stop_servers(&mut self) {
        for server in &mut self.servers {
            server.stop();
        }
        self.servers.clear();
    }
}

impl Calculator for DistributedCalculator {
    fn name(&self) -> &str {
        "distributed"
    }

    fn calculate_expression(&self, ctx: &ExecutionContext, expression: &str) -> Result<f64> {
        self.calculator.calculate_expression(ctx, expression)
    }

    fn is_valid_expression(&self, ctx: &ExecutionContext, expression: &str) -> bool {
        self.calculator.is_valid_expression(ctx, expression)
    }

    fn is_valid_result(&self, ctx: &ExecutionContext, expression: &str, result: f64) -> bool {
        self.calculator.is_valid_result(ctx, expression, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalCalculator;

    #[test]
    fn test_round_robin_endpoints() {
        let remote = RemoteCalculator::new(
            vec!["http://a".to_string(), "http://b".to_string()],
            Duration::from_secs(1),
        )
        .unwrap();

        let picked: Vec<_> = (0..5).filter_map(|_| remote.next_endpoint().map(str::to_string)).collect();
        assert_eq!(picked, vec!["http://a", "http://b", "http://a", "http://b", "http://a"]);
    }

    #[test]
    fn test_no_endpoints_is_unable() {
        let remote = RemoteCalculator::new(Vec::new(), Duration::from_secs(1)).unwrap();
        let ctx = ExecutionContext::new(Tracer::in_memory("test").0);
        assert!(matches!(
            remote.calculate_expression(&ctx, "1+1"),
            Err(CalcError::Unable(_))
        ));
    }

    #[test]
    fn test_server_state_continues_remote_trace() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let state = ServerState::new(Arc::new(EvalCalculator::new()), tracer.clone());
        let client = tracer.start_span("client");
        let parent = RemoteParent {
            trace_id: client.trace_id(),
            parent_span_id: client.span_id(),
        };

        assert_eq!(state.calculate(Some(parent), "2*[3+1]").unwrap(), 8.0);
        let spans = exporter.take();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "server.calculate");
        assert_eq!(spans[0].kind, SpanKind::Server);
        assert_eq!(spans[0].parent_span_id, Some(client.span_id()));
        assert_eq!(spans[0].status, SpanStatus::Ok);
    }

    #[test]
    fn test_server_state_records_failure() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let state = ServerState::new(Arc::new(EvalCalculator::new()), tracer);

        assert!(state.calculate(None, "1/0").is_err());
        let spans = exporter.take();
        assert_eq!(spans[0].status, SpanStatus::Error);
        assert_eq!(spans[0].events_named("exception").count(), 1);
    }

    #[tokio::test]
    async fn test_router_serves_calculations() {
        let (tracer, exporter) = Tracer::in_memory("test");
        let router = create_router(Arc::new(ServerState::new(Arc::new(EvalCalculator::new()), tracer)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        let response = reqwest::Client::new()
            .post(format!("http://{}/calculate", addr))
            .json(&CalculateRequest {
                expression: "1+[2*3]".to_string(),
            })
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: CalculateResponse = response.json().await.unwrap();
        assert_eq!(body.result, Some(7.0));
        assert_eq!(exporter.take()[0].name, "server.calculate");
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(CalculateResponse::result(4.0)).unwrap();
        assert_eq!(ok, serde_json::json!({"result": 4.0}));
        let err = serde_json::to_value(CalculateResponse::detail("bad")).unwrap();
        assert_eq!(err, serde_json::json!({"detail": "bad"}));
    }
}
