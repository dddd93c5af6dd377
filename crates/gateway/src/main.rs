//! MedQA API Gateway
//!
//! HTTP entry point for the knowledge-graph QA engine.
//! Handles:
//! - Request validation and routing
//! - Semantic analysis of free-text questions
//! - Disclaimer attachment
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use medqa_common::{
    config::AppConfig,
    graph::{self, GraphStore, GuardedGraph},
    kgqa::{KnowledgeCardService, QaEngine},
    metrics,
    semantic::{self, SemanticAnalyzer},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, sync::oneshot};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub graph: GuardedGraph,
    pub engine: QaEngine,
    pub cards: KnowledgeCardService,
    pub analyzer: Arc<dyn SemanticAnalyzer>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn GraphStore>,
        analyzer: Arc<dyn SemanticAnalyzer>,
    ) -> Self {
        let graph = GuardedGraph::new(store, config.query_timeout());
        Self {
            engine: QaEngine::new(graph.clone(), config.engine.recommendation_limit),
            cards: KnowledgeCardService::new(graph.clone()),
            graph,
            analyzer,
            config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting MedQA API Gateway v{}",
        medqa_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!(%addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    // Connect to the knowledge graph
    info!(backend = ?config.graph.backend, "Connecting to graph store...");
    let store = graph::connect(&config.graph).await?;

    let analyzer = semantic::create_analyzer(&config.semantic)?;

    let state = AppState::new(config.clone(), store, analyzer);
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (drain_tx, drain_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = drain_tx.send(());
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = drain_deadline(drain_rx, config.shutdown_timeout()) => {
            tracing::warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Graceful shutdown timed out, dropping open connections"
            );
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.observability.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    // API routes
    let api_routes = Router::new()
        .route("/qa/answer", post(handlers::qa::answer))
        .route("/qa/ask", post(handlers::qa::ask))
        .route("/knowledge/{keyword}", get(handlers::knowledge::get_card));

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Completes `grace` after shutdown has started; never completes before
async fn drain_deadline(started: oneshot::Receiver<()>, grace: Duration) {
    if started.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use medqa_common::errors::{AppError, Result};
    use medqa_common::graph::{
        Direction, Entity, MemoryGraph, NodeType, Relation, RelationTuple, Row,
    };
    use medqa_common::kgqa::SemanticResult;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct FixedAnalyzer(Option<SemanticResult>);

    #[async_trait]
    impl SemanticAnalyzer for FixedAnalyzer {
        async fn analyze(&self, question: &str) -> Result<SemanticResult> {
            match &self.0 {
                Some(result) => Ok(SemanticResult {
                    original_question: question.to_string(),
                    ..result.clone()
                }),
                None => Err(AppError::UpstreamTimeout { timeout_ms: 10 }),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Store whose every call fails like a refused connection
    struct DownGraph;

    fn refused() -> AppError {
        AppError::GraphUnavailable {
            message: "connection refused".to_string(),
        }
    }

    #[async_trait]
    impl GraphStore for DownGraph {
        async fn find_node(&self, _: NodeType, _: &str) -> Result<Option<Entity>> {
            Err(refused())
        }

        async fn run_traversal(
            &self,
            _: &Entity,
            _: Relation,
            _: Direction,
            _: NodeType,
            _: &str,
        ) -> Result<Vec<Row>> {
            Err(refused())
        }

        async fn fetch_properties(&self, _: &Entity, _: &[&str]) -> Result<Vec<Row>> {
            Err(refused())
        }

        async fn all_relations(&self, _: &Entity) -> Result<Vec<RelationTuple>> {
            Err(refused())
        }

        async fn ping(&self) -> Result<()> {
            Err(refused())
        }

        fn backend_name(&self) -> &'static str {
            "down"
        }
    }

    fn cold_graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        let cold = (NodeType::Disease, "感冒");
        g.add_relation(Relation::HasSymptom, cold, (NodeType::Symptom, "咳嗽")).unwrap();
        g.add_relation(Relation::HasSymptom, cold, (NodeType::Symptom, "发热")).unwrap();
        g.add_relation(Relation::CommonDrug, cold, (NodeType::Drug, "布洛芬")).unwrap();
        g
    }

    fn symptom_query() -> SemanticResult {
        let mut result = SemanticResult {
            original_question: "感冒有什么症状？".into(),
            identified_intent: "查询症状".into(),
            ..Default::default()
        };
        result
            .identified_entities
            .insert("Disease".into(), vec!["感冒".into()]);
        result
    }

    fn app_with(store: Arc<dyn GraphStore>, analyzer: Option<SemanticResult>) -> Router {
        let config = Arc::new(AppConfig::default());
        create_router(AppState::new(config, store, Arc::new(FixedAnalyzer(analyzer))))
    }

    fn app() -> Router {
        app_with(Arc::new(cold_graph()), Some(symptom_query()))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let (status, body) = send(app(), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(app(), get_request("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["graph"]["backend"], "memory");
    }

    #[tokio::test]
    async fn test_answer_endpoint() {
        let body = json!({
            "originalQuestion": "感冒有什么症状？",
            "identifiedIntent": "查询症状",
            "identifiedEntities": {"Disease": ["感冒"]}
        });
        let (status, body) = send(app(), post_json("/v1/qa/answer", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "感冒的症状包括：咳嗽、发热。");
        assert_eq!(body["outcome"], "answered");
        assert_eq!(body["disclaimer"], AppConfig::default().answer.disclaimer);
        let recs = body["recommendedQuestions"].as_array().unwrap();
        assert!(!recs.is_empty() && recs.len() <= 3);
    }

    #[tokio::test]
    async fn test_ask_endpoint_uses_analyzer() {
        let (status, body) = send(app(), post_json("/v1/qa/ask", json!({"question": "感冒有什么症状？"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "感冒的症状包括：咳嗽、发热。");
        assert_eq!(body["intent"], "查询症状");
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let (status, body) = send(app(), post_json("/v1/qa/ask", json!({"question": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_ask_upstream_timeout() {
        let app = app_with(Arc::new(cold_graph()), None);
        let (status, body) = send(app, post_json("/v1/qa/ask", json!({"question": "感冒"}))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["retryable"], true);
    }

    #[tokio::test]
    async fn test_knowledge_card_and_404() {
        let (status, body) = send(app(), get_request("/v1/knowledge/%E6%84%9F%E5%86%92")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "感冒");
        assert_eq!(body["relations"]["symptoms"], json!(["咳嗽", "发热"]));

        let (status, _) = send(app(), get_request("/v1/knowledge/%E4%B8%8D%E5%AD%98%E5%9C%A8")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_answer_with_store_down_is_503() {
        let app = app_with(Arc::new(DownGraph), Some(symptom_query()));
        let body = json!({
            "originalQuestion": "感冒有什么症状？",
            "identifiedIntent": "查询症状",
            "identifiedEntities": {"Disease": ["感冒"]}
        });
        let (status, body) = send(app, post_json("/v1/qa/answer", body)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["retryable"], true);
        assert!(body["error"]["message"].is_string());
        assert!(!body.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_ready_with_store_down() {
        let app = app_with(Arc::new(DownGraph), Some(symptom_query()));
        let (status, body) = send(app, get_request("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["graph"]["status"], "down");
    }

    #[tokio::test]
    async fn test_drain_deadline_waits_for_shutdown() {
        let (tx, rx) = oneshot::channel::<()>();
        let idle = tokio::time::timeout(
            Duration::from_millis(50),
            drain_deadline(rx, Duration::from_millis(1)),
        )
        .await;
        assert!(idle.is_err());
        drop(tx);
    }

    #[tokio::test]
    async fn test_drain_deadline_elapses_after_shutdown() {
        let (tx, rx) = oneshot::channel();
        tx.send(()).unwrap();
        let done = tokio::time::timeout(
            Duration::from_secs(1),
            drain_deadline(rx, Duration::from_millis(10)),
        )
        .await;
        assert!(done.is_ok());
    }

    #[tokio::test]
    async fn test_drain_deadline_ignores_dropped_sender() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        let done = tokio::time::timeout(
            Duration::from_millis(50),
            drain_deadline(rx, Duration::from_millis(1)),
        )
        .await;
        assert!(done.is_err());
    }
}
