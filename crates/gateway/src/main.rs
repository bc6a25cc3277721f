//! Leadbook API Gateway
//!
//! The HTTP entry point of the lead dashboard.
//! Handles:
//! - CSV imports
//! - Category and lead queries, lead updates
//! - Server-sent change events
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use leadbook_common::{config::AppConfig, db::DbPool, metrics, EventHub, Repository};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repository: Repository,
    pub events: EventHub,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DbPool, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            events: EventHub::new(config.server.event_channel_capacity),
            repository: Repository::new(db.clone()),
            config,
            db,
            metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);

    info!("Starting Leadbook API Gateway v{}", leadbook_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
                metrics::LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_import_duration_seconds", metrics::METRICS_PREFIX)),
                metrics::IMPORT_BUCKETS,
            )?
            .install_recorder()?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.create_schema {
        db.create_schema().await?;
    }

    let state = AppState::new(config.clone(), db, metrics_handle);

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
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

    let upload_limit = DefaultBodyLimit::max(state.config.import.max_upload_bytes);

    // API routes
    let api_routes = Router::new()
        // Imports
        .route("/imports", post(handlers::imports::import_csv).layer(upload_limit))

        // Categories
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/{id}", delete(handlers::categories::delete_category))
        .route("/categories/{id}/leads", get(handlers::categories::list_category_leads))
        .route("/categories/{id}/analytics", get(handlers::categories::category_analytics))

        // Leads
        .route("/leads/assign", post(handlers::leads::assign_leads))
        .route(
            "/leads/{id}",
            get(handlers::leads::get_lead)
                .patch(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )

        // Change feed
        .route("/events", get(handlers::events::stream_events));

    // Compose the app
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use leadbook_common::LeadEvent;
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult};
    use tower::ServiceExt;

    fn state_with(db: DatabaseConnection) -> AppState {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        AppState::new(
            Arc::new(AppConfig::default()),
            DbPool::from_connection(db),
            Some(handle),
        )
    }

    /// State backed by a mock database with nothing queued: every statement fails
    fn test_state() -> AppState {
        state_with(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn rows_affected(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_database_down() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["database"]["status"], "down");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_csv_is_rejected() {
        let app = create_router(test_state());
        let request = Request::post("/v1/imports")
            .header("content-type", "text/csv")
            .body(Body::from("name,query\n\"A,Q\n"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "MALFORMED_CSV");
    }

    #[tokio::test]
    async fn test_file_without_valid_rows() {
        let app = create_router(test_state());
        let request = Request::post("/v1/imports")
            .body(Body::from("name,phone\nA,555\n"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_store_failures_are_reported_per_category() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([
                DbErr::Custom("connection reset".into()),
                DbErr::Custom("connection reset".into()),
            ])
            .into_connection();
        let app = create_router(state_with(db));
        let request = Request::post("/v1/imports")
            .body(Body::from("name,query\nA,Dentists\nB,Plumbers\n"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["total_leads_imported"], 0);
        assert_eq!(report["errors"].as_array().map(Vec::len), Some(2));
        assert_eq!(report["errors"][0]["stage"], "lookup_category");
    }

    #[tokio::test]
    async fn test_unknown_status_param_rejected() {
        let app = create_router(test_state());
        let request = Request::post("/v1/imports?status=New")
            .body(Body::from("name,query\nA,Q\n"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blank_explicit_category_rejected() {
        let app = create_router(test_state());
        let request = Request::post("/v1/imports?category=%20%20")
            .body(Body::from("name\nA\n"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lead_update_validation() {
        let app = create_router(test_state());
        let request = Request::patch("/v1/leads/1")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status":"Maybe"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_empty_lead_update_rejected() {
        let app = create_router(test_state());
        let request = Request::patch("/v1/leads/1")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_lead_publishes_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([rows_affected(1)])
            .into_connection();
        let state = state_with(db);
        let mut events = state.events.subscribe();
        let app = create_router(state);

        let response = app
            .oneshot(Request::delete("/v1/leads/7").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(events.recv().await.unwrap(), LeadEvent::LeadDeleted { lead_id: 7 });
    }

    #[tokio::test]
    async fn test_delete_missing_lead() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([rows_affected(0)])
            .into_connection();
        let app = create_router(state_with(db));

        let response = app
            .oneshot(Request::delete("/v1/leads/7").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "LEAD_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_assign_leads() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([rows_affected(2)])
            .into_connection();
        let state = state_with(db);
        let mut events = state.events.subscribe();
        let app = create_router(state);

        let user = "0192a3b4-0000-7000-8000-000000000001";
        let request = Request::post("/v1/leads/assign")
            .header("content-type", "application/json")
            .body(Body::from(format!(
                r#"{{"lead_ids":[3,1,3],"assigned_to":"{}"}}"#,
                user
            )))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["updated"], 2);
        match events.recv().await.unwrap() {
            LeadEvent::LeadsAssigned { lead_ids, assigned_to } => {
                assert_eq!(lead_ids, vec![1, 3]);
                assert_eq!(assigned_to.map(|id| id.to_string()).as_deref(), Some(user));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_assign_without_leads_rejected() {
        let app = create_router(test_state());
        let request = Request::post("/v1/leads/assign")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"lead_ids":[],"assigned_to":null}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "lead_ids");
    }
}
