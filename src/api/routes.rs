//! API route configuration

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{AuthMiddleware, RateLimiter};
use crate::observability::{HealthStatus, MetricsCollector};

use super::handlers::{self, ApiError, AppState};

/// Build the complete API router with middleware
pub fn build_router(
    app_state: AppState,
    rate_limiter: Arc<RateLimiter>,
    auth: Arc<AuthMiddleware>,
    max_body_bytes: usize,
) -> Router {
    let metrics = app_state.metrics.clone();

    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app_state.clone());

    // Protected API routes (auth + rate limiting + body size limit)
    let api_routes = Router::new()
        .route("/api/v1/knowledge/search", post(handlers::search))
        .route("/api/v1/knowledge/context", post(handlers::build_context))
        .route("/api/v1/knowledge/refresh", post(handlers::refresh))
        .route("/api/v1/knowledge/invalidate", post(handlers::invalidate))
        .route("/api/v1/knowledge/documents", post(handlers::add_documents))
        .route("/api/v1/knowledge/documents/delete", post(handlers::delete_document))
        .route("/api/v1/knowledge/stats/:tenant_id", get(handlers::index_stats))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(metrics.clone(), track_metrics))
                .layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
                .layer(axum::middleware::from_fn_with_state(auth, auth_middleware)),
        )
        .with_state(app_state);

    public_routes.merge(api_routes)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "Knowledge Retrieval",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

fn health_status_code(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health_checker.check_health().await;
    (health_status_code(&health.status), Json(health))
}

/// Liveness probe, always 200 while the process runs
async fn liveness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.health_checker.liveness() { "alive" } else { "dead" };
    (StatusCode::OK, Json(json!({ "status": status })))
}

async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health_checker.check_health().await;
    let code = health_status_code(&health.status);
    let readiness = if code == StatusCode::OK { "ready" } else { "not_ready" };

    (code, Json(json!({ "status": readiness, "details": health })))
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut output = state.metrics.export_prometheus();

    if let Some(circuit_breaker) = &state.circuit_breaker {
        output.push('\n');
        output.push_str(
            &circuit_breaker
                .export_prometheus("knowledge_retrieval_store_circuit_breaker")
                .await,
        );
    }

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], output)
}

async fn track_metrics(
    State(metrics): State<Arc<MetricsCollector>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;

    metrics.record_request(start.elapsed());
    if response.status().is_client_error() || response.status().is_server_error() {
        metrics.record_error();
    }
    response
}

/// Rate limit by forwarded client address, falling back to the peer address
async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client_id = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    match rate_limiter.check(&client_id) {
        Ok(()) => next.run(req).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn auth_middleware(
    State(auth): State<Arc<AuthMiddleware>>,
    req: Request,
    next: Next,
) -> Response {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth.authenticate(header_value) {
        Ok(()) => next.run(req).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}
