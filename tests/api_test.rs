//! HTTP API tests driving the router in process

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use knowledge_retrieval::{
    api::{build_router, AppState},
    config::{RagConfig, RetrievalConfig},
    error::StoreError,
    knowledge::{IndexManager, KnowledgeDocument, RagAssembler},
    middleware::{AuthConfig, AuthMiddleware, RateLimitConfig, RateLimiter},
    observability::{HealthChecker, MetricsCollector},
    store::{DocumentStore, InMemoryDocumentStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TOKEN: &str = "test-token-0123456789";

struct OfflineStore;

#[async_trait]
impl DocumentStore for OfflineStore {
    async fn load_active_documents(
        &self,
        _tenant_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

fn seeded_store() -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.upsert_article(
        "acme",
        KnowledgeDocument::new(
            1,
            "Return Policy",
            "Items may be returned within 30 days for a full refund.",
        )
        .with_category("returns"),
    );
    store.upsert_article(
        "acme",
        KnowledgeDocument::new(2, "Shipping carriers", "We ship with UPS and FedEx."),
    );
    store
}

fn test_app(store: Arc<dyn DocumentStore>, max_requests: usize) -> Router {
    let metrics = Arc::new(MetricsCollector::new());
    let index = Arc::new(
        IndexManager::new(&RetrievalConfig::default(), store.clone())
            .with_metrics(metrics.clone()),
    );
    let rag = Arc::new(
        RagAssembler::new(index.clone(), RagConfig::default()).with_metrics(metrics.clone()),
    );
    let health_checker = HealthChecker::new().with_store(store).with_index(index.clone());

    let app_state = AppState {
        index,
        rag,
        retrieval: RetrievalConfig::default(),
        health_checker: Arc::new(health_checker),
        metrics,
        circuit_breaker: None,
    };

    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_requests,
        window_duration: Duration::from_secs(60),
        enabled: true,
    }));
    let auth = Arc::new(AuthMiddleware::new(AuthConfig {
        enabled: true,
        tokens: vec![TOKEN.to_string()],
    }));

    build_router(app_state, rate_limiter, auth, 1024 * 1024)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = test_app(seeded_store(), 100);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/knowledge/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"tenant_id": "acme", "query": "refund"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_search_returns_ranked_results() {
    let app = test_app(seeded_store(), 100);

    let response = app
        .oneshot(post(
            "/api/v1/knowledge/search",
            json!({"tenant_id": "acme", "query": "return policy refund"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["degraded"], false);
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["document"]["id"], 1);
}

#[tokio::test]
async fn test_search_degrades_when_store_is_down() {
    let app = test_app(Arc::new(OfflineStore), 100);

    let response = app
        .oneshot(post("/api/v1/knowledge/search", json!({"tenant_id": "acme", "query": "refund"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["degraded"], true);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_unmatched_query_at_zero_threshold_is_empty() {
    let app = test_app(seeded_store(), 100);

    for query in ["", "quantum physics lecture"] {
        let response = app
            .clone()
            .oneshot(post(
                "/api/v1/knowledge/search",
                json!({"tenant_id": "acme", "query": query, "min_score": 0.0}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 0);
        assert_eq!(body["degraded"], false);
    }
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let app = test_app(seeded_store(), 100);

    let bad_tenant = app
        .clone()
        .oneshot(post("/api/v1/knowledge/search", json!({"tenant_id": "a b/c", "query": "refund"})))
        .await
        .unwrap();
    assert_eq!(bad_tenant.status(), StatusCode::BAD_REQUEST);

    let too_many = app
        .oneshot(post(
            "/api/v1/knowledge/search",
            json!({"tenant_id": "acme", "query": "refund", "top_k": 10_000}),
        ))
        .await
        .unwrap();
    assert_eq!(too_many.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_context_endpoint_returns_prompt() {
    let app = test_app(seeded_store(), 100);

    let response = app
        .oneshot(post(
            "/api/v1/knowledge/context",
            json!({"tenant_id": "acme", "query": "how do I get a refund"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["context"]["context_used"], true);
    assert!(body["prompt"].as_str().unwrap().contains("Return Policy"));
}

#[tokio::test]
async fn test_document_lifecycle() {
    let app = test_app(seeded_store(), 100);

    let stats_before = app.clone().oneshot(get("/api/v1/knowledge/stats/acme")).await.unwrap();
    assert_eq!(stats_before.status(), StatusCode::NOT_FOUND);

    let added = app
        .clone()
        .oneshot(post(
            "/api/v1/knowledge/documents",
            json!({
                "tenant_id": "acme",
                "documents": [
                    {"id": 3, "title": "Gift cards", "content": "Gift cards never expire."}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(added.status(), StatusCode::OK);
    assert_eq!(json_body(added).await["document_count"], 3);

    let stats = app.clone().oneshot(get("/api/v1/knowledge/stats/acme")).await.unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
    assert_eq!(json_body(stats).await["document_count"], 3);

    let deleted = app
        .clone()
        .oneshot(post("/api/v1/knowledge/documents/delete", json!({"tenant_id": "acme", "id": 3})))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(json_body(deleted).await["removed"], true);

    let missing = app
        .oneshot(post("/api/v1/knowledge/documents/delete", json!({"tenant_id": "acme", "id": 3})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_and_invalidate() {
    let app = test_app(seeded_store(), 100);

    let refreshed = app
        .clone()
        .oneshot(post("/api/v1/knowledge/refresh", json!({"tenant_id": "acme"})))
        .await
        .unwrap();
    assert_eq!(refreshed.status(), StatusCode::OK);
    assert_eq!(json_body(refreshed).await["document_count"], 2);

    let invalidated = app
        .clone()
        .oneshot(post("/api/v1/knowledge/invalidate", json!({})))
        .await
        .unwrap();
    assert_eq!(invalidated.status(), StatusCode::OK);

    let stats = app.oneshot(get("/api/v1/knowledge/stats/acme")).await.unwrap();
    assert_eq!(stats.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_metrics_are_public() {
    let app = test_app(seeded_store(), 100);

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let metrics = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let bytes = to_bytes(metrics.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("knowledge_retrieval_"));
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after() {
    let app = test_app(seeded_store(), 2);

    let search = || {
        let body = json!({"tenant_id": "acme", "query": "refund"});
        post("/api/v1/knowledge/search", body)
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(search()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let limited = app.oneshot(search()).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));
}
