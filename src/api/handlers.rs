//! API request handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::error::{IndexError, RetrievalError};
use crate::knowledge::{
    DocumentId, IndexManager, IndexStats, KnowledgeDocument, KnowledgeIndex, RagAssembler,
    RagContext, SearchQuery, SearchResult,
};
use crate::middleware::InputValidator;
use crate::observability::{HealthChecker, MetricsCollector};
use crate::store::CircuitBreaker;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexManager>,
    pub rag: Arc<RagAssembler>,
    pub retrieval: RetrievalConfig,
    pub health_checker: Arc<HealthChecker>,
    pub metrics: Arc<MetricsCollector>,
    pub circuit_breaker: Option<Arc<CircuitBreaker>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub tenant_id: String,
    pub query: String,
    pub top_k: Option<usize>,
    pub min_score: Option<f64>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,

    /// True when the store failed and the empty result is a fallback
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    pub tenant_id: String,
    pub query: String,
    pub max_articles: Option<usize>,
    pub min_relevance: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContextResponse {
    pub context: RagContext,

    /// Prompt fragment, empty when no context was used
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct TenantRequest {
    pub tenant_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateRequest {
    /// Limit invalidation to one tenant
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentsRequest {
    pub tenant_id: String,
    pub documents: Vec<KnowledgeDocument>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentRequest {
    pub tenant_id: String,
    pub id: DocumentId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error response carrying the matching status code
#[derive(Debug)]
pub struct ApiError(pub RetrievalError);

impl<E: Into<RetrievalError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RetrievalError::Validation(_) => StatusCode::BAD_REQUEST,
            RetrievalError::Index(IndexError::InvalidDocument(_)) => StatusCode::BAD_REQUEST,
            RetrievalError::Index(IndexError::DocumentNotFound { .. }) => StatusCode::NOT_FOUND,
            RetrievalError::Auth(_) => StatusCode::UNAUTHORIZED,
            RetrievalError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            RetrievalError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            RetrievalError::Config(_) | RetrievalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        let mut response = (status, body).into_response();
        if let RetrievalError::RateLimit(e) = &self.0 {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from(e.retry_after_secs()));
        }
        response
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Rank a tenant's articles against a query.
///
/// A failing document store yields an empty, `degraded` result instead of an error.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    InputValidator::validate_tenant_id(&req.tenant_id)?;
    InputValidator::validate_query(&req.query)?;

    let top_k = req.top_k.unwrap_or(state.retrieval.default_top_k);
    let min_score = req.min_score.unwrap_or(state.retrieval.default_min_score);
    InputValidator::validate_top_k(top_k, state.retrieval.max_top_k)?;
    InputValidator::validate_score(min_score)?;

    let mut query = SearchQuery::new(req.query).with_top_k(top_k).with_min_score(min_score);
    if let Some(category) = req.category {
        query = query.with_category(category);
    }

    match state.index.search(&req.tenant_id, &query).await {
        Ok(results) => Ok(Json(SearchResponse {
            total: results.len(),
            results,
            degraded: false,
        })),
        Err(e) if e.is_store_failure() => {
            warn!("Search for tenant {} degraded to no results: {}", req.tenant_id, e);
            Ok(Json(SearchResponse {
                results: Vec::new(),
                total: 0,
                degraded: true,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Assemble RAG context and its prompt fragment; never fails on store errors
pub async fn build_context(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> ApiResult<ContextResponse> {
    InputValidator::validate_tenant_id(&req.tenant_id)?;
    InputValidator::validate_query(&req.query)?;

    let max_articles = req.max_articles.unwrap_or(state.rag.config().max_articles);
    let min_relevance = req.min_relevance.unwrap_or(state.rag.config().min_relevance);
    InputValidator::validate_top_k(max_articles, state.retrieval.max_top_k)?;
    InputValidator::validate_score(min_relevance)?;

    let context = state
        .rag
        .build_context(&req.tenant_id, &req.query, max_articles, min_relevance)
        .await;
    let prompt = state.rag.format_context(&context);

    Ok(Json(ContextResponse { context, prompt }))
}

/// Reload a tenant's documents and rebuild its index
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<TenantRequest>,
) -> ApiResult<IndexStats> {
    InputValidator::validate_tenant_id(&req.tenant_id)?;
    Ok(Json(state.index.refresh(&req.tenant_id).await?))
}

/// Mark indexes stale after article changes made elsewhere
pub async fn invalidate(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> ApiResult<SuccessResponse> {
    let message = match req.tenant_id {
        Some(tenant_id) => {
            InputValidator::validate_tenant_id(&tenant_id)?;
            state.index.invalidate_tenant(&tenant_id).await;
            format!("Index for tenant {} invalidated", tenant_id)
        }
        None => {
            state.index.invalidate().await;
            "All indexes invalidated".to_string()
        }
    };

    Ok(Json(SuccessResponse { message }))
}

/// Add or replace documents with a single rebuild
pub async fn add_documents(
    State(state): State<AppState>,
    Json(req): Json<AddDocumentsRequest>,
) -> ApiResult<IndexStats> {
    InputValidator::validate_tenant_id(&req.tenant_id)?;
    InputValidator::validate_batch(&req.documents)?;

    Ok(Json(state.index.add_documents(&req.tenant_id, req.documents).await?))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Json(req): Json<DeleteDocumentRequest>,
) -> ApiResult<DeleteDocumentResponse> {
    InputValidator::validate_tenant_id(&req.tenant_id)?;

    if state.index.remove_document(&req.tenant_id, req.id).await? {
        Ok(Json(DeleteDocumentResponse { removed: true }))
    } else {
        Err(IndexError::DocumentNotFound {
            tenant_id: req.tenant_id,
            id: req.id,
        }
        .into())
    }
}

/// Stats of a resident index; 404 when the tenant is not loaded
pub async fn index_stats(State(state): State<AppState>, Path(tenant_id): Path<String>) -> Response {
    if let Err(e) = InputValidator::validate_tenant_id(&tenant_id) {
        return ApiError::from(e).into_response();
    }

    match state.index.index_stats(&tenant_id).await {
        Some(stats) => (StatusCode::OK, Json(stats)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No resident index for tenant {}", tenant_id),
            }),
        )
            .into_response(),
    }
}
