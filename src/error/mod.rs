//! Error types for the knowledge retrieval engine

use std::time::Duration;
use thiserror::Error;

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Main error type for the knowledge retrieval engine
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Validation error: {0}")]
    Validation(#[from] crate::middleware::ValidationError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] crate::middleware::RateLimitError),

    #[error("Authentication error: {0}")]
    Auth(#[from] crate::middleware::AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading documents from the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document load timed out after {0:?}")]
    Timeout(Duration),

    #[error("Circuit breaker open, document store calls are suspended")]
    CircuitOpen,

    #[error("Invalid seed data: {0}")]
    Seed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to tenant index maintenance
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Document {id} not found in index for tenant {tenant_id}")]
    DocumentNotFound { tenant_id: String, id: i64 },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl RetrievalError {
    /// True when the failure came from the document store rather than the caller
    pub fn is_store_failure(&self) -> bool {
        matches!(self, RetrievalError::Store(_))
    }
}

impl From<config::ConfigError> for RetrievalError {
    fn from(err: config::ConfigError) -> Self {
        RetrievalError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let err: RetrievalError = StoreError::Timeout(Duration::from_millis(250)).into();
        assert!(err.is_store_failure());
        assert_eq!(
            err.to_string(),
            "Document store error: Document load timed out after 250ms"
        );
    }

    #[test]
    fn test_index_error_is_not_store_failure() {
        let err: RetrievalError = IndexError::DocumentNotFound {
            tenant_id: "acme".to_string(),
            id: 7,
        }
        .into();
        assert!(!err.is_store_failure());
    }
}
