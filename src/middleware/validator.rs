//! Input validation for API requests

use crate::knowledge::KnowledgeDocument;
use tracing::warn;

/// Maximum tenant id length
const MAX_TENANT_ID_LENGTH: usize = 64;

/// Maximum query length in bytes (4KB)
const MAX_QUERY_LENGTH: usize = 4096;

const MAX_TITLE_LENGTH: usize = 512;

/// Maximum article body length in bytes (64KB)
const MAX_CONTENT_LENGTH: usize = 64 * 1024;

/// Maximum documents per add request
const MAX_BATCH_SIZE: usize = 100;

pub struct InputValidator;

impl InputValidator {
    /// Tenant ids are 1 to 64 characters of `[A-Za-z0-9_.-]`
    pub fn validate_tenant_id(tenant_id: &str) -> Result<(), ValidationError> {
        if tenant_id.is_empty() {
            warn!("Validation failed: empty tenant id");
            return Err(ValidationError::EmptyTenantId);
        }

        if tenant_id.len() > MAX_TENANT_ID_LENGTH {
            warn!("Validation failed: tenant id too long ({})", tenant_id.len());
            return Err(ValidationError::TooLong {
                field: "tenant_id",
                length: tenant_id.len(),
                max_length: MAX_TENANT_ID_LENGTH,
            });
        }

        if !tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            warn!("Validation failed: invalid tenant id characters");
            return Err(ValidationError::InvalidTenantId);
        }

        Ok(())
    }

    /// Queries may be empty, which simply yields no results
    pub fn validate_query(query: &str) -> Result<(), ValidationError> {
        if query.len() > MAX_QUERY_LENGTH {
            warn!("Validation failed: query too long ({} > {})", query.len(), MAX_QUERY_LENGTH);
            return Err(ValidationError::TooLong {
                field: "query",
                length: query.len(),
                max_length: MAX_QUERY_LENGTH,
            });
        }

        Self::reject_control_characters("query", query)
    }

    pub fn validate_top_k(top_k: usize, max_top_k: usize) -> Result<(), ValidationError> {
        if top_k == 0 || top_k > max_top_k {
            warn!("Validation failed: top_k {} outside 1..={}", top_k, max_top_k);
            return Err(ValidationError::InvalidTopK { top_k, max: max_top_k });
        }
        Ok(())
    }

    /// Scores are cosine similarities and must lie in [0, 1]
    pub fn validate_score(score: f64) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&score) {
            warn!("Validation failed: invalid score ({})", score);
            return Err(ValidationError::InvalidScore { score });
        }
        Ok(())
    }

    pub fn validate_document(document: &KnowledgeDocument) -> Result<(), ValidationError> {
        if document.title.trim().is_empty() {
            warn!("Validation failed: document {} has an empty title", document.id);
            return Err(ValidationError::EmptyTitle { id: document.id });
        }

        if document.title.len() > MAX_TITLE_LENGTH {
            return Err(ValidationError::TooLong {
                field: "title",
                length: document.title.len(),
                max_length: MAX_TITLE_LENGTH,
            });
        }

        if document.content.len() > MAX_CONTENT_LENGTH {
            return Err(ValidationError::TooLong {
                field: "content",
                length: document.content.len(),
                max_length: MAX_CONTENT_LENGTH,
            });
        }

        Self::reject_control_characters("title", &document.title)?;
        Self::reject_control_characters("content", &document.content)
    }

    pub fn validate_batch(documents: &[KnowledgeDocument]) -> Result<(), ValidationError> {
        if documents.is_empty() {
            warn!("Validation failed: empty batch");
            return Err(ValidationError::EmptyBatch);
        }

        if documents.len() > MAX_BATCH_SIZE {
            warn!("Validation failed: batch too large ({} > {})", documents.len(), MAX_BATCH_SIZE);
            return Err(ValidationError::BatchTooLarge {
                size: documents.len(),
                max_size: MAX_BATCH_SIZE,
            });
        }

        documents.iter().try_for_each(Self::validate_document)
    }

    fn reject_control_characters(field: &'static str, text: &str) -> Result<(), ValidationError> {
        if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
            warn!("Validation failed: {} contains control characters", field);
            return Err(ValidationError::InvalidCharacters { field });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Tenant id is empty")]
    EmptyTenantId,

    #[error("Tenant id may only contain ASCII letters, digits, '_', '-' and '.'")]
    InvalidTenantId,

    #[error("{field} too long: {length} bytes (max: {max_length})")]
    TooLong {
        field: &'static str,
        length: usize,
        max_length: usize,
    },

    #[error("{field} contains invalid control characters")]
    InvalidCharacters { field: &'static str },

    #[error("Invalid top_k: {top_k} (must be between 1 and {max})")]
    InvalidTopK { top_k: usize, max: usize },

    #[error("Invalid score: {score} (must be between 0.0 and 1.0)")]
    InvalidScore { score: f64 },

    #[error("Document {id} has an empty title")]
    EmptyTitle { id: i64 },

    #[error("Batch is empty")]
    EmptyBatch,

    #[error("Batch too large: {size} documents (max: {max_size})")]
    BatchTooLarge { size: usize, max_size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id() {
        assert!(InputValidator::validate_tenant_id("acme-store_01.eu").is_ok());
        assert!(InputValidator::validate_tenant_id("").is_err());
        assert!(InputValidator::validate_tenant_id("acme store").is_err());
        assert!(InputValidator::validate_tenant_id("acme/../globex").is_err());
        assert!(InputValidator::validate_tenant_id(&"a".repeat(MAX_TENANT_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_query() {
        assert!(InputValidator::validate_query("").is_ok());
        assert!(InputValidator::validate_query("Where is my order?\n").is_ok());
        assert!(InputValidator::validate_query("bad\x00query").is_err());
        assert!(InputValidator::validate_query(&"q".repeat(MAX_QUERY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_top_k() {
        assert!(InputValidator::validate_top_k(5, 50).is_ok());
        assert!(InputValidator::validate_top_k(0, 50).is_err());
        assert!(InputValidator::validate_top_k(51, 50).is_err());
    }

    #[test]
    fn test_score() {
        assert!(InputValidator::validate_score(0.0).is_ok());
        assert!(InputValidator::validate_score(1.0).is_ok());
        assert!(InputValidator::validate_score(-0.1).is_err());
        assert!(InputValidator::validate_score(1.1).is_err());
        assert!(InputValidator::validate_score(f64::NAN).is_err());
    }

    #[test]
    fn test_documents() {
        let good = KnowledgeDocument::new(1, "Return policy", "Thirty days.\tNo questions asked.");
        assert!(InputValidator::validate_document(&good).is_ok());

        let untitled = KnowledgeDocument::new(2, " ", "body");
        assert!(matches!(
            InputValidator::validate_document(&untitled),
            Err(ValidationError::EmptyTitle { id: 2 })
        ));

        assert!(InputValidator::validate_batch(&[]).is_err());
        assert!(InputValidator::validate_batch(&vec![good.clone(); MAX_BATCH_SIZE + 1]).is_err());
        assert!(InputValidator::validate_batch(&[good, untitled]).is_err());
    }
}
