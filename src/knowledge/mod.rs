//! TF-IDF knowledge base retrieval
//!
//! Text flows leaf-first through [`tokenizer`], [`tfidf`] and [`vectorizer`] into
//! [`similarity`] ranking over one immutable [`TenantIndex`] generation. [`IndexManager`]
//! owns the generations per tenant and [`RagAssembler`] turns search hits into prompt context.

pub mod index;
pub mod manager;
pub mod models;
pub mod rag;
pub mod similarity;
pub mod tfidf;
pub mod token_estimator;
pub mod tokenizer;
pub mod vectorizer;

pub use index::{DocumentVector, TenantIndex};
pub use manager::IndexManager;
pub use models::*;
pub use rag::RagAssembler;
pub use similarity::cosine_similarity;
pub use tfidf::{smoothed_idf, term_frequencies, TermIndex};
pub use token_estimator::TokenEstimator;
pub use tokenizer::tokenize;
pub use vectorizer::vectorize;

use crate::error::Result;
use async_trait::async_trait;

/// Search and maintenance operations over per-tenant knowledge indexes
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Ranked results for `query`, building the tenant's index on first use.
    ///
    /// An empty corpus or a query without known terms yields an empty list. Store failures
    /// while building propagate.
    async fn search(&self, tenant_id: &str, query: &SearchQuery) -> Result<Vec<SearchResult>>;

    /// Reload from the store and rebuild regardless of residency
    async fn refresh(&self, tenant_id: &str) -> Result<IndexStats>;

    /// Mark every resident index stale; called after any article mutation
    async fn invalidate(&self);

    /// Add or replace documents in one rebuild
    async fn add_documents(
        &self,
        tenant_id: &str,
        documents: Vec<KnowledgeDocument>,
    ) -> Result<IndexStats>;

    /// Remove a document; `false` if it was not indexed
    async fn remove_document(&self, tenant_id: &str, id: DocumentId) -> Result<bool>;

    /// Stats of the resident index, without loading anything
    async fn index_stats(&self, tenant_id: &str) -> Option<IndexStats>;
}
