//! Knowledge Retrieval - multi-tenant TF-IDF search and RAG context for helpdesk automation
//!
//! Each tenant's knowledge base articles are indexed in memory with smoothed TF-IDF weights
//! and searched by cosine similarity. Results feed a retrieval-augmented generation step that
//! injects the best articles into an LLM prompt.
//!
//! ## Features
//!
//! - **Per-tenant indexes**: lazily built, kept in a bounded LRU, rebuilt in full on any change
//! - **Soft-fail RAG**: store outages degrade to an empty context instead of failing responses
//! - **Circuit Breaker Protection**: a dead document store is not hammered on every search
//! - **Authentication and Rate Limiting** for the HTTP surface
//! - **Observability**: structured logging, Prometheus metrics and health checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knowledge_retrieval::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::default_config();
//!
//!     let store = Arc::new(InMemoryDocumentStore::new());
//!     store.upsert_article(
//!         "acme",
//!         KnowledgeDocument::new(
//!             1,
//!             "Return Policy",
//!             "Items may be returned within 30 days for a full refund.",
//!         ),
//!     );
//!
//!     let index = Arc::new(IndexManager::new(&config.retrieval, store));
//!     let results = index.search("acme", &SearchQuery::new("return policy refund")).await?;
//!
//!     let rag = RagAssembler::new(index, config.rag);
//!     let context = rag.build_default_context("acme", "how do I get a refund?").await;
//!     println!("{} results, prompt:\n{}", results.len(), rag.format_context(&context));
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod middleware;
pub mod observability;
pub mod store;

pub use config::Config;
pub use error::{Result, RetrievalError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Result, RetrievalError};
    pub use crate::knowledge::{
        IndexManager, IndexStats, KnowledgeDocument, KnowledgeIndex, RagAssembler, RagContext,
        SearchQuery, SearchResult,
    };
    pub use crate::middleware::{AuthMiddleware, InputValidator, RateLimiter};
    pub use crate::observability::{HealthChecker, MetricsCollector};
    pub use crate::store::{DocumentStore, GuardedStore, InMemoryDocumentStore};
}
