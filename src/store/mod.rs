//! Document store collaborators
//!
//! The index never owns persisted articles. It loads the active ones for a tenant through
//! [`DocumentStore`] whenever it has to rebuild.

pub mod circuit_breaker;
pub mod guarded;
pub mod memory;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use guarded::GuardedStore;
pub use memory::InMemoryDocumentStore;

use crate::error::StoreError;
use crate::knowledge::KnowledgeDocument;
use async_trait::async_trait;

/// Source of the articles a tenant wants indexed
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All active documents of `tenant_id`; inactive articles are filtered out here
    async fn load_active_documents(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, StoreError>;

    /// Cheap reachability check used by health reporting
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
