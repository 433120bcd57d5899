//! Timeout and circuit breaker around any document store

use super::{CircuitBreaker, CircuitBreakerConfig, DocumentStore};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::knowledge::KnowledgeDocument;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Decorates a [`DocumentStore`] so slow or failing loads surface as `StoreError`s quickly
pub struct GuardedStore {
    inner: Arc<dyn DocumentStore>,
    timeout: Duration,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl GuardedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        let breaker = config.circuit_breaker.enabled.then(|| {
            let breaker_config = CircuitBreakerConfig::from(&config.circuit_breaker);
            Arc::new(CircuitBreaker::new(breaker_config))
        });

        Self {
            inner,
            timeout: config.load_timeout(),
            breaker,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Breaker shared with health reporting, if enabled
    pub fn breaker(&self) -> Option<Arc<CircuitBreaker>> {
        self.breaker.clone()
    }

    async fn record(&self, ok: bool) {
        if let Some(breaker) = &self.breaker {
            if ok {
                breaker.record_success().await;
            } else {
                breaker.record_failure().await;
            }
        }
    }
}

#[async_trait]
impl DocumentStore for GuardedStore {
    async fn load_active_documents(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, StoreError> {
        if let Some(breaker) = &self.breaker {
            if !breaker.allow_request().await {
                return Err(StoreError::CircuitOpen);
            }
        }

        let load = self.inner.load_active_documents(tenant_id);
        let result = match tokio::time::timeout(self.timeout, load).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Document load for tenant {} timed out after {:?}",
                    tenant_id, self.timeout
                );
                Err(StoreError::Timeout(self.timeout))
            }
        };

        self.record(result.is_ok()).await;
        result
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match tokio::time::timeout(self.timeout, self.inner.ping()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CircuitState, InMemoryDocumentStore};

    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn load_active_documents(
            &self,
            _tenant_id: &str,
        ) -> Result<Vec<KnowledgeDocument>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn load_active_documents(
            &self,
            _tenant_id: &str,
        ) -> Result<Vec<KnowledgeDocument>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    fn config(failure_threshold: usize) -> StoreConfig {
        let mut config = StoreConfig::default();
        config.circuit_breaker.failure_threshold = failure_threshold;
        config
    }

    #[tokio::test]
    async fn test_passes_through_successful_loads() {
        let inner = Arc::new(InMemoryDocumentStore::new());
        inner.upsert_article("acme", KnowledgeDocument::new(1, "Shipping", "Carriers"));
        let store = GuardedStore::new(inner, &config(3));

        assert_eq!(store.load_active_documents("acme").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_times_out_slow_store() {
        let store = GuardedStore::new(Arc::new(SlowStore), &config(3))
            .with_timeout(Duration::from_millis(20));

        let err = store.load_active_documents("acme").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Timeout(elapsed) if elapsed == Duration::from_millis(20)
        ));
        assert_eq!(err.to_string(), "Document load timed out after 20ms");
    }

    #[tokio::test]
    async fn test_opens_circuit_after_repeated_failures() {
        let store = GuardedStore::new(Arc::new(UnreachableStore), &config(2));

        for _ in 0..2 {
            assert!(matches!(
                store.load_active_documents("acme").await,
                Err(StoreError::Unavailable(_))
            ));
        }

        assert!(matches!(
            store.load_active_documents("acme").await,
            Err(StoreError::CircuitOpen)
        ));
        let breaker = store.breaker().unwrap();
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_breaker_disabled() {
        let mut config = config(1);
        config.circuit_breaker.enabled = false;
        let store = GuardedStore::new(Arc::new(UnreachableStore), &config);

        assert!(store.breaker().is_none());
        for _ in 0..3 {
            assert!(matches!(
                store.load_active_documents("acme").await,
                Err(StoreError::Unavailable(_))
            ));
        }
    }
}
