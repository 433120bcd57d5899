//! Health checks for the document store, tenant index cache and circuit breaker

use crate::knowledge::IndexManager;
use crate::store::{CircuitBreaker, CircuitState, DocumentStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

const STORE_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,

    /// Check duration in milliseconds
    pub response_time_ms: Option<u64>,
}

impl ComponentHealth {
    fn not_configured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Degraded,
            message: Some("Not configured".to_string()),
            response_time_ms: None,
        }
    }
}

/// Overall system health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
struct CachedHealth {
    result: SystemHealth,
    cached_at: Instant,
}

/// Health checker with a short result cache so probes do not ping the store on every call
pub struct HealthChecker {
    start_time: Instant,
    store: Option<Arc<dyn DocumentStore>>,
    index: Option<Arc<IndexManager>>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    cached_result: RwLock<Option<CachedHealth>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    /// Health checker with a 30 second cache
    pub fn new() -> Self {
        Self::with_cache_ttl(Duration::from_secs(30))
    }

    pub fn with_cache_ttl(cache_ttl: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            store: None,
            index: None,
            circuit_breaker: None,
            cached_result: RwLock::new(None),
            cache_ttl,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_index(mut self, index: Arc<IndexManager>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(circuit_breaker);
        self
    }

    /// Cached health, refreshed once the TTL has passed
    pub async fn check_health(&self) -> SystemHealth {
        {
            let cached = self.cached_result.read().await;
            if let Some(cached_health) = &*cached {
                if cached_health.cached_at.elapsed() < self.cache_ttl {
                    debug!("Returning cached health check result");
                    return cached_health.result.clone();
                }
            }
        }

        self.check_health_fresh().await
    }

    /// Bypass the cache
    pub async fn check_health_fresh(&self) -> SystemHealth {
        let health = self.perform_health_check().await;

        *self.cached_result.write().await = Some(CachedHealth {
            result: health.clone(),
            cached_at: Instant::now(),
        });

        health
    }

    async fn perform_health_check(&self) -> SystemHealth {
        let (store, index, circuit_breaker) =
            futures::join!(self.check_store(), self.check_index(), self.check_circuit_breaker());
        let components = vec![store, index, circuit_breaker];

        let status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };

        SystemHealth {
            status,
            uptime_secs: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    async fn check_store(&self) -> ComponentHealth {
        let Some(store) = &self.store else {
            return ComponentHealth::not_configured("document_store");
        };

        let start = Instant::now();
        let (status, message) = match tokio::time::timeout(STORE_PING_TIMEOUT, store.ping()).await {
            Ok(Ok(())) => (HealthStatus::Healthy, "Store reachable".to_string()),
            Ok(Err(e)) => (HealthStatus::Unhealthy, format!("Store error: {}", e)),
            Err(_) => (HealthStatus::Unhealthy, "Health check timeout".to_string()),
        };

        ComponentHealth {
            name: "document_store".to_string(),
            status,
            message: Some(message),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    async fn check_index(&self) -> ComponentHealth {
        let Some(index) = &self.index else {
            return ComponentHealth::not_configured("index_cache");
        };

        let start = Instant::now();
        let resident = index.resident_tenants().await;

        ComponentHealth {
            name: "index_cache".to_string(),
            status: HealthStatus::Healthy,
            message: Some(format!("{} tenant indexes resident", resident.len())),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    async fn check_circuit_breaker(&self) -> ComponentHealth {
        let Some(cb) = &self.circuit_breaker else {
            return ComponentHealth::not_configured("circuit_breaker");
        };

        let (status, message) = match cb.state().await {
            CircuitState::Closed => (HealthStatus::Healthy, "Circuit closed, normal operation"),
            CircuitState::Open => (HealthStatus::Unhealthy, "Circuit open, store calls suspended"),
            CircuitState::HalfOpen => (HealthStatus::Degraded, "Circuit half-open, probing store"),
        };

        ComponentHealth {
            name: "circuit_breaker".to_string(),
            status,
            message: Some(message.to_string()),
            response_time_ms: Some(0),
        }
    }

    pub fn liveness(&self) -> bool {
        true
    }

    /// Ready unless a component is unhealthy
    pub async fn readiness(&self) -> bool {
        self.check_health().await.status != HealthStatus::Unhealthy
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::error::StoreError;
    use crate::knowledge::KnowledgeDocument;
    use crate::store::{CircuitBreakerConfig, InMemoryDocumentStore};
    use async_trait::async_trait;

    struct DownStore;

    #[async_trait]
    impl DocumentStore for DownStore {
        async fn load_active_documents(
            &self,
            _tenant_id: &str,
        ) -> Result<Vec<KnowledgeDocument>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unconfigured_is_degraded() {
        let health = HealthChecker::new().check_health().await;

        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.components.len(), 3);
    }

    #[tokio::test]
    async fn test_all_components_healthy() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let index = Arc::new(IndexManager::new(&RetrievalConfig::default(), store.clone()));
        let checker = HealthChecker::new()
            .with_store(store)
            .with_index(index)
            .with_circuit_breaker(Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())));

        let health = checker.check_health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(checker.readiness().await);
    }

    #[tokio::test]
    async fn test_store_down_is_unhealthy() {
        let checker = HealthChecker::new().with_store(Arc::new(DownStore));

        let health = checker.check_health().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(!checker.readiness().await);
    }

    #[tokio::test]
    async fn test_result_is_cached() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        }));
        let checker = HealthChecker::new().with_circuit_breaker(breaker.clone());

        let before = checker.check_health().await;
        breaker.record_failure().await;
        let cached = checker.check_health().await;
        let fresh = checker.check_health_fresh().await;

        assert_eq!(before.status, cached.status);
        assert_eq!(fresh.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_liveness() {
        assert!(HealthChecker::new().liveness());
    }
}
