//! Per-tenant index lifecycle: lazy build, invalidation, mutation and rebuild

use super::index::TenantIndex;
use super::models::{DocumentId, IndexStats, KnowledgeDocument, SearchQuery, SearchResult};
use super::KnowledgeIndex;
use crate::config::RetrievalConfig;
use crate::error::{IndexError, Result};
use crate::observability::MetricsCollector;
use crate::store::DocumentStore;
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns every resident tenant index.
///
/// Built indexes live in a bounded LRU; a capacity of 1 keeps only the last tenant resident
/// and rebuilds on every tenant switch. Each tenant has its own rebuild lock, kept outside the
/// LRU so that evicting an index never lets two rebuilds of the same tenant run at once.
/// Different tenants never share locks.
pub struct IndexManager {
    store: Arc<dyn DocumentStore>,
    indexes: Cache<String, Arc<TenantIndex>>,
    rebuild_locks: DashMap<String, Arc<Mutex<()>>>,
    next_generation: AtomicU64,
    metrics: Option<Arc<MetricsCollector>>,
}

impl IndexManager {
    pub fn new(config: &RetrievalConfig, store: Arc<dyn DocumentStore>) -> Self {
        info!(
            "Initializing index manager with tenant cache capacity {}",
            config.tenant_cache_capacity
        );

        let indexes = Cache::builder()
            .max_capacity(config.tenant_cache_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(|tenant: Arc<String>, index: Arc<TenantIndex>, cause| {
                debug!(
                    "Tenant index {} (generation {}) evicted: {:?}",
                    tenant,
                    index.generation(),
                    cause
                );
            })
            .build();

        Self {
            store,
            indexes,
            rebuild_locks: DashMap::new(),
            next_generation: AtomicU64::new(0),
            metrics: None,
        }
    }

    /// Set metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Ensure the tenant's index is resident and return it.
    ///
    /// Without `force_refresh` a resident index is returned as is. Otherwise the active
    /// documents are loaded from the store and everything is rebuilt. This is the only call
    /// path that reads the store besides mutations on a non-resident tenant.
    pub async fn initialize(
        &self,
        tenant_id: &str,
        force_refresh: bool,
    ) -> Result<Arc<TenantIndex>> {
        if !force_refresh {
            if let Some(index) = self.indexes.get(tenant_id).await {
                debug!("Index cache hit for tenant {}", tenant_id);
                if let Some(metrics) = &self.metrics {
                    metrics.record_cache_hit();
                }
                return Ok(index);
            }
        }

        let lock = self.rebuild_lock(tenant_id);
        let _guard = lock.lock().await;

        if !force_refresh {
            // A concurrent caller may have finished the build while we waited for the lock
            if let Some(index) = self.indexes.get(tenant_id).await {
                return Ok(index);
            }
            if let Some(metrics) = &self.metrics {
                metrics.record_cache_miss();
            }
        }

        let documents = self.load(tenant_id).await?;
        let index = self.rebuild(tenant_id, documents);
        self.indexes.insert(tenant_id.to_string(), index.clone()).await;
        Ok(index)
    }

    /// Drop one tenant's index; the next access rebuilds it from the store
    pub async fn invalidate_tenant(&self, tenant_id: &str) {
        let lock = self.rebuild_lock(tenant_id);
        let _guard = lock.lock().await;

        self.indexes.invalidate(tenant_id).await;
        debug!("Invalidated index for tenant {}", tenant_id);
    }

    /// Add or replace a single document and rebuild
    pub async fn add_document(
        &self,
        tenant_id: &str,
        document: KnowledgeDocument,
    ) -> Result<IndexStats> {
        self.add_documents(tenant_id, vec![document]).await
    }

    /// Tenants that currently have a built index
    pub async fn resident_tenants(&self) -> Vec<String> {
        self.indexes.run_pending_tasks().await;

        let mut tenants: Vec<String> = self
            .indexes
            .iter()
            .map(|(tenant_id, _)| tenant_id.as_ref().clone())
            .collect();
        tenants.sort();
        tenants
    }

    /// Rebuild lock of one tenant, created on first use and never evicted
    fn rebuild_lock(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.rebuild_locks.get(tenant_id) {
            return lock.value().clone();
        }
        self.rebuild_locks
            .entry(tenant_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Documents the next generation starts from: the resident corpus, or a fresh store load
    async fn current_corpus(&self, tenant_id: &str) -> Result<(Vec<KnowledgeDocument>, bool)> {
        match self.indexes.get(tenant_id).await {
            Some(index) => Ok((index.documents().to_vec(), true)),
            None => Ok((self.load(tenant_id).await?, false)),
        }
    }

    async fn load(&self, tenant_id: &str) -> Result<Vec<KnowledgeDocument>> {
        let start = Instant::now();

        match self.store.load_active_documents(tenant_id).await {
            Ok(documents) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_store_load(start.elapsed());
                }
                Ok(documents)
            }
            Err(e) => {
                warn!("Failed to load documents for tenant {}: {}", tenant_id, e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_store_error();
                }
                Err(e.into())
            }
        }
    }

    /// Build a fresh generation over `documents`
    fn rebuild(&self, tenant_id: &str, documents: Vec<KnowledgeDocument>) -> Arc<TenantIndex> {
        let start = Instant::now();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let index = TenantIndex::build(tenant_id, generation, documents);
        let elapsed = start.elapsed();

        info!(
            "Built index for tenant {} (generation {}): {} documents, {} terms in {:?}",
            tenant_id,
            generation,
            index.len(),
            index.terms().len(),
            elapsed
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_index_build(elapsed);
        }

        Arc::new(index)
    }
}

#[async_trait]
impl KnowledgeIndex for IndexManager {
    async fn search(&self, tenant_id: &str, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let start = Instant::now();

        let index = match self.initialize(tenant_id, false).await {
            Ok(index) => index,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_search_error();
                }
                return Err(e);
            }
        };

        let results = index.search(query);
        debug!(
            "Search for tenant {} returned {} results from {} documents",
            tenant_id,
            results.len(),
            index.len()
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_search(start.elapsed());
        }

        Ok(results)
    }

    async fn refresh(&self, tenant_id: &str) -> Result<IndexStats> {
        Ok(self.initialize(tenant_id, true).await?.stats())
    }

    async fn invalidate(&self) {
        let locks: Vec<(String, Arc<Mutex<()>>)> = self
            .rebuild_locks
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (tenant_id, lock) in &locks {
            let _guard = lock.lock().await;
            self.indexes.invalidate(tenant_id).await;
        }
        info!("Invalidated {} tenant indexes", locks.len());
    }

    async fn add_documents(
        &self,
        tenant_id: &str,
        documents: Vec<KnowledgeDocument>,
    ) -> Result<IndexStats> {
        if let Some(invalid) = documents.iter().find(|d| d.title.trim().is_empty()) {
            let message = format!("document {} has an empty title", invalid.id);
            return Err(IndexError::InvalidDocument(message).into());
        }

        let lock = self.rebuild_lock(tenant_id);
        let _guard = lock.lock().await;

        let (mut corpus, _) = self.current_corpus(tenant_id).await?;
        for document in documents {
            match corpus.iter().position(|existing| existing.id == document.id) {
                Some(position) => corpus[position] = document,
                None => corpus.push(document),
            }
        }

        let index = self.rebuild(tenant_id, corpus);
        let stats = index.stats();
        self.indexes.insert(tenant_id.to_string(), index).await;
        Ok(stats)
    }

    async fn remove_document(&self, tenant_id: &str, id: DocumentId) -> Result<bool> {
        let lock = self.rebuild_lock(tenant_id);
        let _guard = lock.lock().await;

        let (mut corpus, resident) = self.current_corpus(tenant_id).await?;
        let before = corpus.len();
        corpus.retain(|document| document.id != id);
        let removed = corpus.len() != before;

        // Nothing changed for a resident index, so the current generation stays valid
        if removed || !resident {
            let index = self.rebuild(tenant_id, corpus);
            self.indexes.insert(tenant_id.to_string(), index).await;
        }

        Ok(removed)
    }

    async fn index_stats(&self, tenant_id: &str) -> Option<IndexStats> {
        self.indexes.get(tenant_id).await.map(|index| index.stats())
    }
}
