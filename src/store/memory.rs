//! In-memory document store backed by `DashMap`

use super::DocumentStore;
use crate::error::StoreError;
use crate::knowledge::{DocumentId, KnowledgeDocument};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
struct StoredArticle {
    document: KnowledgeDocument,
    active: bool,
}

/// Article entry of a seed file; `active` defaults to true
#[derive(Debug, Deserialize)]
struct SeedArticle {
    #[serde(flatten)]
    document: KnowledgeDocument,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Articles per tenant, keyed by id so loads come back in id order
#[derive(Default)]
pub struct InMemoryDocumentStore {
    tenants: DashMap<String, BTreeMap<DocumentId, StoredArticle>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "<tenant>": [articles...] }`
    pub fn from_seed_json(json: &str) -> Result<Self, StoreError> {
        let seed: HashMap<String, Vec<SeedArticle>> = serde_json::from_str(json)?;
        let store = Self::new();

        for (tenant_id, articles) in seed {
            if tenant_id.trim().is_empty() {
                return Err(StoreError::Seed("empty tenant id".to_string()));
            }
            let mut entries = store.tenants.entry(tenant_id).or_default();
            for article in articles {
                entries.insert(
                    article.document.id,
                    StoredArticle {
                        document: article.document,
                        active: article.active,
                    },
                );
            }
        }

        Ok(store)
    }

    /// Load a JSON seed file
    pub fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_seed_json(&raw)?;
        info!(
            "Seeded document store from {} with {} tenants",
            path.as_ref().display(),
            store.tenants.len()
        );
        Ok(store)
    }

    /// Insert or replace an article; new articles are active
    pub fn upsert_article(&self, tenant_id: &str, document: KnowledgeDocument) {
        let mut entries = self.tenants.entry(tenant_id.to_string()).or_default();
        let active = entries.get(&document.id).map_or(true, |existing| existing.active);
        entries.insert(document.id, StoredArticle { document, active });
    }

    /// Returns whether the article existed
    pub fn delete_article(&self, tenant_id: &str, id: DocumentId) -> bool {
        self.tenants
            .get_mut(tenant_id)
            .map_or(false, |mut entries| entries.remove(&id).is_some())
    }

    /// Returns whether the article existed
    pub fn set_active(&self, tenant_id: &str, id: DocumentId, active: bool) -> bool {
        match self.tenants.get_mut(tenant_id) {
            Some(mut entries) => match entries.get_mut(&id) {
                Some(article) => {
                    article.active = active;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Stored articles of a tenant, active or not
    pub fn article_count(&self, tenant_id: &str) -> usize {
        self.tenants.get(tenant_id).map_or(0, |entries| entries.len())
    }

    pub fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self
            .tenants
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        tenants.sort();
        tenants
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load_active_documents(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, StoreError> {
        Ok(self
            .tenants
            .get(tenant_id)
            .map(|entries| {
                entries
                    .values()
                    .filter(|article| article.active)
                    .map(|article| article.document.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_only_active_documents_load() {
        let store = InMemoryDocumentStore::new();
        store.upsert_article("acme", KnowledgeDocument::new(1, "Shipping", "Carriers"));
        store.upsert_article("acme", KnowledgeDocument::new(2, "Returns", "Thirty days"));
        assert!(store.set_active("acme", 2, false));

        let docs = store.load_active_documents("acme").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, 1);
        assert_eq!(store.article_count("acme"), 2);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryDocumentStore::new();
        store.upsert_article("acme", KnowledgeDocument::new(1, "Shipping", "Carriers"));

        assert!(store.load_active_documents("globex").await.unwrap().is_empty());
        assert!(!store.delete_article("globex", 1));
        assert!(store.delete_article("acme", 1));
        assert!(store.load_active_documents("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_active_flag() {
        let store = InMemoryDocumentStore::new();
        store.upsert_article("acme", KnowledgeDocument::new(1, "Shipping", "Carriers"));
        store.set_active("acme", 1, false);
        store.upsert_article("acme", KnowledgeDocument::new(1, "Shipping", "Updated"));

        assert!(store.load_active_documents("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "acme": [
                    {{"id": 1, "title": "Return policy", "content": "Within 30 days",
                      "category": "returns"}},
                    {{"id": 2, "title": "Old promo", "content": "Expired", "active": false}}
                ],
                "globex": []
            }}"#
        )
        .unwrap();

        let store = InMemoryDocumentStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.tenants(), vec!["acme".to_string(), "globex".to_string()]);

        let docs = store.load_active_documents("acme").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].category.as_deref(), Some("returns"));
    }

    #[test]
    fn test_invalid_seed() {
        assert!(matches!(
            InMemoryDocumentStore::from_seed_json("[1, 2]"),
            Err(StoreError::Serialization(_))
        ));
        assert!(matches!(
            InMemoryDocumentStore::from_seed_json(r#"{" ": []}"#),
            Err(StoreError::Seed(_))
        ));
    }
}
