//! One generation of a tenant's TF-IDF index

use super::models::{DocumentId, IndexStats, KnowledgeDocument, SearchQuery, SearchResult};
use super::similarity::{cosine_similarity, rank};
use super::tfidf::TermIndex;
use super::vectorizer::{vectorize, vectorize_document};
use chrono::{DateTime, Utc};

/// Document weights tagged with the generation they were computed in
#[derive(Debug, Clone)]
pub struct DocumentVector {
    pub generation: u64,
    pub weights: Vec<f64>,
}

/// Vocabulary, IDF table, document vectors and document list of one corpus snapshot.
///
/// Immutable once built. Any corpus change produces a new `TenantIndex` with a new generation
/// so vectors from different vocabularies can never be mixed.
#[derive(Debug, Clone)]
pub struct TenantIndex {
    tenant_id: String,
    generation: u64,
    documents: Vec<KnowledgeDocument>,
    terms: TermIndex,
    vectors: Vec<DocumentVector>,
    built_at: DateTime<Utc>,
}

impl TenantIndex {
    /// Full rebuild over `documents`
    pub fn build(
        tenant_id: impl Into<String>,
        generation: u64,
        documents: Vec<KnowledgeDocument>,
    ) -> Self {
        let terms = TermIndex::build(&documents);
        let vectors = documents
            .iter()
            .map(|document| DocumentVector {
                generation,
                weights: vectorize_document(document, &terms),
            })
            .collect();

        Self {
            tenant_id: tenant_id.into(),
            generation,
            documents,
            terms,
            vectors,
            built_at: Utc::now(),
        }
    }

    /// Rank every document against the query text.
    ///
    /// Category and `min_score` filters apply before sorting and `top_k` truncation.
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        if self.documents.is_empty() || query.top_k == 0 {
            return Vec::new();
        }

        let query_vector = vectorize(&query.text, &self.terms);

        // Empty and out-of-vocabulary queries match nothing, whatever the threshold
        if query_vector.iter().all(|weight| *weight == 0.0) {
            return Vec::new();
        }

        let candidates: Vec<(&KnowledgeDocument, f64)> = self
            .documents
            .iter()
            .zip(self.vectors.iter())
            .filter(|(document, _)| match &query.category {
                Some(category) => document.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .map(|(document, vector)| {
                debug_assert_eq!(vector.generation, self.generation, "stale document vector");
                debug_assert_eq!(vector.weights.len(), self.terms.len());
                (document, cosine_similarity(&query_vector, &vector.weights))
            })
            .collect();

        rank(candidates, query.top_k, query.min_score)
            .into_iter()
            .map(|(document, score)| SearchResult::new(document.clone(), score))
            .collect()
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    pub fn terms(&self) -> &TermIndex {
        &self.terms
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents.iter().any(|document| document.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            tenant_id: self.tenant_id.clone(),
            generation: self.generation,
            document_count: self.documents.len(),
            vocabulary_size: self.terms.len(),
            built_at: self.built_at,
        }
    }
}
