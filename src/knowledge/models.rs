//! Data models for knowledge retrieval

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an article within one tenant's corpus
pub type DocumentId = i64;

/// Knowledge base article as handed to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Unique within a tenant
    pub id: DocumentId,

    /// Short title, always present
    pub title: String,

    /// Body text, indexed in full
    pub content: String,

    /// Optional label used for post-filtering only
    #[serde(default)]
    pub category: Option<String>,

    /// Free-form tags, not used in scoring
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeDocument {
    pub fn new(id: DocumentId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Parameters of one similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query
    pub text: String,

    /// Maximum number of results
    pub top_k: usize,

    /// Results scoring below this are dropped
    pub min_score: f64,

    /// Only keep documents in this category
    #[serde(default)]
    pub category: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: 5,
            min_score: 0.1,
            category: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A ranked match, built fresh for every search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: KnowledgeDocument,

    /// Cosine similarity in [0, 1]
    pub score: f64,

    /// `round(score * 100)`
    pub relevance_score: u32,
}

impl SearchResult {
    pub fn new(document: KnowledgeDocument, score: f64) -> Self {
        Self {
            document,
            score,
            relevance_score: (score * 100.0).round() as u32,
        }
    }
}

/// Article excerpt prepared for prompt injection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagArticle {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub relevance_score: u32,
}

impl From<SearchResult> for RagArticle {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.document.title,
            content: result.document.content,
            category: result.document.category,
            relevance_score: result.relevance_score,
        }
    }
}

/// Retrieval outcome handed to response generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagContext {
    /// Articles ordered by relevance
    pub knowledge_articles: Vec<RagArticle>,

    /// Results that passed the relevance threshold
    pub total_articles_found: usize,

    /// True iff at least one article passed the threshold
    pub context_used: bool,

    /// Retrieval time in milliseconds
    #[serde(default)]
    pub retrieval_time_ms: u64,
}

impl RagContext {
    /// Context returned when retrieval fails or finds nothing
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Summary of one resident tenant index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub tenant_id: String,
    pub generation: u64,
    pub document_count: usize,
    pub vocabulary_size: usize,
    pub built_at: DateTime<Utc>,
}
