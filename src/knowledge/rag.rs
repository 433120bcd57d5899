//! Retrieval-augmented generation context assembly

use super::models::{RagArticle, RagContext, SearchQuery};
use super::token_estimator::TokenEstimator;
use super::KnowledgeIndex;
use crate::config::RagConfig;
use crate::observability::MetricsCollector;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const CONTEXT_HEADER: &str = "## Relevant Knowledge Base Articles\n\n\
    Use the following articles to answer the customer. \
    Do not invent policies they do not state.\n";
const TRUNCATION_MARKER: &str = "...";

/// Turns a ticket query into grounding context for response generation.
///
/// Retrieval is an optional augmentation. Every failure degrades to an empty context.
pub struct RagAssembler {
    index: Arc<dyn KnowledgeIndex>,
    config: RagConfig,
    estimator: TokenEstimator,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RagAssembler {
    pub fn new(index: Arc<dyn KnowledgeIndex>, config: RagConfig) -> Self {
        let estimator = TokenEstimator::new(config.token_estimator);
        Self {
            index,
            config,
            estimator,
            metrics: None,
        }
    }

    /// Set metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Search the tenant's knowledge base and map the hits into a [`RagContext`].
    ///
    /// `max_articles` becomes the search `top_k` and `min_relevance` its `min_score`.
    pub async fn build_context(
        &self,
        tenant_id: &str,
        query: &str,
        max_articles: usize,
        min_relevance: f64,
    ) -> RagContext {
        let start = Instant::now();
        let search = SearchQuery::new(query)
            .with_top_k(max_articles)
            .with_min_score(min_relevance);

        let results = match self.index.search(tenant_id, &search).await {
            Ok(results) => results,
            Err(e) => {
                warn!(
                    "Knowledge retrieval failed for tenant {}, continuing without context: {}",
                    tenant_id, e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rag_request(false, true);
                }
                return RagContext::empty();
            }
        };

        let total_articles_found = results.len();
        let context = RagContext {
            knowledge_articles: results.into_iter().map(RagArticle::from).collect(),
            total_articles_found,
            context_used: total_articles_found > 0,
            retrieval_time_ms: start.elapsed().as_millis() as u64,
        };

        debug!(
            "Assembled RAG context for tenant {}: {} articles in {}ms",
            tenant_id, context.total_articles_found, context.retrieval_time_ms
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_rag_request(context.context_used, false);
        }

        context
    }

    /// [`build_context`](Self::build_context) with the configured article count and threshold
    pub async fn build_default_context(&self, tenant_id: &str, query: &str) -> RagContext {
        self.build_context(tenant_id, query, self.config.max_articles, self.config.min_relevance)
            .await
    }

    /// Render the context as a numbered prompt block.
    ///
    /// Article bodies are cut at `max_article_chars`. Articles are appended in relevance order
    /// while the estimated size stays within `max_context_tokens`. Returns an empty string when
    /// no context was used or not even the first article fits.
    pub fn format_context(&self, context: &RagContext) -> String {
        if !context.context_used || context.knowledge_articles.is_empty() {
            return String::new();
        }

        let mut output = String::from(CONTEXT_HEADER);
        let mut used = self.estimator.estimate(&output);
        let mut included = 0;

        for (position, article) in context.knowledge_articles.iter().enumerate() {
            let block = self.format_article(position + 1, article);
            if !self.estimator.fits(&block, used, self.config.max_context_tokens) {
                debug!(
                    "Context budget of {} tokens reached after {} articles",
                    self.config.max_context_tokens, included
                );
                break;
            }
            used += self.estimator.estimate(&block);
            output.push_str(&block);
            included += 1;
        }

        if included == 0 {
            return String::new();
        }
        output
    }

    fn format_article(&self, number: usize, article: &RagArticle) -> String {
        let category = article
            .category
            .as_deref()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();

        format!(
            "\n### Article {}: {}{} (relevance {}%)\n{}\n",
            number,
            article.title,
            category,
            article.relevance_score,
            truncate_chars(&article.content, self.config.max_article_chars)
        )
    }
}

/// Cut `text` to at most `max_chars` characters, never splitting a code point
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", text[..byte_index].trim_end(), TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
