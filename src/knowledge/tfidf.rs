//! Term frequency and inverse document frequency tables

use super::models::KnowledgeDocument;
use super::tokenizer::tokenize;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};

/// Normalized term frequencies of a token list.
///
/// Each count is divided by the total token count, so values sum to 1. An empty token list
/// yields an empty map, which callers treat as the zero vector.
pub fn term_frequencies(tokens: &[String]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    if tokens.is_empty() {
        return counts;
    }

    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }

    let total = tokens.len() as f64;
    for value in counts.values_mut() {
        *value /= total;
    }
    counts
}

/// Smoothed IDF: `ln((N + 1) / (df + 1)) + 1`, positive even when `df == N`
pub fn smoothed_idf(document_count: usize, document_frequency: usize) -> f64 {
    ((document_count as f64 + 1.0) / (document_frequency as f64 + 1.0)).ln() + 1.0
}

/// Vocabulary and IDF weights of one corpus snapshot.
///
/// A term's column is its position in the vocabulary; `idf[column]` is its weight.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    vocabulary: IndexSet<String>,
    document_frequency: Vec<usize>,
    idf: Vec<f64>,
    document_count: usize,
}

impl TermIndex {
    /// Build vocabulary and IDF from scratch over `documents`.
    ///
    /// Document frequency counts each distinct term of `title + " " + content` once per document.
    /// Columns are assigned in first-seen order.
    pub fn build(documents: &[KnowledgeDocument]) -> Self {
        let mut vocabulary: IndexSet<String> = IndexSet::new();
        let mut document_frequency: Vec<usize> = Vec::new();

        for document in documents {
            let tokens = tokenize(&format!("{} {}", document.title, document.content));
            let mut seen: HashSet<&str> = HashSet::with_capacity(tokens.len());

            for token in &tokens {
                if !seen.insert(token.as_str()) {
                    continue;
                }
                let (column, inserted) = vocabulary.insert_full(token.clone());
                if inserted {
                    document_frequency.push(0);
                }
                document_frequency[column] += 1;
            }
        }

        let document_count = documents.len();
        let idf = document_frequency
            .iter()
            .map(|&df| smoothed_idf(document_count, df))
            .collect();

        Self {
            vocabulary,
            document_frequency,
            idf,
            document_count,
        }
    }

    /// Vocabulary size, i.e. the vector dimension
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Documents the table was built over
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains(term)
    }

    /// Column of `term`, if it is in the vocabulary
    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get_index_of(term)
    }

    /// IDF weight of `term`
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column(term).map(|column| self.idf[column])
    }

    /// IDF weight of the term in `column`
    pub fn idf_at(&self, column: usize) -> f64 {
        self.idf[column]
    }

    /// Number of documents containing `term`
    pub fn document_frequency(&self, term: &str) -> Option<usize> {
        self.column(term).map(|column| self.document_frequency[column])
    }

    /// Terms in column order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.iter().map(String::as_str)
    }
}
