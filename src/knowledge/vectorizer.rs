//! TF-IDF vectorization of documents and queries

use super::models::KnowledgeDocument;
use super::tfidf::{term_frequencies, TermIndex};
use super::tokenizer::tokenize;

/// Dense TF-IDF vector of `text` over the current vocabulary.
///
/// Terms outside the vocabulary contribute nothing. The result always has `terms.len()` entries.
pub fn vectorize(text: &str, terms: &TermIndex) -> Vec<f64> {
    let mut vector = vec![0.0; terms.len()];
    let tokens = tokenize(text);

    for (term, tf) in term_frequencies(&tokens) {
        if let Some(column) = terms.column(term) {
            vector[column] = tf * terms.idf_at(column);
        }
    }

    vector
}

/// Text a stored document is vectorized from; the title counts twice
pub fn document_text(document: &KnowledgeDocument) -> String {
    format!("{} {} {}", document.title, document.title, document.content)
}

/// Vector of a stored document, with title emphasis
pub fn vectorize_document(document: &KnowledgeDocument, terms: &TermIndex) -> Vec<f64> {
    vectorize(&document_text(document), terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> TermIndex {
        TermIndex::build(&[
            KnowledgeDocument::new(1, "Return policy", "Items may be returned within 30 days."),
            KnowledgeDocument::new(2, "Gift cards", "Gift cards never expire."),
        ])
    }

    #[test]
    fn test_vector_length_matches_vocabulary() {
        let terms = terms();
        assert_eq!(vectorize("return my gift", &terms).len(), terms.len());
        assert_eq!(vectorize("", &terms).len(), terms.len());
    }

    #[test]
    fn test_unknown_terms_are_ignored() {
        let terms = terms();
        let vector = vectorize("quantum physics lecture", &terms);
        assert!(vector.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_weight_is_tf_times_idf() {
        let terms = terms();
        let vector = vectorize("gift policy policy", &terms);

        let gift = terms.column("gift").unwrap();
        let policy = terms.column("policy").unwrap();
        assert!((vector[gift] - terms.idf("gift").unwrap() / 3.0).abs() < 1e-12);
        assert!((vector[policy] - 2.0 * terms.idf("policy").unwrap() / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_title_counts_twice() {
        let doc =
            KnowledgeDocument::new(1, "Return policy", "Items may be returned within 30 days.");
        let terms = terms();
        let vector = vectorize_document(&doc, &terms);

        let title_term = terms.column("policy").unwrap();
        let body_term = terms.column("items").unwrap();
        // Both terms have df = 1 so their ratio is the ratio of term frequencies
        assert!((vector[title_term] / vector[body_term] - 2.0).abs() < 1e-12);
    }
}
