//! Cosine similarity and result ranking

use std::cmp::Ordering;

/// Cosine similarity of two equally sized vectors.
///
/// Returns 0 when either vector has zero norm. For non-negative weights the result lies in
/// [0, 1]; rounding noise is clamped away.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors from different vocabularies");

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Keep candidates scoring at least `min_score`, sort by score descending, keep `top_k`.
///
/// Filtering happens before truncation. Equal scores keep their input order.
pub fn rank<T>(candidates: Vec<(T, f64)>, top_k: usize, min_score: f64) -> Vec<(T, f64)> {
    let mut kept: Vec<(T, f64)> = candidates
        .into_iter()
        .filter(|(_, score)| *score >= min_score)
        .collect();

    kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    kept.truncate(top_k);
    kept
}
