//! Text normalization into index terms

/// Tokens shorter than this are dropped
pub const MIN_TERM_LENGTH: usize = 3;

/// Split text into normalized terms.
///
/// Lowercases, turns everything outside `[a-z0-9]` and whitespace into a space so punctuation
/// never glues words together, splits on whitespace and drops tokens of two characters or fewer.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    normalized
        .split_whitespace()
        .filter(|token| token.len() >= MIN_TERM_LENGTH)
        .map(str::to_owned)
        .collect()
}
