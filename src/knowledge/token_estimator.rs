//! Token estimation for prompt budgets

use crate::config::TokenEstimator as TokenEstimatorConfig;

/// Approximates how many LLM tokens a prompt fragment costs
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    config: TokenEstimatorConfig,
}

impl TokenEstimator {
    pub fn new(config: TokenEstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimate token count for text
    pub fn estimate(&self, text: &str) -> usize {
        match self.config {
            TokenEstimatorConfig::CharacterBased { chars_per_token } => {
                let char_count = text.chars().count();
                (char_count as f32 / chars_per_token).ceil() as usize
            }
            TokenEstimatorConfig::WordBased { words_per_token } => {
                let word_count = text.split_whitespace().count();
                (word_count as f32 / words_per_token).ceil() as usize
            }
        }
    }

    /// Whether `text` fits in what is left of `budget` after `used` tokens
    pub fn fits(&self, text: &str, used: usize, budget: usize) -> bool {
        used + self.estimate(text) <= budget
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(TokenEstimatorConfig::default())
    }
}
