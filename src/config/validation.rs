//! Configuration validation

use super::*;
use crate::error::{RetrievalError, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_retrieval_config(&config.retrieval)?;
    validate_rag_config(&config.rag)?;
    validate_store_config(&config.store)?;
    validate_auth_settings(&config.auth)?;
    validate_rate_limit_settings(&config.rate_limit)?;
    validate_server_config(&config.server)?;
    Ok(())
}

fn invalid(message: impl Into<String>) -> RetrievalError {
    RetrievalError::Config(message.into())
}

fn validate_score(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{} must be between 0.0 and 1.0", name)));
    }
    Ok(())
}

/// Validate search and cache settings
fn validate_retrieval_config(config: &RetrievalConfig) -> Result<()> {
    if config.tenant_cache_capacity == 0 {
        return Err(invalid("Tenant cache capacity must be greater than 0"));
    }

    if config.tenant_cache_capacity > 10_000 {
        return Err(invalid("Tenant cache capacity too large (max: 10000)"));
    }

    if config.max_top_k == 0 {
        return Err(invalid("Max top_k must be greater than 0"));
    }

    if config.default_top_k == 0 || config.default_top_k > config.max_top_k {
        return Err(invalid(format!(
            "Default top_k must be between 1 and {}",
            config.max_top_k
        )));
    }

    validate_score("Default min score", config.default_min_score)
}

/// Validate RAG settings
fn validate_rag_config(config: &RagConfig) -> Result<()> {
    if config.max_articles == 0 {
        return Err(invalid("RAG max articles must be greater than 0"));
    }

    validate_score("RAG min relevance", config.min_relevance)?;

    if config.max_context_tokens == 0 {
        return Err(invalid("RAG context token budget must be greater than 0"));
    }

    if config.max_article_chars == 0 {
        return Err(invalid("RAG article character limit must be greater than 0"));
    }

    match config.token_estimator {
        TokenEstimator::CharacterBased { chars_per_token } if chars_per_token <= 0.0 => {
            Err(invalid("chars_per_token must be positive"))
        }
        TokenEstimator::WordBased { words_per_token } if words_per_token <= 0.0 => {
            Err(invalid("words_per_token must be positive"))
        }
        _ => Ok(()),
    }
}

/// Validate document store settings
fn validate_store_config(config: &StoreConfig) -> Result<()> {
    if config.load_timeout_secs == 0 {
        return Err(invalid("Document load timeout must be greater than 0"));
    }

    if config.load_timeout_secs > 300 {
        return Err(invalid("Document load timeout too large (max: 300 seconds)"));
    }

    if let Some(path) = &config.seed_path {
        if path.trim().is_empty() {
            return Err(invalid("Seed path cannot be empty when set"));
        }
    }

    let breaker = &config.circuit_breaker;
    if breaker.enabled {
        if breaker.failure_threshold == 0 || breaker.success_threshold == 0 {
            return Err(invalid("Circuit breaker thresholds must be greater than 0"));
        }
        if breaker.open_timeout_secs == 0 {
            return Err(invalid("Circuit breaker open timeout must be greater than 0"));
        }
    }

    Ok(())
}

/// Validate authentication settings
fn validate_auth_settings(config: &AuthSettings) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.api_tokens.is_empty() {
        return Err(invalid("Authentication is enabled but no API tokens are configured"));
    }

    if config.api_tokens.iter().any(|t| t.expose_secret().trim().is_empty()) {
        return Err(invalid("API tokens cannot be empty"));
    }

    Ok(())
}

/// Validate rate limit settings
fn validate_rate_limit_settings(config: &RateLimitSettings) -> Result<()> {
    if config.enabled && (config.max_requests == 0 || config.window_secs == 0) {
        return Err(invalid("Rate limit requests and window must be greater than 0"));
    }
    Ok(())
}

/// Validate server configuration
pub fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if config.host.is_empty() {
        return Err(invalid("Server host cannot be empty"));
    }

    if config.max_body_size_mb == 0 || config.max_body_size_mb > 100 {
        return Err(invalid("Max body size must be between 1 and 100 MB"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn valid_config() -> Config {
        let mut config = Config::default_config();
        config.auth.api_tokens = vec![Secret::new("test_token".to_string())];
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_auth_requires_tokens() {
        let mut config = valid_config();
        config.auth.api_tokens.clear();
        assert!(validate_auth_settings(&config.auth).is_err());

        config.auth.enabled = false;
        assert!(validate_auth_settings(&config.auth).is_ok());
    }

    #[test]
    fn test_invalid_cache_capacity() {
        let mut config = valid_config();
        config.retrieval.tenant_cache_capacity = 0;
        assert!(validate_retrieval_config(&config.retrieval).is_err());
    }

    #[test]
    fn test_default_top_k_bounded_by_max() {
        let mut config = valid_config();
        config.retrieval.default_top_k = config.retrieval.max_top_k + 1;
        assert!(validate_retrieval_config(&config.retrieval).is_err());
    }

    #[test]
    fn test_invalid_min_relevance() {
        let mut config = valid_config();
        config.rag.min_relevance = 1.5;
        assert!(validate_rag_config(&config.rag).is_err());
    }

    #[test]
    fn test_invalid_token_estimator() {
        let mut config = valid_config();
        config.rag.token_estimator = TokenEstimator::CharacterBased { chars_per_token: 0.0 };
        assert!(validate_rag_config(&config.rag).is_err());
    }

    #[test]
    fn test_invalid_load_timeout() {
        let mut config = valid_config();
        config.store.load_timeout_secs = 0;
        assert!(validate_store_config(&config.store).is_err());
    }

    #[test]
    fn test_invalid_port() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(validate_server_config(&config.server).is_err());
    }
}
