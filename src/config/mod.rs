//! Configuration management for the knowledge retrieval service

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use secrecy::{Secret, ExposeSecret};

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Search and index cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of tenant indexes kept resident (LRU). 1 keeps a single slot.
    #[serde(default = "default_tenant_cache_capacity")]
    pub tenant_cache_capacity: u64,

    /// Result count used when a search request does not specify one
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound accepted for a requested result count
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Minimum cosine score used when a search request does not specify one
    #[serde(default = "default_min_score")]
    pub default_min_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            tenant_cache_capacity: default_tenant_cache_capacity(),
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            default_min_score: default_min_score(),
        }
    }
}

/// Retrieval-augmented generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Articles injected into a prompt by default
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Minimum cosine score for an article to be injected
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,

    /// Token budget for the rendered context block
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Article bodies longer than this are cut before rendering
    #[serde(default = "default_max_article_chars")]
    pub max_article_chars: usize,

    /// Token estimation method
    #[serde(default)]
    pub token_estimator: TokenEstimator,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
            min_relevance: default_min_relevance(),
            max_context_tokens: default_max_context_tokens(),
            max_article_chars: default_max_article_chars(),
            token_estimator: TokenEstimator::default(),
        }
    }
}

/// Token estimation methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenEstimator {
    CharacterBased { chars_per_token: f32 },
    WordBased { words_per_token: f32 },
}

impl Default for TokenEstimator {
    fn default() -> Self {
        TokenEstimator::CharacterBased { chars_per_token: 4.0 }
    }
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file of `{ "<tenant>": [articles...] }` loaded at startup
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Timeout for one document load in seconds
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,

    /// Circuit breaker around the document store
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            load_timeout_secs: default_load_timeout(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

impl StoreConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,

    /// Successes in half-open state that close the circuit
    #[serde(default = "default_success_threshold")]
    pub success_threshold: usize,

    /// Seconds the circuit stays open before probing again
    #[serde(default = "default_open_timeout")]
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_timeout_secs: default_open_timeout(),
        }
    }
}

/// API authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Accepted bearer tokens (secured)
    #[serde(
        default,
        serialize_with = "serialize_secret_list",
        deserialize_with = "deserialize_secret_list"
    )]
    pub api_tokens: Vec<Secret<String>>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_tokens: Vec::new(),
        }
    }
}

/// Per-client request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window")]
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Server host
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size")]
    pub max_body_size_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            host: default_server_host(),
            max_body_size_mb: default_max_body_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_tenant_cache_capacity() -> u64 { 16 }
fn default_top_k() -> usize { 5 }
fn default_max_top_k() -> usize { 50 }
fn default_min_score() -> f64 { 0.1 }
fn default_max_articles() -> usize { 3 }
fn default_min_relevance() -> f64 { 0.1 }
fn default_max_context_tokens() -> usize { 1500 }
fn default_max_article_chars() -> usize { 2000 }
fn default_load_timeout() -> u64 { 10 }
fn default_failure_threshold() -> usize { 5 }
fn default_success_threshold() -> usize { 2 }
fn default_open_timeout() -> u64 { 30 }
fn default_max_requests() -> usize { 120 }
fn default_window() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }
fn default_server_port() -> u16 { 8080 }
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_max_body_size() -> usize { 4 }

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config_with_env(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            rag: RagConfig::default(),
            store: StoreConfig::default(),
            auth: AuthSettings {
                enabled: true,
                api_tokens: tokens_from_env(),
            },
            rate_limit: RateLimitSettings::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Comma separated tokens from `KNOWLEDGE_API_TOKENS`
pub(crate) fn tokens_from_env() -> Vec<Secret<String>> {
    std::env::var("KNOWLEDGE_API_TOKENS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Secret::new(t.to_string()))
        .collect()
}

/// Custom serializer for a list of secrets
#[allow(clippy::ptr_arg)]
fn serialize_secret_list<S>(secrets: &Vec<Secret<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(secrets.len()))?;
    for secret in secrets {
        seq.serialize_element(secret.expose_secret())?;
    }
    seq.end()
}

/// Custom deserializer for a list of secrets
fn deserialize_secret_list<'de, D>(deserializer: D) -> Result<Vec<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(Secret::new).collect())
}
