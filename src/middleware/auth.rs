//! Bearer token authentication
//!
//! Tokens are never kept in plain text. Only their SHA-256 digests are stored and compared.

use crate::config::AuthSettings;
use dashmap::DashSet;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const BEARER_PREFIX: &str = "Bearer ";

/// Hex SHA-256 digest of a token
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,

    /// Plain tokens, digested on construction
    pub tokens: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tokens: Vec::new(),
        }
    }
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            enabled: settings.enabled,
            tokens: settings
                .api_tokens
                .iter()
                .map(|token| token.expose_secret().clone())
                .collect(),
        }
    }
}

/// Validates `Authorization` headers against the accepted token digests
pub struct AuthMiddleware {
    enabled: bool,
    digests: DashSet<String>,
}

impl AuthMiddleware {
    pub fn new(config: AuthConfig) -> Self {
        let digests = DashSet::new();
        for token in &config.tokens {
            digests.insert(token_digest(token));
        }

        Self {
            enabled: config.enabled,
            digests,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check an `Authorization` header value; the `Bearer ` prefix is optional
    pub fn authenticate(&self, header: Option<&str>) -> Result<(), AuthError> {
        if !self.enabled {
            return Ok(());
        }

        let token = header
            .map(|value| value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim())
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        if self.digests.contains(&token_digest(token)) {
            debug!("Authentication successful");
            Ok(())
        } else {
            warn!("Authentication failed: invalid token");
            Err(AuthError::InvalidToken)
        }
    }

    pub fn add_token(&self, token: &str) {
        self.digests.insert(token_digest(token));
        debug!("Token added to valid tokens");
    }

    pub fn revoke_token(&self, token: &str) -> bool {
        let removed = self.digests.remove(&token_digest(token)).is_some();
        if removed {
            debug!("Token revoked");
        }
        removed
    }

    pub fn token_count(&self) -> usize {
        self.digests.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication is required but no token provided")]
    MissingToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn auth(tokens: &[&str]) -> AuthMiddleware {
        AuthMiddleware::new(AuthConfig {
            enabled: true,
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        })
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_valid_token_with_and_without_prefix() {
        let auth = auth(&["kb-token-123"]);
        assert!(auth.authenticate(Some("Bearer kb-token-123")).is_ok());
        assert!(auth.authenticate(Some("kb-token-123")).is_ok());
    }

    #[test]
    fn test_invalid_and_missing_token() {
        let auth = auth(&["kb-token-123"]);
        assert!(matches!(auth.authenticate(Some("Bearer nope")), Err(AuthError::InvalidToken)));
        assert!(matches!(auth.authenticate(None), Err(AuthError::MissingToken)));
        assert!(matches!(auth.authenticate(Some("Bearer ")), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_disabled_auth() {
        let auth = AuthMiddleware::new(AuthConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(auth.authenticate(None).is_ok());
    }

    #[test]
    fn test_add_revoke_token() {
        let auth = auth(&[]);
        auth.add_token("rotated");
        assert!(auth.authenticate(Some("Bearer rotated")).is_ok());

        assert!(auth.revoke_token("rotated"));
        assert!(auth.authenticate(Some("Bearer rotated")).is_err());
        assert_eq!(auth.token_count(), 0);
    }

    #[test]
    fn test_from_settings() {
        let settings = AuthSettings {
            enabled: true,
            api_tokens: vec![Secret::new("from-config".to_string())],
        };
        let auth = AuthMiddleware::new(AuthConfig::from(&settings));
        assert!(auth.authenticate(Some("Bearer from-config")).is_ok());
    }
}
