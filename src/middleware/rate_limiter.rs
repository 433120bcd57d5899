//! Fixed-window rate limiting per client

use crate::config::RateLimitSettings;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: usize,
    pub window_duration: Duration,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from(&RateLimitSettings::default())
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_duration: Duration::from_secs(settings.window_secs),
            enabled: settings.enabled,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: usize,
    started: Instant,
}

/// Counts requests per client key in fixed windows
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Count one request for `client_id`, rejecting it once the window is full
    pub fn check(&self, client_id: &str) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut window = self.windows.entry(client_id.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) >= self.config.window_duration {
            *window = Window { count: 0, started: now };
        }

        if window.count >= self.config.max_requests {
            let retry_after = self
                .config
                .window_duration
                .saturating_sub(now.duration_since(window.started));
            warn!(
                "Rate limit exceeded for client {} ({} requests in window)",
                client_id, window.count
            );
            return Err(RateLimitError::LimitExceeded {
                retry_after,
                limit: self.config.max_requests,
            });
        }

        window.count += 1;
        debug!(
            "Request allowed for client {} ({}/{})",
            client_id, window.count, self.config.max_requests
        );
        Ok(())
    }

    /// Requests counted in the client's current window
    pub fn usage(&self, client_id: &str) -> usize {
        self.windows.get(client_id).map_or(0, |window| window.count)
    }

    /// Drop windows that have ended
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < self.config.window_duration);
        debug!("Dropped {} expired rate limit windows", before.saturating_sub(self.windows.len()));
    }

    /// Periodically drop expired windows
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.window_duration);
            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Retry after {retry_after:?}. Limit: {limit} requests per window")]
    LimitExceeded { retry_after: Duration, limit: usize },
}

impl RateLimitError {
    /// Whole seconds for a `Retry-After` header, at least 1
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateLimitError::LimitExceeded { retry_after, .. } => retry_after.as_secs().max(1),
        }
    }
}
