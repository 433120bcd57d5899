//! Circuit breaker for document store calls

use crate::config::CircuitBreakerSettings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Loads go through
    Closed,

    /// Loads are rejected without touching the store
    Open,

    /// Probing whether the store recovered
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Gauge value: 0 closed, 1 half-open, 2 open
    fn gauge(&self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: usize,

    /// Half-open successes that close it again
    pub success_threshold: usize,

    /// Time spent open before the next probe
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&CircuitBreakerSettings::default())
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            success_threshold: settings.success_threshold,
            open_timeout: Duration::from_secs(settings.open_timeout_secs),
        }
    }
}

#[derive(Debug)]
struct Transitions {
    state: CircuitState,
    consecutive_failures: usize,
    half_open_successes: usize,
    opened_at: Option<Instant>,
}

impl Transitions {
    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.half_open_successes = 0;
    }
}

/// Trips after repeated store failures so a dead store is not hammered on every search.
///
/// All transitions happen under one lock, so state and counters never disagree.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    transitions: Mutex<Transitions>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejected: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            transitions: Mutex::new(Transitions {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    /// Whether the next store call may proceed; moves Open to HalfOpen once the timeout elapsed
    pub async fn allow_request(&self) -> bool {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let mut t = self.transitions.lock().await;

        match t.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = t
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.open_timeout);
                if elapsed {
                    t.state = CircuitState::HalfOpen;
                    t.half_open_successes = 0;
                    debug!("Document store circuit half-open, probing");
                    true
                } else {
                    self.total_rejected.fetch_add(1, Ordering::Relaxed);
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut t = self.transitions.lock().await;

        match t.state {
            CircuitState::Closed => t.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                t.half_open_successes += 1;
                if t.half_open_successes >= self.config.success_threshold {
                    t.state = CircuitState::Closed;
                    t.consecutive_failures = 0;
                    t.half_open_successes = 0;
                    t.opened_at = None;
                    debug!("Document store circuit closed after recovery");
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        let mut t = self.transitions.lock().await;

        match t.state {
            CircuitState::Closed => {
                t.consecutive_failures += 1;
                if t.consecutive_failures >= self.config.failure_threshold {
                    t.open();
                    warn!(
                        "Document store circuit opened after {} consecutive failures",
                        t.consecutive_failures
                    );
                }
            }
            CircuitState::HalfOpen => {
                t.open();
                warn!("Document store circuit reopened, probe failed");
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.transitions.lock().await.state
    }

    pub async fn stats(&self) -> CircuitBreakerStats {
        let t = self.transitions.lock().await;
        CircuitBreakerStats {
            state: t.state,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            consecutive_failures: t.consecutive_failures,
        }
    }

    /// Prometheus gauge and counters under `name`
    pub async fn export_prometheus(&self, name: &str) -> String {
        let stats = self.stats().await;

        format!(
            "# HELP {name}_state Circuit breaker state (0=closed, 1=half-open, 2=open)\n\
             # TYPE {name}_state gauge\n\
             {name}_state {}\n\
             \n\
             # HELP {name}_calls_total Calls through the circuit breaker\n\
             # TYPE {name}_calls_total counter\n\
             {name}_calls_total {}\n\
             \n\
             # HELP {name}_failures_total Failed store calls\n\
             # TYPE {name}_failures_total counter\n\
             {name}_failures_total {}\n\
             \n\
             # HELP {name}_rejected_total Calls rejected while open\n\
             # TYPE {name}_rejected_total counter\n\
             {name}_rejected_total {}\n",
            stats.state.gauge(),
            stats.total_calls,
            stats.total_failures,
            stats.total_rejected,
        )
    }

    pub async fn reset(&self) {
        let mut t = self.transitions.lock().await;
        t.state = CircuitState::Closed;
        t.consecutive_failures = 0;
        t.half_open_successes = 0;
        t.opened_at = None;
        debug!("Document store circuit reset");
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejected: u64,
    pub consecutive_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: usize, open_timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            success_threshold: 2,
            open_timeout,
        })
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let cb = breaker(3, Duration::from_secs(1));
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(cb.allow_request().await);
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let cb = breaker(3, Duration::from_secs(60));
        for _ in 0..3 {
            cb.record_failure().await;
        }

        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.allow_request().await);
        assert_eq!(cb.stats().await.total_rejected, 1);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failures() {
        let cb = breaker(3, Duration::from_secs(60));
        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_then_recovery() {
        let cb = breaker(2, Duration::from_millis(50));
        cb.record_failure().await;
        cb.record_failure().await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cb.allow_request().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.record_success().await;
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = breaker(1, Duration::from_millis(50));
        cb.record_failure().await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cb.allow_request().await);
        cb.record_failure().await;

        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.allow_request().await);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record_failure().await;

        let output = cb.export_prometheus("store_circuit").await;
        assert!(output.contains("store_circuit_state 2"));
        assert!(output.contains("store_circuit_failures_total 1"));
    }
}
