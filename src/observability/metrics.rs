//! Metrics collection and Prometheus export

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const PREFIX: &str = "knowledge_retrieval";

/// Snapshot of the collected counters
#[derive(Debug, Clone)]
pub struct SystemMetrics {
    /// HTTP requests processed
    pub total_requests: u64,

    /// HTTP requests that ended in an error response
    pub total_errors: u64,

    pub searches: u64,
    pub search_errors: u64,

    /// Resident index hit rate
    pub cache_hit_rate: f64,

    pub index_builds: u64,
    pub store_errors: u64,

    pub rag_requests: u64,
    pub rag_degraded: u64,
    pub rag_context_used: u64,

    /// Average search latency (ms)
    pub avg_search_time_ms: f64,

    pub uptime_secs: u64,
}

/// Latency histogram buckets (in milliseconds)
const LATENCY_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// Cumulative latency histogram
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new(buckets: &[f64]) -> Self {
        Self {
            buckets: buckets.iter().map(|&b| (b, AtomicU64::new(0))).collect(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        self.sum_micros.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (bucket, counter) in &self.buckets {
            if ms <= *bucket {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn sum_ms(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    fn export_prometheus(&self, name: &str, help: &str) -> String {
        let mut output = String::new();

        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} histogram\n", name));

        for (bucket, counter) in &self.buckets {
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                name,
                bucket,
                counter.load(Ordering::Relaxed)
            ));
        }

        let total = self.count();
        output.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, total));
        output.push_str(&format!("{}_sum {:.3}\n", name, self.sum_ms()));
        output.push_str(&format!("{}_count {}\n", name, total));

        output
    }
}

/// Lock-free counters shared by the index manager, RAG assembler and HTTP layer
pub struct MetricsCollector {
    start_time: Instant,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    search_errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    store_errors: AtomicU64,
    rag_requests: AtomicU64,
    rag_degraded: AtomicU64,
    rag_context_used: AtomicU64,

    request_latency: Histogram,
    search_latency: Histogram,
    index_build_latency: Histogram,
    store_load_latency: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            search_errors: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            rag_requests: AtomicU64::new(0),
            rag_degraded: AtomicU64::new(0),
            rag_context_used: AtomicU64::new(0),
            request_latency: Histogram::new(LATENCY_BUCKETS),
            search_latency: Histogram::new(LATENCY_BUCKETS),
            index_build_latency: Histogram::new(LATENCY_BUCKETS),
            store_load_latency: Histogram::new(LATENCY_BUCKETS),
        }
    }

    /// Record an HTTP request
    pub fn record_request(&self, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.request_latency.observe(response_time);
    }

    /// Record an HTTP error response
    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed search
    pub fn record_search(&self, duration: Duration) {
        self.search_latency.observe(duration);
    }

    pub fn record_search_error(&self) {
        self.search_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A resident index served the request
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// The tenant index had to be built
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_index_build(&self, duration: Duration) {
        self.index_build_latency.observe(duration);
    }

    pub fn record_store_load(&self, duration: Duration) {
        self.store_load_latency.observe(duration);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one context assembly
    pub fn record_rag_request(&self, context_used: bool, degraded: bool) {
        self.rag_requests.fetch_add(1, Ordering::Relaxed);
        if context_used {
            self.rag_context_used.fetch_add(1, Ordering::Relaxed);
        }
        if degraded {
            self.rag_degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_metrics(&self) -> SystemMetrics {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;
        let cache_hit_rate = if cache_total > 0 {
            cache_hits as f64 / cache_total as f64
        } else {
            0.0
        };

        let searches = self.search_latency.count();
        let avg_search_time_ms = if searches > 0 {
            self.search_latency.sum_ms() / searches as f64
        } else {
            0.0
        };

        SystemMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            searches,
            search_errors: self.search_errors.load(Ordering::Relaxed),
            cache_hit_rate,
            index_builds: self.index_build_latency.count(),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            rag_requests: self.rag_requests.load(Ordering::Relaxed),
            rag_degraded: self.rag_degraded.load(Ordering::Relaxed),
            rag_context_used: self.rag_context_used.load(Ordering::Relaxed),
            avg_search_time_ms,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let m = self.get_metrics();
        let mut output = String::new();

        let scalars: [(&str, &str, &str, String); 12] = [
            ("requests_total", "counter", "Total HTTP requests", m.total_requests.to_string()),
            (
                "errors_total",
                "counter",
                "HTTP requests answered with an error",
                m.total_errors.to_string(),
            ),
            ("searches_total", "counter", "Completed knowledge searches", m.searches.to_string()),
            (
                "search_errors_total",
                "counter",
                "Searches that failed to build an index",
                m.search_errors.to_string(),
            ),
            (
                "index_cache_hit_rate",
                "gauge",
                "Share of lookups served by a resident index",
                format!("{:.4}", m.cache_hit_rate),
            ),
            ("index_builds_total", "counter", "Tenant index rebuilds", m.index_builds.to_string()),
            (
                "store_errors_total",
                "counter",
                "Failed document store loads",
                m.store_errors.to_string(),
            ),
            ("rag_requests_total", "counter", "RAG context assemblies", m.rag_requests.to_string()),
            (
                "rag_degraded_total",
                "counter",
                "RAG assemblies that fell back to an empty context",
                m.rag_degraded.to_string(),
            ),
            (
                "rag_context_used_total",
                "counter",
                "RAG assemblies that found at least one article",
                m.rag_context_used.to_string(),
            ),
            (
                "avg_search_time_ms",
                "gauge",
                "Average search latency in milliseconds",
                format!("{:.2}", m.avg_search_time_ms),
            ),
            ("uptime_seconds", "counter", "Uptime in seconds", m.uptime_secs.to_string()),
        ];

        for (name, kind, help, value) in scalars {
            let metric = format!("{PREFIX}_{name}");
            output.push_str(&format!(
                "# HELP {metric} {help}\n# TYPE {metric} {kind}\n{metric} {value}\n\n"
            ));
        }

        let histograms = [
            (
                &self.request_latency,
                "request_duration_ms",
                "HTTP request duration in milliseconds",
            ),
            (
                &self.search_latency,
                "search_duration_ms",
                "Search duration in milliseconds",
            ),
            (
                &self.index_build_latency,
                "index_build_duration_ms",
                "Tenant index build duration in milliseconds",
            ),
            (
                &self.store_load_latency,
                "store_load_duration_ms",
                "Document store load duration in milliseconds",
            ),
        ];

        for (histogram, name, help) in histograms {
            output.push_str(&histogram.export_prometheus(&format!("{PREFIX}_{name}"), help));
            output.push('\n');
        }

        output
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
