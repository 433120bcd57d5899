//! Knowledge Retrieval Server Binary
//!
//! Serves tenant knowledge search and RAG context over HTTP with authentication,
//! rate limiting, health checks and Prometheus metrics.

use anyhow::Context;
use knowledge_retrieval::{
    api::{build_router, AppState},
    config::Config,
    knowledge::{IndexManager, KnowledgeIndex, RagAssembler},
    middleware::{AuthConfig, AuthMiddleware, RateLimitConfig, RateLimiter},
    observability::{init_observability, HealthChecker, MetricsCollector},
    store::{DocumentStore, GuardedStore, InMemoryDocumentStore},
};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let from_file = Path::new(&config_path).exists();
    let config = if from_file {
        Config::from_file_with_env(&config_path)
            .with_context(|| format!("failed to load configuration from {}", config_path))?
    } else {
        let config = Config::default_config();
        config.validate().context("default configuration is invalid, set KNOWLEDGE_API_TOKENS")?;
        config
    };

    init_observability(&config.logging.level, &config.logging.format);
    info!("Starting Knowledge Retrieval Server");
    if from_file {
        info!("Configuration loaded and validated from {}", config_path);
    } else {
        warn!("No configuration file at {}, using defaults", config_path);
    }

    let metrics = Arc::new(MetricsCollector::new());

    let documents = match &config.store.seed_path {
        Some(path) => InMemoryDocumentStore::from_seed_file(path)
            .with_context(|| format!("failed to seed document store from {}", path))?,
        None => InMemoryDocumentStore::new(),
    };
    let guarded = GuardedStore::new(Arc::new(documents), &config.store);
    let circuit_breaker = guarded.breaker();
    let store: Arc<dyn DocumentStore> = Arc::new(guarded);
    info!("Document store initialized");

    let index = Arc::new(
        IndexManager::new(&config.retrieval, store.clone()).with_metrics(metrics.clone()),
    );
    let rag = Arc::new(
        RagAssembler::new(index.clone() as Arc<dyn KnowledgeIndex>, config.rag.clone())
            .with_metrics(metrics.clone()),
    );
    info!("Index manager initialized");

    let mut health_checker = HealthChecker::new().with_store(store).with_index(index.clone());
    if let Some(breaker) = &circuit_breaker {
        health_checker = health_checker.with_circuit_breaker(breaker.clone());
    }

    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));
    rate_limiter.clone().start_cleanup_task();
    info!("Rate limiter initialized with cleanup task");

    let auth = Arc::new(AuthMiddleware::new(AuthConfig::from(&config.auth)));
    info!("Authentication initialized with {} tokens", auth.token_count());

    let app_state = AppState {
        index,
        rag,
        retrieval: config.retrieval.clone(),
        health_checker: Arc::new(health_checker),
        metrics,
        circuit_breaker,
    };

    let max_body_bytes = config.server.max_body_size_mb * 1024 * 1024;
    let app = build_router(app_state, rate_limiter, auth, max_body_bytes);

    let listen = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address {}", listen))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }

    info!("Starting graceful shutdown");
}
