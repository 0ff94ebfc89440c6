//! ROSTER API Server Entry Point
//!
//! Bootstraps telemetry and configuration, builds the configured record
//! store and cache backend, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use roster_api::telemetry::{init_tracer, TelemetryConfig};
use roster_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, CacheBackendKind, DbClient, DbConfig,
    EmployeeCache, EmployeeService, StoreKind,
};
use roster_core::{EmployeeValidator, RosterError};
use roster_storage::{
    CacheBackend, EmployeeStore, InMemoryCacheBackend, InMemoryEmployeeStore, LmdbCacheBackend,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    tracing::info!(
        store = ?api_config.store,
        cache_backend = ?api_config.cache_backend,
        cache_ttl_secs = api_config.cache.ttl.as_secs(),
        "Configuration loaded"
    );

    match api_config.store {
        StoreKind::Postgres => {
            let db = DbClient::from_config(&DbConfig::from_env())?;
            db.migrate().await?;
            tracing::info!(pool_size = db.pool_size(), "PostgreSQL store ready");
            with_cache(Arc::new(db), api_config).await
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on shutdown");
            with_cache(Arc::new(InMemoryEmployeeStore::new()), api_config).await
        }
    }
}

async fn with_cache<S: EmployeeStore>(store: Arc<S>, config: ApiConfig) -> ApiResult<()> {
    match config.cache_backend {
        CacheBackendKind::Memory => {
            let backend = InMemoryCacheBackend::new(config.cache.clone());
            serve(store, Arc::new(backend), config).await
        }
        CacheBackendKind::Lmdb => {
            let backend = LmdbCacheBackend::new(
                &config.cache_lmdb_path,
                config.cache_lmdb_max_mb,
                config.cache.clone(),
            )
            .map_err(RosterError::from)?;
            serve(store, Arc::new(backend), config).await
        }
    }
}

async fn serve<S: EmployeeStore, C: CacheBackend>(
    store: Arc<S>,
    cache: Arc<C>,
    config: ApiConfig,
) -> ApiResult<()> {
    let validator = EmployeeValidator::new(Arc::new(config.allowed_roles.clone()));
    let service = EmployeeService::new(store, EmployeeCache::new(cache), Arc::new(validator));
    let app = create_api_router(service, &config);

    let addr: SocketAddr = config.listen_addr().parse().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", config.listen_addr(), e))
    })?;
    tracing::info!(%addr, "Starting ROSTER API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
