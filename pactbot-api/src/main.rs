//! PactBot API Server Entry Point
//!
//! Loads configuration, connects the record store and cache, and starts the
//! Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use pactbot_api::config::StoreKind;
use pactbot_api::telemetry::{init_tracing, LogFormat};
use pactbot_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, CacheConfig,
};
use pactbot_storage::{ContractStore, DbConfig, InMemoryRecordStore, PgRecordStore, RecordStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(LogFormat::from_env())?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    let records = open_record_store().await?;

    let cache_config = CacheConfig::from_env();
    tracing::info!(cache = ?cache_config, "Cache configured");
    let cache = cache_config.backend_or_disabled();

    let store = ContractStore::new(records, cache, cache_config.store_config());
    if let pactbot_storage::CacheHealth::Degraded { reason } = store.check_cache().await {
        // Not fatal: every read falls back to the durable store.
        tracing::warn!(%reason, "Cache unreachable at startup");
    }

    let app: Router = create_api_router(AppState::new(store), &api_config, auth_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting PactBot API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn open_record_store() -> ApiResult<Arc<dyn RecordStore>> {
    match StoreKind::from_env() {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory record store; records are lost on restart");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StoreKind::Postgres => {
            let db_config = DbConfig::from_env();
            tracing::info!(db = ?db_config, "Connecting to PostgreSQL");
            let store = PgRecordStore::from_config(&db_config)?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}
