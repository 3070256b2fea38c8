//! Health Check Endpoints
//!
//! - `/health` - liveness, never touches a dependency
//! - `/health/ready` - durable store and cache status
//!
//! No authentication required for health endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use pactbot_storage::{CacheHealth, CacheStats, ContractStore};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Liveness response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
    /// Component not configured.
    Disabled,
}

/// Readiness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
    pub cache_stats: CacheStatsResponse,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub fallbacks: u64,
    pub corrupt_entries: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            bypassed: stats.bypassed,
            fallbacks: stats.fallbacks,
            corrupt_entries: stats.corrupt_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Body of the root banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BannerResponse {
    pub message: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET / - Service banner
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses(
        (status = 200, description = "Service banner", body = BannerResponse),
    ),
))]
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "PactBot API Server".to_string(),
    })
}

/// GET /health - Process liveness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = StatusResponse),
    ),
))]
pub async fn liveness() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/ready - Readiness check
///
/// 503 only when the durable store is down. A degraded cache is reported but
/// does not fail readiness, since every read still succeeds without it.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Database is unreachable", body = ReadinessResponse),
    ),
))]
pub async fn readiness(
    State(store): State<Arc<ContractStore>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let database = check_database(&store).await;
    let cache = check_cache(&store).await;

    let status = match (database.status, cache.status) {
        (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
        (_, HealthStatus::Degraded) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    };

    let response = ReadinessResponse {
        status,
        database,
        cache,
        cache_stats: store.stats().into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
    };

    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

async fn check_database(store: &ContractStore) -> ComponentHealth {
    let start = Instant::now();
    match store.check_store().await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: record store check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some("Database check failed".to_string()),
            }
        }
    }
}

async fn check_cache(store: &ContractStore) -> ComponentHealth {
    let start = Instant::now();
    match store.check_cache().await {
        CacheHealth::Disabled => ComponentHealth {
            status: HealthStatus::Disabled,
            latency_ms: None,
            error: None,
        },
        CacheHealth::Healthy => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        CacheHealth::Degraded { reason } => ComponentHealth {
            status: HealthStatus::Degraded,
            latency_ms: None,
            error: Some(reason),
        },
    }
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Health routes, relative to `/health`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
}
