//! REST API Routes Module
//!
//! - Contract routes under `/api/contracts/*` (session required)
//! - Health checks at `/health` and `/health/ready` (public)
//! - Banner at `/`
//! - OpenAPI document at `/openapi.json` (with the `openapi` feature)

pub mod contract;
pub mod health;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::state::AppState;

pub use contract::create_router as contract_router;
pub use health::create_router as health_router;

/// Largest accepted request body. Contract text is stored inline.
pub const MAX_REQUEST_BODY_BYTES: usize = 5 * 1024 * 1024;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

#[cfg(feature = "openapi")]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. Tracing - one span per request
/// 3. Body limit
/// 4. Auth (only on `/api/*`) - resolves the session owner
pub fn create_api_router(state: AppState, api_config: &ApiConfig, auth_config: AuthConfig) -> Router {
    let auth_state = AuthMiddlewareState::new(auth_config);

    let api_routes = Router::new()
        .nest("/contracts", contract::create_router())
        .layer(from_fn_with_state(auth_state, auth_middleware));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .route("/", get(health::banner))
        .nest("/api", api_routes)
        .nest("/health", health::create_router());

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
        .with_state(state)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow any origin (development). Otherwise only the listed
/// origins are allowed, optionally with credentials so the session cookie
/// is sent.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: allowing configured origins");
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(origins)
        .allow_credentials(config.cors_allow_credentials)
}
