//! PactBot API - HTTP Layer for Contract Records
//!
//! Axum routes over the cache-aside [`ContractStore`](pactbot_storage::ContractStore).
//! Callers are identified by a session token issued by the login flow; every
//! contract operation is scoped to that owner.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use auth::{
    authenticate, generate_session_token, validate_session_token, AuthConfig, AuthContext, Claims,
    SESSION_COOKIE,
};
pub use config::{ApiConfig, CacheConfig, CacheKind, StoreKind};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
