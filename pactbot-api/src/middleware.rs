//! Axum Middleware for Session Authentication
//!
//! Every `/api` route sits behind [`auth_middleware`], which resolves the
//! caller's session into an [`AuthContext`] and stores it in the request
//! extensions. Handlers take it back out with [`AuthExtractor`].

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::error::ApiError;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for the authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Reject requests without a valid session, otherwise inject [`AuthContext`].
///
/// ```ignore
/// use axum::{middleware, Router};
/// use pactbot_api::middleware::{auth_middleware, AuthMiddlewareState};
///
/// let auth_state = AuthMiddlewareState::new(AuthConfig::from_env());
/// let app = Router::new()
///     .route("/api/contracts", axum::routing::get(|| async { "OK" }))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(&state.auth_config, auth_header, cookie_header)
        .map_err(AuthMiddlewareError)?;

    tracing::debug!(owner = %auth_context.owner, "Authenticated request");
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Rejection returned by the middleware and the extractor.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Handler argument carrying the authenticated caller.
///
/// Only usable on routes behind [`auth_middleware`]; elsewhere it fails with
/// a 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_session_token, FixedClock, SESSION_COOKIE};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    fn auth_config() -> AuthConfig {
        AuthConfig {
            clock: Arc::new(FixedClock(1_704_067_200)),
            ..AuthConfig::with_secret("middleware-test-secret-0123456789abcdef")
        }
    }

    async fn whoami(AuthExtractor(ctx): AuthExtractor) -> String {
        ctx.owner.to_string()
    }

    fn app(config: AuthConfig) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(
                AuthMiddlewareState::new(config),
                auth_middleware,
            ))
    }

    async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, String), String> {
        let response = app
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }

    #[tokio::test]
    async fn test_missing_session_is_rejected() -> Result<(), String> {
        let request = Request::builder()
            .uri("/whoami")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let (status, body) = send(app(auth_config()), request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHORIZED"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bearer_session_is_accepted() -> Result<(), String> {
        let config = auth_config();
        let token = generate_session_token(&config, "u1").map_err(|e| e.to_string())?;
        let request = Request::builder()
            .uri("/whoami")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let (status, body) = send(app(config), request).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1");
        Ok(())
    }

    #[tokio::test]
    async fn test_cookie_session_is_accepted() -> Result<(), String> {
        let config = auth_config();
        let token = generate_session_token(&config, "u1").map_err(|e| e.to_string())?;
        let request = Request::builder()
            .uri("/whoami")
            .header("cookie", format!("theme=dark; {SESSION_COOKIE}={token}"))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let (status, body) = send(app(config), request).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1");
        Ok(())
    }

    #[tokio::test]
    async fn test_tampered_token_is_rejected() -> Result<(), String> {
        let config = auth_config();
        let token = generate_session_token(&config, "u1").map_err(|e| e.to_string())?;
        let request = Request::builder()
            .uri("/whoami")
            .header("authorization", format!("Bearer {token}x"))
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let (status, _) = send(app(config), request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_internal_error() -> Result<(), String> {
        let app = Router::new().route("/whoami", get(whoami));
        let request = Request::builder()
            .uri("/whoami")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let (status, _) = send(app, request).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
