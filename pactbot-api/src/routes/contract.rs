//! Contract REST API Routes
//!
//! Every handler is scoped to the authenticated owner. A record belonging to
//! someone else is reported exactly like a missing one.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use pactbot_core::{ContractId, ContractRecord, NewContract};
use pactbot_storage::ContractStore;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthExtractor;
use crate::state::AppState;

/// Body returned by a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/contracts/contract/{id} - Get one of the caller's contracts
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/contracts/contract/{id}",
    tag = "Contracts",
    params(
        ("id" = String, Path, description = "Contract ID")
    ),
    responses(
        (status = 200, description = "Contract analysis", body = ContractRecord),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Contract not found", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError),
    ),
    security(
        ("session" = []),
        ("bearer_auth" = [])
    )
))]
pub async fn get_contract(
    State(store): State<Arc<ContractStore>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<String>,
) -> ApiResult<Json<ContractRecord>> {
    let id = ContractId::new(id);
    let record = store.fetch(&id, &auth.owner).await?;
    Ok(Json(record))
}

/// DELETE /api/contracts/contract/{id} - Delete one of the caller's contracts
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/contracts/contract/{id}",
    tag = "Contracts",
    params(
        ("id" = String, Path, description = "Contract ID")
    ),
    responses(
        (status = 200, description = "Contract deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Contract not found", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError),
    ),
    security(
        ("session" = []),
        ("bearer_auth" = [])
    )
))]
pub async fn delete_contract(
    State(store): State<Arc<ContractStore>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = ContractId::new(id);
    store.delete(&id, &auth.owner).await?;

    tracing::info!(contract_id = %id, owner = %auth.owner, "Contract deleted");
    Ok(Json(MessageResponse::new("Contract deleted successfully")))
}

/// GET /api/contracts/user-contracts - List the caller's contracts, newest first
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/contracts/user-contracts",
    tag = "Contracts",
    responses(
        (status = 200, description = "Caller's contracts", body = Vec<ContractRecord>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError),
    ),
    security(
        ("session" = []),
        ("bearer_auth" = [])
    )
))]
pub async fn list_user_contracts(
    State(store): State<Arc<ContractStore>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<Vec<ContractRecord>>> {
    let records = store.list(&auth.owner).await?;
    Ok(Json(records))
}

/// POST /api/contracts - Store an analysed contract
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/contracts",
    tag = "Contracts",
    request_body = NewContract,
    responses(
        (status = 201, description = "Contract stored", body = ContractRecord),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError),
    ),
    security(
        ("session" = []),
        ("bearer_auth" = [])
    )
))]
pub async fn create_contract(
    State(store): State<Arc<ContractStore>>,
    AuthExtractor(auth): AuthExtractor,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    // Parsed by hand so malformed bodies get the same error shape as
    // everything else.
    let new: NewContract = serde_json::from_slice(&body).map_err(ApiError::from)?;
    let record = store.create(&auth.owner, new).await?;

    tracing::info!(contract_id = %record.id, owner = %auth.owner, "Contract stored");
    Ok((StatusCode::CREATED, Json(record)))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Contract routes, relative to `/api/contracts`. Callers must layer
/// [`auth_middleware`](crate::middleware::auth_middleware) on top.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_contract))
        .route("/user-contracts", get(list_user_contracts))
        .route("/contract/:id", get(get_contract).delete(delete_contract))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_shape() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(MessageResponse::new("Contract deleted successfully"))?;
        assert_eq!(
            json,
            serde_json::json!({ "message": "Contract deleted successfully" })
        );
        Ok(())
    }
}
