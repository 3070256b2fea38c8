//! OpenAPI Document for the PactBot API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use pactbot_core::{
    ContractAnalysis, ContractId, ContractRecord, Level, NegotiationPoint, NewContract,
    Opportunity, OwnerId, Risk,
};

use crate::auth::SESSION_COOKIE;
use crate::error::{ApiError, ErrorCode};
use crate::routes::contract::{self, MessageResponse};
use crate::routes::health::{
    self, BannerResponse, CacheStatsResponse, ComponentHealth, HealthStatus, ReadinessResponse,
    StatusResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PactBot API",
        description = "Owner-scoped storage for analysed contracts"
    ),
    tags(
        (name = "Contracts", description = "Stored contract analyses"),
        (name = "Health", description = "Liveness and readiness"),
    ),
    paths(
        contract::get_contract,
        contract::delete_contract,
        contract::list_user_contracts,
        contract::create_contract,
        health::banner,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ContractId,
        OwnerId,
        Level,
        Risk,
        Opportunity,
        NegotiationPoint,
        ContractAnalysis,
        NewContract,
        ContractRecord,
        MessageResponse,
        ApiError,
        ErrorCode,
        StatusResponse,
        BannerResponse,
        HealthStatus,
        ComponentHealth,
        CacheStatsResponse,
        ReadinessResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the session cookie and bearer token schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_paths_exist() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/contracts",
            "/api/contracts/contract/{id}",
            "/api/contracts/user-contracts",
            "/health",
            "/health/ready",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn test_openapi_security_schemes() -> Result<(), String> {
        let doc = ApiDoc::openapi();
        let components = doc.components.ok_or("components missing")?;
        assert!(components.security_schemes.contains_key("session"));
        assert!(components.security_schemes.contains_key("bearer_auth"));
        Ok(())
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), serde_json::Error> {
        let json = ApiDoc::to_json()?;
        assert!(json.contains("PactBot API"));
        assert!(json.contains("ContractRecord"));
        Ok(())
    }
}
