//! Router tests for the contract and health endpoints.
//!
//! Each test builds the full router over in-memory backends and drives it
//! with `oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use pactbot_api::{
    create_api_router, generate_session_token, ApiConfig, AppState, AuthConfig, SESSION_COOKIE,
};
use pactbot_core::{ContractRecord, OwnerId};
use pactbot_storage::{InMemoryCache, RecordStore};
use pactbot_test_utils::assertions::assert_cached;
use pactbot_test_utils::{contract_store, fixtures, FlakyRecordStore};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

const SECRET: &str = "router-test-secret-0123456789abcdefghij";

struct TestApp {
    router: Router,
    records: Arc<FlakyRecordStore>,
    cache: Arc<InMemoryCache>,
}

impl TestApp {
    fn new() -> Self {
        let records = Arc::new(FlakyRecordStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let store = contract_store(records.clone(), cache.clone());
        let router = create_api_router(
            AppState::new(store),
            &ApiConfig::default(),
            AuthConfig::with_secret(SECRET),
        );
        Self {
            router,
            records,
            cache,
        }
    }

    async fn seed(&self, record: &ContractRecord) -> Result<(), String> {
        self.records.insert(record).await.map_err(|e| e.to_string())
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value), String> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| format!("Body is not JSON: {}", e))?
        };
        Ok((status, body))
    }
}

fn token(owner: &str) -> Result<String, String> {
    generate_session_token(&AuthConfig::with_secret(SECRET), owner).map_err(|e| e.to_string())
}

fn request(
    method: Method,
    uri: &str,
    owner: Option<&str>,
    body: Option<Value>,
) -> Result<Request<Body>, String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header("authorization", format!("Bearer {}", token(owner)?));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).map_err(|e| e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn contract_routes_require_a_session() -> Result<(), String> {
    let app = TestApp::new();
    app.seed(&fixtures::abc123()).await?;

    for (method, uri) in [
        (Method::GET, "/api/contracts/contract/abc123"),
        (Method::DELETE, "/api/contracts/contract/abc123"),
        (Method::GET, "/api/contracts/user-contracts"),
        (Method::POST, "/api/contracts"),
    ] {
        let (status, body) = app.send(request(method, uri, None, None)?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() -> Result<(), String> {
    let app = TestApp::new();
    let other = AuthConfig::with_secret("not-the-server-secret-at-all!!");
    let forged = generate_session_token(&other, "u1").map_err(|e| e.to_string())?;
    let request = Request::builder()
        .uri("/api/contracts/user-contracts")
        .header("authorization", format!("Bearer {forged}"))
        .body(Body::empty())
        .map_err(|e| e.to_string())?;

    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn session_cookie_authenticates() -> Result<(), String> {
    let app = TestApp::new();
    let record = fixtures::abc123();
    app.seed(&record).await?;

    let request = Request::builder()
        .uri("/api/contracts/contract/abc123")
        .header("cookie", format!("{SESSION_COOKIE}={}", token("u1")?))
        .body(Body::empty())
        .map_err(|e| e.to_string())?;

    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, to_json(&record)?);
    Ok(())
}

// ============================================================================
// FETCH AND DELETE
// ============================================================================

#[tokio::test]
async fn fetch_returns_record_and_warms_cache() -> Result<(), String> {
    let app = TestApp::new();
    let record = fixtures::abc123();
    app.seed(&record).await?;

    let (status, body) = app
        .send(request(Method::GET, "/api/contracts/contract/abc123", Some("u1"), None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, to_json(&record)?);
    assert_eq!(body["overallScore"], 80);
    assert_cached(&app.cache, &record).await;

    // Served from the cache while the store is down.
    app.records.set_failing(true);
    let (status, body) = app
        .send(request(Method::GET, "/api/contracts/contract/abc123", Some("u1"), None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, to_json(&record)?);
    Ok(())
}

#[tokio::test]
async fn other_owner_and_missing_id_look_the_same() -> Result<(), String> {
    let app = TestApp::new();
    app.seed(&fixtures::abc123()).await?;

    let (foreign_status, foreign_body) = app
        .send(request(Method::GET, "/api/contracts/contract/abc123", Some("u2"), None)?)
        .await?;
    let (missing_status, missing_body) = app
        .send(request(Method::GET, "/api/contracts/contract/missing-id", Some("u2"), None)?)
        .await?;

    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_body, missing_body);
    assert_eq!(
        foreign_body,
        json!({ "code": "CONTRACT_NOT_FOUND", "message": "Contract not found" })
    );

    let (status, _) = app
        .send(request(Method::DELETE, "/api/contracts/contract/abc123", Some("u2"), None)?)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_then_fetch_is_not_found() -> Result<(), String> {
    let app = TestApp::new();
    app.seed(&fixtures::abc123()).await?;
    let uri = "/api/contracts/contract/abc123";

    // Warm the cache first so the delete must invalidate it.
    let (status, _) = app.send(request(Method::GET, uri, Some("u1"), None)?).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(request(Method::DELETE, uri, Some("u1"), None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Contract deleted successfully" }));

    let (status, _) = app.send(request(Method::GET, uri, Some("u1"), None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send(request(Method::DELETE, uri, Some("u1"), None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CONTRACT_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn store_outage_on_miss_is_service_unavailable() -> Result<(), String> {
    let app = TestApp::new();
    app.seed(&fixtures::abc123()).await?;
    app.records.set_failing(true);

    let (status, body) = app
        .send(request(Method::GET, "/api/contracts/contract/abc123", Some("u1"), None)?)
        .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["message"], "Database is unavailable");
    Ok(())
}

// ============================================================================
// CREATE AND LIST
// ============================================================================

#[tokio::test]
async fn create_then_list_is_owner_scoped() -> Result<(), String> {
    let app = TestApp::new();
    let submission = to_json(&fixtures::new_contract())?;

    let (status, created) = app
        .send(request(Method::POST, "/api/contracts", Some("u1"), Some(submission))?)
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["owner"], "u1");
    assert_eq!(created["contractType"], "Employment");
    let id = created["id"].as_str().ok_or("created record has no id")?.to_string();
    assert!(!id.is_empty());

    let (status, fetched) = app
        .send(request(Method::GET, &format!("/api/contracts/contract/{id}"), Some("u1"), None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, listed) = app
        .send(request(Method::GET, "/api/contracts/user-contracts", Some("u1"), None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([created]));

    let (status, listed) = app
        .send(request(Method::GET, "/api/contracts/user-contracts", Some("u2"), None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
    Ok(())
}

#[tokio::test]
async fn create_rejects_invalid_submissions() -> Result<(), String> {
    let app = TestApp::new();

    let mut blank_summary = fixtures::new_contract();
    blank_summary.analysis.summary = "   ".to_string();
    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/contracts",
            Some("u1"),
            Some(to_json(&blank_summary)?),
        )?)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"], json!({ "field": "summary" }));

    let mut out_of_range = to_json(&fixtures::new_contract())?;
    out_of_range["overallScore"] = json!(140);
    let (status, body) = app
        .send(request(Method::POST, "/api/contracts", Some("u1"), Some(out_of_range))?)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], json!({ "field": "overallScore" }));

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/contracts",
            Some("u1"),
            Some(json!({ "contractText": "no analysis" })),
        )?)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let stored = app
        .records
        .list_by_owner(&OwnerId::new("u1"))
        .await
        .map_err(|e| e.to_string())?;
    assert!(stored.is_empty());
    Ok(())
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn liveness_and_banner() -> Result<(), String> {
    let app = TestApp::new();

    let (status, body) = app.send(request(Method::GET, "/health", None, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = app.send(request(Method::GET, "/", None, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "PactBot API Server" }));
    Ok(())
}

#[tokio::test]
async fn readiness_reports_store_and_cache() -> Result<(), String> {
    let app = TestApp::new();
    app.seed(&fixtures::abc123()).await?;
    app.send(request(Method::GET, "/api/contracts/contract/abc123", Some("u1"), None)?)
        .await?;

    let (status, body) = app.send(request(Method::GET, "/health/ready", None, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "healthy");
    assert_eq!(body["cache"]["status"], "healthy");
    assert_eq!(body["cache_stats"]["misses"], 1);

    app.records.set_failing(true);
    let (status, body) = app.send(request(Method::GET, "/health/ready", None, None)?).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"]["status"], "unhealthy");
    Ok(())
}

#[cfg(feature = "openapi")]
#[tokio::test]
async fn openapi_document_is_served() -> Result<(), String> {
    let app = TestApp::new();
    let (status, body) = app.send(request(Method::GET, "/openapi.json", None, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/contracts/contract/{id}"].is_object());
    Ok(())
}
