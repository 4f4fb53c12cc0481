//! API Integration Tests
//!
//! Drive the full router (security headers, metrics, auth gate) with
//! in-memory stores.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use folio_api::{create_router_for_testing, create_test_app};
use folio_core::RevocationStore;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn create_authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let mut request = create_json_request(method, uri, body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn register(app: &Router, username: &str, password: &str) -> Response {
    send(
        app,
        create_json_request(
            "POST",
            "/auth/register",
            Some(json!({"username": username, "password": password})),
        ),
    )
    .await
}

async fn login(app: &Router, username: &str, password: &str) -> Response {
    send(
        app,
        create_json_request(
            "POST",
            "/auth/login",
            Some(json!({"username": username, "password": password})),
        ),
    )
    .await
}

/// Register and log in, returning `(access_token, refresh_token)`
async fn register_and_login(app: &Router, username: &str, password: &str) -> (String, String) {
    assert_eq!(register(app, username, password).await.status(), StatusCode::CREATED);
    let response = login(app, username, password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    (
        json["token"].as_str().unwrap().to_string(),
        json["refreshToken"].as_str().unwrap().to_string(),
    )
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["build_info"]["environment"], "development");
}

#[tokio::test]
async fn test_readiness_check() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/ready", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["user_store"], true);
    assert_eq!(json["checks"]["revocation_store"], true);
}

#[tokio::test]
async fn test_readiness_check_not_ready() {
    let (app, state) = create_test_app();
    state.set_ready(false);

    let response = send(&app, create_json_request("GET", "/ready", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["ready"], false);
}

#[tokio::test]
async fn test_metrics_counts_requests_and_sessions() {
    let app = create_router_for_testing();
    register_and_login(&app, "alice", "secret1").await;

    let response = send(&app, create_json_request("GET", "/metrics", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["registered_users"], 1);
    assert_eq!(json["active_refresh_tokens"], 1);
    assert_eq!(json["blacklisted_tokens"], 0);
    assert!(json["total_requests"].as_u64().unwrap() >= 2);
    assert_eq!(json["endpoints"]["/auth/login"]["requests"], 1);
    assert_eq!(json["endpoints"]["/auth/register"]["status_codes"]["201"], 1);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/api-docs/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert!(json["paths"]["/auth/login"].is_object());
    assert!(json["paths"]["/tokens/refresh"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_then_duplicate() {
    let app = create_router_for_testing();

    let response = register(&app, "alice", "secret1").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["message"], "User registered successfully");

    let response = register(&app, "alice", "other").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "User already exists");
}

#[tokio::test]
async fn test_register_returns_no_token() {
    let app = create_router_for_testing();

    let json = json_body(register(&app, "alice", "secret1").await).await;
    assert!(json.get("token").is_none());
    assert!(json.get("refreshToken").is_none());
}

#[tokio::test]
async fn test_register_validation() {
    let app = create_router_for_testing();

    let response = register(&app, "", "secret1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = register(&app, "alice", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = register(&app, &"a".repeat(65), "secret1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        create_json_request("POST", "/auth/register", Some(json!({"username": "alice"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_malformed_json() {
    let app = create_router_for_testing();

    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = create_router_for_testing();
    register(&app, "alice", "secret1").await;

    let response = login(&app, "alice", "secret1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(json["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(json["user"]["username"], "alice");
    assert!(json["user"]["id"].is_string());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_router_for_testing();
    register(&app, "alice", "secret1").await;

    let wrong_password = login(&app, "alice", "wrong").await;
    let wrong_status = wrong_password.status();
    let wrong_body = json_body(wrong_password).await;

    let unknown_user = login(&app, "bob", "secret1").await;
    let unknown_status = unknown_user.status();
    let unknown_body = json_body(unknown_user).await;

    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_body["message"], "Invalid credentials");
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body, unknown_body);
}

// =============================================================================
// Protected Route Tests
// =============================================================================

#[tokio::test]
async fn test_me_requires_token() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/auth/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Access token required");
}

#[tokio::test]
async fn test_me_with_non_bearer_scheme() {
    let app = create_router_for_testing();

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_garbage_token() {
    let app = create_router_for_testing();

    let response = send(&app, create_authed_request("GET", "/auth/me", "garbage", None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["message"], "Invalid token");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let app = create_router_for_testing();
    let (access, _) = register_and_login(&app, "alice", "secret1").await;

    let response = send(&app, create_authed_request("GET", "/auth/me", &access, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["username"], "alice");
    assert!(json["id"].is_string());
    assert!(json["createdAt"].is_string());
    assert!(json.get("password_hash").is_none());
    assert!(json.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_refresh_token_rejected_as_access_token() {
    let app = create_router_for_testing();
    let (_, refresh) = register_and_login(&app, "alice", "secret1").await;

    let response = send(&app, create_authed_request("GET", "/auth/me", &refresh, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Logout Tests
// =============================================================================

#[tokio::test]
async fn test_logout_revokes_access_token() {
    let app = create_router_for_testing();
    let (access, refresh) = register_and_login(&app, "alice", "secret1").await;

    let response = send(
        &app,
        create_authed_request(
            "POST",
            "/tokens/logout",
            &access,
            Some(json!({"refreshToken": refresh})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Logged out successfully");

    let response = send(&app, create_authed_request("GET", "/auth/me", &access, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["message"], "Token has been revoked");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = create_router_for_testing();
    let (access, refresh) = register_and_login(&app, "alice", "secret1").await;

    send(
        &app,
        create_authed_request(
            "POST",
            "/tokens/logout",
            &access,
            Some(json!({"refreshToken": refresh})),
        ),
    )
    .await;

    let response = send(
        &app,
        create_json_request("POST", "/tokens/refresh", Some(json!({"refreshToken": refresh}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await["message"],
        "Invalid or revoked refresh token"
    );
}

#[tokio::test]
async fn test_logout_without_body() {
    let (app, state) = create_test_app();
    let (access, refresh) = register_and_login(&app, "alice", "secret1").await;

    let response = send(&app, create_authed_request("POST", "/tokens/logout", &access, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The refresh token survives a logout that did not name it
    let response = send(
        &app,
        create_json_request("POST", "/tokens/refresh", Some(json!({"refreshToken": refresh}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stats = state.revocations.stats().await.unwrap();
    assert_eq!(stats.blacklisted_tokens, 1);
}

#[tokio::test]
async fn test_logout_requires_token() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("POST", "/tokens/logout", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Refresh Tests
// =============================================================================

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let app = create_router_for_testing();
    let (_, refresh) = register_and_login(&app, "alice", "secret1").await;

    let response = send(
        &app,
        create_json_request("POST", "/tokens/refresh", Some(json!({"refreshToken": refresh}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let access = json["accessToken"].as_str().unwrap().to_string();
    assert!(json.get("refreshToken").is_none());

    let response = send(&app, create_authed_request("GET", "/auth/me", &access, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["username"], "alice");
}

#[tokio::test]
async fn test_refresh_is_repeatable() {
    let app = create_router_for_testing();
    let (_, refresh) = register_and_login(&app, "alice", "secret1").await;

    for _ in 0..2 {
        let response = send(
            &app,
            create_json_request("POST", "/tokens/refresh", Some(json!({"refreshToken": refresh}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_refresh_with_superseded_token() {
    let app = create_router_for_testing();
    let (_, first_refresh) = register_and_login(&app, "alice", "secret1").await;

    // A second login replaces the stored refresh token
    let response = login(&app, "alice", "secret1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/tokens/refresh",
            Some(json!({"refreshToken": first_refresh})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await["message"],
        "Invalid or revoked refresh token"
    );
}

#[tokio::test]
async fn test_refresh_requires_token() {
    let app = create_router_for_testing();

    for body in [None, Some(json!({})), Some(json!({"refreshToken": ""})), Some(json!({"refreshToken": 7}))] {
        let response = send(&app, create_json_request("POST", "/tokens/refresh", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Refresh token is required");
    }
}

#[tokio::test]
async fn test_refresh_with_access_token() {
    let app = create_router_for_testing();
    let (access, _) = register_and_login(&app, "alice", "secret1").await;

    let response = send(
        &app,
        create_json_request("POST", "/tokens/refresh", Some(json!({"refreshToken": access}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["message"], "Invalid token");
}

// =============================================================================
// Response Header Tests
// =============================================================================

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = create_router_for_testing();

    for request in [
        create_json_request("GET", "/health", None),
        create_json_request("GET", "/auth/me", None),
        create_authed_request("GET", "/auth/me", "garbage", None),
        create_json_request("POST", "/tokens/refresh", None),
    ] {
        let response = send(&app, request).await;
        let headers = response.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.contains_key("strict-transport-security"));
        assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/photos", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
