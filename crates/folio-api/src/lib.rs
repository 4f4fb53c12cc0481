//! Folio API - authentication server
//!
//! Issues and verifies JWT access/refresh token pairs for the portfolio
//! backend: registration, login, refresh, logout and the `/auth/me` profile.
//!
//! # API Documentation
//!
//! Swagger UI is served at `/swagger-ui/` and the OpenAPI document at
//! `/api-docs/openapi.json`.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio API",
        version = "0.1.0",
        description = "Authentication API for the Folio photography portfolio backend",
        license(name = "Apache-2.0", url = "https://www.apache.org/licenses/LICENSE-2.0")
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::me_handler,
        handlers::tokens::refresh_handler,
        handlers::tokens::logout_handler,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::RefreshRequest,
        auth::LogoutRequest,
        auth::MessageResponse,
        auth::UserInfo,
        auth::LoginResponse,
        auth::RefreshResponse,
        folio_core::UserPublic,
        handlers::health::HealthResponse,
        handlers::health::BuildInfo,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness, readiness and metrics"),
        (name = "auth", description = "Registration, login and profile"),
        (name = "tokens", description = "Access token refresh and logout")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the application router over the given state
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);

    // Swagger UI sets its own content, so security headers only wrap the API
    let api = Router::new()
        .merge(routes::api_routes(state.clone()))
        .merge(routes::health_routes())
        .layer(from_fn(middleware::security_headers_middleware));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let server = &state.config.server;
    if !server.environment.is_production() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Turn a handler panic into the standard 500 envelope
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal_error()),
    )
        .into_response()
}

/// Router and state over in-memory stores with fast password hashing
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let mut config = folio_core::config::AppConfig::default();
    config.auth.access_token_secret = "test-access-secret-0123456789abcdef".to_string();
    config.auth.refresh_token_secret = "test-refresh-secret-0123456789abcdef".to_string();
    config.auth.password = folio_core::config::PasswordConfig::lightweight();

    let state = Arc::new(AppState::new(config).expect("test state"));
    (create_router(state.clone()), state)
}

/// Router for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_test_app().0
}
