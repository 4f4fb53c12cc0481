//! Authentication API handlers
//!
//! Registration, login and the current-user profile.

use crate::audit::RequestContext;
use crate::auth::{AuthenticatedUser, LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use folio_core::UserPublic;
use std::sync::Arc;

/// Register a new user account
///
/// # Responses
///
/// * `201 Created` - User registered; no token is returned
/// * `400 Bad Request` - Invalid input or username already taken
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = MessageResponse),
        (status = 400, description = "Invalid input or user already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    state.auth.register(request, &ctx).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// Login with username and password
///
/// Returns an access token, a refresh token and the user's identity. The
/// refresh token replaces any refresh token the user held before.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    let response = state.auth.login(request, &ctx).await?;

    Ok(Json(response))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = UserPublic),
        (status = 401, description = "Access token required", body = crate::error::ApiError),
        (status = 403, description = "Invalid, expired or revoked token", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth.get_user(&user.subject).await?;

    Ok(Json(profile))
}
