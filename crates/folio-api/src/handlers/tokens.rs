//! Token lifecycle handlers: refresh and logout

use crate::audit::RequestContext;
use crate::auth::{AuthenticatedUser, LogoutRequest, MessageResponse, RefreshRequest, RefreshResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use std::sync::Arc;

const REFRESH_TOKEN_REQUIRED: &str = "Refresh token is required";

/// `refreshToken` from an arbitrary JSON body, if it is a non-empty string
fn refresh_token_from(body: &Value) -> Option<&str> {
    body.get("refreshToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
}

/// Refresh access token
///
/// Exchanges the caller's active refresh token for a new access token. The
/// refresh token is not rotated.
///
/// # Responses
///
/// * `200 OK` - New access token
/// * `400 Bad Request` - Body missing or without a string `refreshToken`
/// * `403 Forbidden` - Expired, revoked, malformed or superseded refresh token
#[utoipa::path(
    post,
    path = "/tokens/refresh",
    tag = "tokens",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token issued", body = RefreshResponse),
        (status = 400, description = "Refresh token is required", body = crate::error::ApiError),
        (status = 403, description = "Invalid or revoked refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|_| AppError::BadRequest(REFRESH_TOKEN_REQUIRED.to_string()))?;
    let refresh_token = refresh_token_from(&body)
        .ok_or_else(|| AppError::BadRequest(REFRESH_TOKEN_REQUIRED.to_string()))?;

    let ctx = RequestContext::from_headers(&headers);
    let response = state.auth.refresh(refresh_token, &ctx).await?;

    Ok(Json(response))
}

/// Logout current session
///
/// Blacklists the presented access token until it expires and, when a
/// `refreshToken` is supplied, drops it from the active refresh tokens. The
/// body is optional.
#[utoipa::path(
    post,
    path = "/tokens/logout",
    tag = "tokens",
    request_body(content = LogoutRequest, description = "Refresh token to revoke (optional)"),
    responses(
        (status = 200, description = "Logged out successfully", body = MessageResponse),
        (status = 401, description = "Access token required", body = crate::error::ApiError),
        (status = 403, description = "Invalid, expired or revoked token", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let ctx = RequestContext::from_headers(&headers);

    state.auth.logout(&user, request, &ctx).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_refresh_token_from_body() {
        assert_eq!(
            refresh_token_from(&json!({"refreshToken": "abc"})),
            Some("abc")
        );
        assert_eq!(refresh_token_from(&json!({"refreshToken": ""})), None);
        assert_eq!(refresh_token_from(&json!({"refreshToken": 42})), None);
        assert_eq!(refresh_token_from(&json!({"refresh_token": "abc"})), None);
        assert_eq!(refresh_token_from(&json!(["abc"])), None);
    }

    #[test]
    fn test_message_response_serialization() {
        let json = serde_json::to_string(&MessageResponse::new("Logged out successfully")).unwrap();
        assert_eq!(json, r#"{"message":"Logged out successfully"}"#);
    }
}
