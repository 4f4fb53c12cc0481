//! Authentication middleware for protecting routes
//!
//! Extracts the bearer token from the Authorization header, verifies it
//! through the token codec (which consults the revocation store) and adds the
//! resolved identity to request extensions.

use super::jwt::{Credential, TokenError};
use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Authenticated user information extracted from an access token
///
/// Handlers extract it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// Subject claim (user ID)
    pub subject: String,
    /// User's login name
    pub username: String,
    /// JWT ID of the presented token
    pub jti: String,
    /// When the presented token expires
    pub expires_at: DateTime<Utc>,
    /// Raw token, needed to blacklist it on logout
    #[serde(skip)]
    pub token: String,
}

impl AuthenticatedUser {
    pub fn from_credential(credential: Credential, token: &str) -> Self {
        Self {
            subject: credential.subject,
            username: credential.username,
            jti: credential.jti,
            expires_at: credential.expires_at,
            token: token.to_string(),
        }
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,

    #[error(transparent)]
    InvalidToken(#[from] TokenError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingToken => AppError::Unauthorized(self.to_string()).into_response(),
            AuthError::InvalidToken(e) => AppError::from(e).into_response(),
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that requires a valid access token
///
/// 1. No bearer token: 401 `Access token required`, nothing else is touched
/// 2. Revoked, expired or malformed token: 403 with the failure reason
/// 3. Otherwise adds `AuthenticatedUser` to request extensions
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use folio_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::MissingToken)?
        .to_string();

    let user = match state.auth.authenticate(&token).await {
        Ok(user) => user,
        Err(e) => {
            let ctx = RequestContext::from_headers(request.headers());
            audit_log(&AuditEvent::InvalidToken {
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
                reason: e.to_string(),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
