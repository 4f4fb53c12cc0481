//! API error handling
//!
//! Every failure leaves the server as `{"code", "message", "details"?}`.
//! `details` carries the underlying cause and is only filled in debug builds.

use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::FolioError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach details outside release builds
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        if cfg!(debug_assertions) {
            self.details = Some(details.into());
        }
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InvalidCredentials,
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Conflict(_) | AppError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::NotFound(resource) => ApiError::not_found(&resource),
            AppError::BadRequest(msg) => ApiError::bad_request(msg),
            AppError::Unauthorized(msg) => ApiError::unauthorized(msg),
            AppError::Forbidden(msg) => ApiError::forbidden(msg),
            AppError::Conflict(msg) => ApiError::new("CONFLICT", msg),
            AppError::InvalidCredentials => {
                ApiError::new("INVALID_CREDENTIALS", "Invalid credentials")
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                ApiError::internal_error().with_details(msg)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<FolioError> for AppError {
    fn from(err: FolioError) -> Self {
        match err {
            FolioError::NotFound(msg) => AppError::NotFound(msg),
            FolioError::Conflict(msg) => AppError::Conflict(msg),
            FolioError::InvalidCredentials => AppError::InvalidCredentials,
            FolioError::ValidationError(msg) => AppError::BadRequest(msg),
            FolioError::StoreError(msg) => AppError::Internal(format!("Store error: {msg}")),
            FolioError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            FolioError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Revoked | TokenError::Malformed => {
                AppError::Forbidden(err.to_string())
            }
            TokenError::Store(err) => err.into(),
            TokenError::Encoding(_) | TokenError::LifetimeOutOfRange => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}
