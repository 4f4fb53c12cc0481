//! Folio Core - Domain models, traits, and shared types
//!
//! This crate defines the abstractions shared by the Folio server and CLI:
//! - Configuration management
//! - Common error types
//! - User account models
//! - Storage traits for user accounts and token revocation state

pub mod config;
pub mod store;
pub mod user;

pub use config::{
    AppConfig, AuthConfig, ConfigError, Environment, LoggingConfig, PasswordConfig, ServerConfig,
};
pub use store::{has_lapsed, RefreshTokenRecord, RevocationStats, RevocationStore, UserStore};
pub use user::{User, UserPublic};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Folio operations
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for FolioError {
    fn from(err: ConfigError) -> Self {
        FolioError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;

// ============================================================================
// Tests
// ============================================================================
