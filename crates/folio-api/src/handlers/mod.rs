//! API handlers

pub mod auth;
pub mod health;
pub mod tokens;

pub use auth::{login_handler, me_handler, register_handler};
pub use health::{health_check, metrics, readiness_check};
pub use tokens::{logout_handler, refresh_handler};
