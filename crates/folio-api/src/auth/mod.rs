//! Authentication and authorization module
//!
//! - Token issuance and verification (access + refresh)
//! - Password hashing with Argon2
//! - In-memory user and revocation stores
//! - Middleware for request authentication
//! - Authentication service for the auth endpoints

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod store;

pub use jwt::{Claims, Credential, IssuedToken, TokenCodec, TokenConfig, TokenError, TokenKind};
pub use middleware::{auth_middleware, bearer_token, AuthError, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordError, PasswordManager};
pub use service::{
    AuthService, LoginRequest, LoginResponse, LogoutRequest, MessageResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, UserInfo,
};
pub use store::{spawn_revocation_sweeper, InMemoryRevocationStore, InMemoryUserStore};
