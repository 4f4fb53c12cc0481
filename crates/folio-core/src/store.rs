//! Storage traits for user accounts and token revocation state
//!
//! Implementations are injected into the server state as trait objects, so
//! handlers and middleware never reach for process globals.

use crate::user::User;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a token expiring at `expires_at` can no longer verify at `now`
///
/// Token expiry is whole seconds and a token still verifies during its `exp`
/// second, so an entry lapses only once `now` is in a later second.
pub fn has_lapsed(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.timestamp() > expires_at.timestamp()
}

/// Active refresh token bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Owning user (token `sub`)
    pub subject: String,

    /// When the record was stored
    pub issued_at: DateTime<Utc>,

    /// Token expiration time (for cleanup)
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(subject: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            issued_at: Utc::now(),
            expires_at,
        }
    }

    /// Check if the token is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        has_lapsed(self.expires_at, now)
    }
}

/// Snapshot of revocation store sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationStats {
    pub active_refresh_tokens: usize,
    pub blacklisted_tokens: usize,
}

/// Revocation state: active refresh tokens and blacklisted tokens
///
/// At most one active refresh token exists per subject. Blacklist entries
/// are kept only until the revoked token would have expired on its own.
#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// Replace any refresh token held by `subject` with `token`
    async fn store_refresh_token(
        &self,
        subject: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// True if `token` is the active refresh token of `subject`
    async fn is_valid_refresh_token(&self, subject: &str, token: &str) -> Result<bool>;

    /// Drop a refresh token. Removing an unknown token is not an error.
    async fn remove_refresh_token(&self, token: &str) -> Result<()>;

    /// Drop every refresh token owned by `subject`
    async fn remove_user_refresh_tokens(&self, subject: &str) -> Result<()>;

    /// Reject `token` until `expires_at`. Blacklisting twice is not an error.
    async fn blacklist_token(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// True if `token` is blacklisted and the entry has not lapsed
    async fn is_token_blacklisted(&self, token: &str) -> Result<bool>;

    /// Remove lapsed blacklist entries and expired refresh records.
    /// Returns the number of entries removed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Current store sizes
    async fn stats(&self) -> Result<RevocationStats>;
}

/// User account storage
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `FolioError::Conflict` if the username is taken.
    async fn create_user(&self, user: User) -> Result<User>;

    /// Exact, case-sensitive lookup by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Lookup by identifier
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Number of registered users
    async fn count(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_refresh_record_expiry() {
        let now = Utc::now();
        let record = RefreshTokenRecord::new("user-1", now + Duration::minutes(5));
        assert!(!record.is_expired_at(now));
        assert!(record.is_expired_at(now + Duration::minutes(6)));
    }

    #[test]
    fn test_lapse_is_second_granular() {
        let expires_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(!has_lapsed(expires_at, expires_at));
        assert!(!has_lapsed(expires_at, expires_at + Duration::milliseconds(999)));
        assert!(has_lapsed(expires_at, expires_at + Duration::seconds(1)));
    }
}
