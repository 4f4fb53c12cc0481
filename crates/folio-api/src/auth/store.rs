//! In-memory store implementations
//!
//! Process-local state behind `tokio::sync::RwLock`. Nothing survives a
//! restart: active refresh tokens and blacklist entries are lost, which
//! forces users to log in again.

use chrono::{DateTime, Utc};
use folio_core::{
    has_lapsed, FolioError, RefreshTokenRecord, Result, RevocationStats, RevocationStore, User,
    UserStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct RevocationState {
    /// token -> owner and lifetime
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    /// token -> instant after which the entry may be dropped
    blacklist: HashMap<String, DateTime<Utc>>,
}

impl RevocationState {
    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.refresh_tokens.len() + self.blacklist.len();
        self.refresh_tokens
            .retain(|_, record| !record.is_expired_at(now));
        self.blacklist
            .retain(|_, expires_at| !has_lapsed(*expires_at, now));
        before - (self.refresh_tokens.len() + self.blacklist.len())
    }
}

/// Revocation store kept in process memory
#[derive(Default)]
pub struct InMemoryRevocationStore {
    state: RwLock<RevocationState>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn store_refresh_token(
        &self,
        subject: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.prune(Utc::now());
        state
            .refresh_tokens
            .retain(|_, record| record.subject != subject);
        state.refresh_tokens.insert(
            token.to_string(),
            RefreshTokenRecord::new(subject, expires_at),
        );
        Ok(())
    }

    async fn is_valid_refresh_token(&self, subject: &str, token: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .refresh_tokens
            .get(token)
            .map(|record| record.subject == subject)
            .unwrap_or(false))
    }

    async fn remove_refresh_token(&self, token: &str) -> Result<()> {
        self.state.write().await.refresh_tokens.remove(token);
        Ok(())
    }

    async fn remove_user_refresh_tokens(&self, subject: &str) -> Result<()> {
        self.state
            .write()
            .await
            .refresh_tokens
            .retain(|_, record| record.subject != subject);
        Ok(())
    }

    async fn blacklist_token(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        state.prune(Utc::now());
        let entry = state
            .blacklist
            .entry(token.to_string())
            .or_insert(expires_at);
        if *entry < expires_at {
            *entry = expires_at;
        }
        Ok(())
    }

    async fn is_token_blacklisted(&self, token: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .blacklist
            .get(token)
            .map(|expires_at| !has_lapsed(*expires_at, Utc::now()))
            .unwrap_or(false))
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.state.write().await.prune(Utc::now()))
    }

    async fn stats(&self) -> Result<RevocationStats> {
        let state = self.state.read().await;
        Ok(RevocationStats {
            active_refresh_tokens: state.refresh_tokens.len(),
            blacklisted_tokens: state.blacklist.len(),
        })
    }
}

/// User accounts kept in process memory
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(FolioError::Conflict("User already exists".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.users.read().await.len())
    }
}

/// Spawn a task that purges lapsed revocation entries every `interval`.
///
/// The returned handle runs until aborted.
pub fn spawn_revocation_sweeper(
    store: Arc<dyn RevocationStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        // First tick completes immediately
        interval_timer.tick().await;

        loop {
            interval_timer.tick().await;

            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired revocation entries"),
                Err(e) => tracing::warn!(error = %e, "Revocation sweep failed"),
            }
        }
    })
}
