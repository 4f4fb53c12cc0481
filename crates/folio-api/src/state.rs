//! Application state management

use crate::auth::{
    AuthService, InMemoryRevocationStore, InMemoryUserStore, PasswordError, PasswordManager,
    TokenCodec, TokenConfig,
};
use folio_core::config::AppConfig;
use folio_core::{RevocationStore, UserStore};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Per-endpoint request statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointMetrics {
    pub requests: u64,
    pub errors: u64,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
    pub status_codes: BTreeMap<u16, u64>,
}

impl EndpointMetrics {
    pub fn avg_latency_us(&self) -> u64 {
        if self.requests == 0 {
            0
        } else {
            self.total_latency_us / self.requests
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// User accounts
    pub users: Arc<dyn UserStore>,
    /// Active refresh tokens and blacklist
    pub revocations: Arc<dyn RevocationStore>,
    /// Registration, login, refresh and logout
    pub auth: AuthService,
    endpoint_metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create state backed by in-memory stores
    pub fn new(config: AppConfig) -> Result<Self, PasswordError> {
        Self::with_stores(
            config,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryRevocationStore::new()),
        )
    }

    /// Create state over the given stores
    pub fn with_stores(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Result<Self, PasswordError> {
        let tokens = TokenCodec::new(TokenConfig::from(&config.auth), revocations.clone());
        let passwords = PasswordManager::new(config.auth.password.clone())?;
        let auth = AuthService::new(users.clone(), revocations.clone(), tokens, passwords);

        Ok(Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            users,
            revocations,
            auth,
            endpoint_metrics: RwLock::new(HashMap::new()),
        })
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.increment_requests();

        let mut metrics = self.endpoint_metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();
        entry.requests += 1;
        if status >= 400 {
            entry.errors += 1;
        }
        entry.total_latency_us = entry.total_latency_us.saturating_add(latency_us);
        entry.max_latency_us = entry.max_latency_us.max(latency_us);
        *entry.status_codes.entry(status).or_default() += 1;
    }

    /// Snapshot of per-endpoint statistics, ordered by endpoint
    pub async fn endpoint_metrics(&self) -> BTreeMap<String, EndpointMetrics> {
        self.endpoint_metrics
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::PasswordConfig;

    fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.auth.password = PasswordConfig::lightweight();
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_record_request() {
        let state = test_state();

        state.record_request("/auth/login".into(), 200, 100).await;
        state.record_request("/auth/login".into(), 400, 300).await;
        state.record_request("/health".into(), 200, 10).await;

        let metrics = state.endpoint_metrics().await;
        let login = &metrics["/auth/login"];
        assert_eq!(login.requests, 2);
        assert_eq!(login.errors, 1);
        assert_eq!(login.avg_latency_us(), 200);
        assert_eq!(login.max_latency_us, 300);
        assert_eq!(login.status_codes[&400], 1);
        assert_eq!(state.get_request_count(), 3);
    }

    #[tokio::test]
    async fn test_ready_flag() {
        let state = test_state();
        assert!(state.is_ready());
        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
