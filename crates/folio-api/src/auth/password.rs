//! Password hashing and verification using Argon2id
//!
//! - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
//! - Salt: 16 bytes random, embedded in the PHC string
//! - Cost: taken from `PasswordConfig`
//!
//! Hashing is CPU-bound, so the async entry points on [`PasswordManager`]
//! run it on the blocking thread pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use folio_core::PasswordConfig;
use std::sync::Arc;
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Password task failed: {0}")]
    TaskFailed(String),
}

fn to_params(config: &PasswordConfig) -> Result<Params, PasswordError> {
    Params::new(
        config.memory_cost,
        config.time_cost,
        config.parallelism,
        config.output_len,
    )
    .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Hash a plaintext password using Argon2id
///
/// Returns a PHC string (algorithm, parameters, salt and hash), safe to store.
///
/// # Example
///
/// ```no_run
/// use folio_api::auth::password::hash_password;
/// use folio_core::PasswordConfig;
///
/// let hash = hash_password("secret1", &PasswordConfig::default()).unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = to_params(config)?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - The stored hash is unusable
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    // Parameters come from the PHC string
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Async password hashing with a fixed cost configuration
#[derive(Clone)]
pub struct PasswordManager {
    config: Arc<PasswordConfig>,
    dummy_hash: Arc<str>,
}

impl PasswordManager {
    /// Build a manager and precompute the hash used for unknown-user logins.
    pub fn new(config: PasswordConfig) -> Result<Self, PasswordError> {
        let dummy_hash = hash_password("folio-dummy-password", &config)?;
        Ok(Self {
            config: Arc::new(config),
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn config(&self) -> &PasswordConfig {
        &self.config
    }

    /// Hash on the blocking pool
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_owned();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    /// Verify on the blocking pool
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    /// Burn the same work as a real verification; always `false`.
    pub async fn verify_dummy(&self, password: &str) -> bool {
        let dummy = self.dummy_hash.to_string();
        let _ = self.verify(password, &dummy).await;
        false
    }
}
