//! JWT token generation and validation
//!
//! Implements access and refresh tokens signed with HMAC-SHA256. The two
//! kinds use different secrets and carry a `kind` claim, so a token of one
//! kind never verifies as the other. Verification consults the injected
//! revocation store before the signature is checked.

use chrono::{DateTime, Utc};
use folio_core::{AuthConfig, FolioError, RevocationStore};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Token variant, written into the `kind` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Intended audience
    pub aud: String,
    /// User's login name
    pub username: String,
    /// Access or refresh
    pub kind: TokenKind,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
    /// JWT ID - unique per token so equal claims never produce equal strings
    pub jti: String,
}

/// Identity decoded from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub subject: String,
    pub username: String,
    pub kind: TokenKind,
    pub jti: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token generation and validation errors
///
/// The `Display` text of the verification variants is sent to clients as-is.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Invalid token")]
    Malformed,

    #[error("Failed to encode JWT: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Token lifetime out of range")]
    LifetimeOutOfRange,

    #[error(transparent)]
    Store(#[from] FolioError),
}

/// Token settings
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret key for access tokens (should be at least 256 bits)
    pub access_secret: String,
    /// Secret key for refresh tokens, distinct from the access secret
    pub refresh_secret: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    pub refresh_ttl_secs: u64,
    pub issuer: String,
    pub audience: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for TokenConfig {
    fn from(auth: &AuthConfig) -> Self {
        Self {
            access_secret: auth.access_token_secret.clone(),
            refresh_secret: auth.refresh_token_secret.clone(),
            access_ttl_secs: auth.access_token_ttl_secs,
            refresh_ttl_secs: auth.refresh_token_ttl_secs,
            issuer: auth.issuer.clone(),
            audience: auth.audience.clone(),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies access and refresh tokens
#[derive(Clone)]
pub struct TokenCodec {
    config: TokenConfig,
    access_keys: SigningKeys,
    refresh_keys: SigningKeys,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenCodec {
    pub fn new(config: TokenConfig, revocations: Arc<dyn RevocationStore>) -> Self {
        Self {
            access_keys: SigningKeys::from_secret(&config.access_secret),
            refresh_keys: SigningKeys::from_secret(&config.refresh_secret),
            config,
            revocations,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a short-lived access token for `subject`
    pub fn issue_access_token(
        &self,
        subject: &str,
        username: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.mint(TokenKind::Access, subject, username, Utc::now().timestamp())
    }

    /// Sign a long-lived refresh token for `subject`
    pub fn issue_refresh_token(
        &self,
        subject: &str,
        username: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.mint(TokenKind::Refresh, subject, username, Utc::now().timestamp())
    }

    /// Verify an access token: revoked, then expired, then malformed
    pub async fn verify_access_token(&self, token: &str) -> Result<Credential, TokenError> {
        self.verify(TokenKind::Access, token).await
    }

    /// Verify a refresh token with the same contract as access tokens
    pub async fn verify_refresh_token(&self, token: &str) -> Result<Credential, TokenError> {
        self.verify(TokenKind::Refresh, token).await
    }

    async fn verify(&self, kind: TokenKind, token: &str) -> Result<Credential, TokenError> {
        if self.revocations.is_token_blacklisted(token).await? {
            return Err(TokenError::Revoked);
        }
        self.decode(kind, token)
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access_keys,
            TokenKind::Refresh => &self.refresh_keys,
        }
    }

    fn ttl_secs(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Access => self.config.access_ttl_secs,
            TokenKind::Refresh => self.config.refresh_ttl_secs,
        }
    }

    fn mint(
        &self,
        kind: TokenKind,
        subject: &str,
        username: &str,
        now: i64,
    ) -> Result<IssuedToken, TokenError> {
        let ttl = i64::try_from(self.ttl_secs(kind)).unwrap_or(i64::MAX);
        let exp = now.saturating_add(ttl);
        let expires_at = DateTime::from_timestamp(exp, 0).ok_or(TokenError::LifetimeOutOfRange)?;

        let claims = Claims {
            iss: self.config.issuer.clone(),
            sub: subject.to_string(),
            aud: self.config.audience.clone(),
            username: username.to_string(),
            kind,
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(kind).encoding,
        )?;

        Ok(IssuedToken { token, expires_at })
    }

    fn decode(&self, kind: TokenKind, token: &str) -> Result<Credential, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;

        let claims = data.claims;
        if claims.kind != kind {
            return Err(TokenError::Malformed);
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;

        Ok(Credential {
            subject: claims.sub,
            username: claims.username,
            kind: claims.kind,
            jti: claims.jti,
            issued_at,
            expires_at,
        })
    }
}
