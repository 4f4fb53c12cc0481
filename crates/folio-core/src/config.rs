//! Folio Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `API_HOST` | Server bind address | `0.0.0.0` |
//! | `API_PORT` | Server bind port | `8080` |
//! | `APP_ENV` | `development` or `production` | `development` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | empty |
//! | `ACCESS_TOKEN_SECRET` | HMAC secret for access tokens | development value |
//! | `REFRESH_TOKEN_SECRET` | HMAC secret for refresh tokens | development value |
//! | `ACCESS_TOKEN_EXPIRY` | Access token lifetime (`15m`, `900`, ...) | `15m` |
//! | `REFRESH_TOKEN_EXPIRY` | Refresh token lifetime | `7d` |
//! | `TOKEN_ISSUER` | `iss` claim | `folio-api` |
//! | `TOKEN_AUDIENCE` | `aud` claim | `folio-web` |
//! | `REVOCATION_SWEEP_SECS` | Interval of the expired-revocation sweeper | `60` |
//! | `LOG_LEVEL` | Log filter | `info` |
//! | `LOG_FORMAT` | `json` or `pretty` | `pretty` |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Access-token secret used when none is configured. Rejected in production.
pub const DEV_ACCESS_SECRET: &str = "development-access-secret-change-in-production";

/// Refresh-token secret used when none is configured. Rejected in production.
pub const DEV_REFRESH_SECRET: &str = "development-refresh-secret-change-in-production";

/// Minimum secret length (bytes) accepted in production.
pub const MIN_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token and password settings
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(env) = std::env::var("APP_ENV") {
            self.server.environment = env.parse()?;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Tokens
        if let Ok(secret) = std::env::var("ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = secret;
        }
        if let Ok(secret) = std::env::var("REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = secret;
        }
        if let Ok(expiry) = std::env::var("ACCESS_TOKEN_EXPIRY") {
            self.auth.access_token_ttl_secs = parse_duration_secs("ACCESS_TOKEN_EXPIRY", &expiry)?;
        }
        if let Ok(expiry) = std::env::var("REFRESH_TOKEN_EXPIRY") {
            self.auth.refresh_token_ttl_secs =
                parse_duration_secs("REFRESH_TOKEN_EXPIRY", &expiry)?;
        }
        if let Ok(issuer) = std::env::var("TOKEN_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Ok(audience) = std::env::var("TOKEN_AUDIENCE") {
            self.auth.audience = audience;
        }
        if let Ok(interval) = std::env::var("REVOCATION_SWEEP_SECS") {
            self.auth.sweep_interval_secs =
                parse_duration_secs("REVOCATION_SWEEP_SECS", &interval)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Check the configuration for values that must never reach a running server.
    ///
    /// Secrets must always differ from each other. In production they must also
    /// be explicitly configured and at least [`MIN_SECRET_LEN`] bytes long.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;

        if auth.access_token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_TOKEN_EXPIRY".to_string(),
                value: "0".to_string(),
            });
        }
        if auth.refresh_token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REFRESH_TOKEN_EXPIRY".to_string(),
                value: "0".to_string(),
            });
        }
        if auth.access_token_secret == auth.refresh_token_secret {
            return Err(ConfigError::InvalidValue {
                key: "REFRESH_TOKEN_SECRET".to_string(),
                value: "<same as ACCESS_TOKEN_SECRET>".to_string(),
            });
        }

        if self.server.environment.is_production() {
            for (key, secret, default) in [
                ("ACCESS_TOKEN_SECRET", &auth.access_token_secret, DEV_ACCESS_SECRET),
                ("REFRESH_TOKEN_SECRET", &auth.refresh_token_secret, DEV_REFRESH_SECRET),
            ] {
                if secret.is_empty() || secret == default {
                    return Err(ConfigError::MissingRequired(key.to_string()));
                }
                if secret.len() < MIN_SECRET_LEN {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: format!("<{} bytes, need {MIN_SECRET_LEN}>", secret.len()),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                key: "APP_ENV".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Deployment environment
    pub environment: Environment,

    /// Allowed origins for CORS (empty = permissive outside production)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            cors_origins: vec![],
        }
    }
}

/// Token issuance and verification settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    pub access_token_secret: String,

    /// HMAC secret for refresh tokens (must differ from the access secret)
    pub refresh_token_secret: String,

    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: u64,

    /// `iss` claim written and required on every token
    pub issuer: String,

    /// `aud` claim written and required on every token
    pub audience: String,

    /// How often expired revocation entries are swept
    pub sweep_interval_secs: u64,

    /// Password hashing cost
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_token_secret: DEV_REFRESH_SECRET.to_string(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            issuer: "folio-api".to_string(),
            audience: "folio-web".to_string(),
            sweep_interval_secs: 60,
            password: PasswordConfig::default(),
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("password", &self.password)
            .finish()
    }
}

/// Argon2id cost parameters
///
/// Increasing memory or iterations improves resistance to offline guessing
/// but slows down every login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 2)
    pub time_cost: u32,
    /// Parallelism (lanes, default: 1)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Minimal parameters for tests and local tooling.
    pub fn lightweight() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Parse a lifetime such as `15m`, `7d`, `12h`, `30s` or plain seconds.
pub fn parse_duration_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, 's')) => (&trimmed[..idx], 1),
        Some((idx, 'm')) => (&trimmed[..idx], 60),
        Some((idx, 'h')) => (&trimmed[..idx], 60 * 60),
        Some((idx, 'd')) => (&trimmed[..idx], 24 * 60 * 60),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    let amount: u64 = digits.trim().parse().map_err(|_| invalid())?;
    amount.checked_mul(multiplier).ok_or_else(invalid)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.access_token_ttl_secs, 900);
        assert_eq!(config.auth.refresh_token_ttl_secs, 604_800);
        assert_eq!(config.auth.issuer, "folio-api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("K", "15m").unwrap(), 900);
        assert_eq!(parse_duration_secs("K", "7d").unwrap(), 604_800);
        assert_eq!(parse_duration_secs("K", "2h").unwrap(), 7200);
        assert_eq!(parse_duration_secs("K", "45s").unwrap(), 45);
        assert_eq!(parse_duration_secs("K", "3600").unwrap(), 3600);
        assert!(parse_duration_secs("K", "").is_err());
        assert!(parse_duration_secs("K", "m").is_err());
        assert!(parse_duration_secs("K", "ten minutes").is_err());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let mut config = AppConfig::default();
        config.auth.refresh_token_secret = config.auth.access_token_secret.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_production_requires_real_secrets() {
        let mut config = AppConfig::default();
        config.server.environment = Environment::Production;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));

        config.auth.access_token_secret = "short".to_string();
        config.auth.refresh_token_secret = "also-short".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        config.auth.access_token_secret = "a".repeat(MIN_SECRET_LEN);
        config.auth.refresh_token_secret = "b".repeat(MIN_SECRET_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_uses_defaults_for_missing_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [auth]
            issuer = "folio-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.issuer, "folio-test");
        assert_eq!(config.auth.audience, "folio-web");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", AuthConfig::default());
        assert!(!rendered.contains(DEV_ACCESS_SECRET));
        assert!(rendered.contains("<redacted>"));
    }
}
