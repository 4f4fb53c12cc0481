//! Folio CLI - operator tooling
//!
//! Usage:
//!   folio hash-password <password>
//!   folio issue-token --subject <id> --username <name> [--refresh]
//!   folio inspect-token <token> [--refresh]

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_api::auth::{hash_password, InMemoryRevocationStore, TokenCodec, TokenConfig};
use folio_core::config::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio authentication operator CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a password with the configured Argon2 parameters
    HashPassword {
        /// Password to hash
        password: String,
    },
    /// Mint a signed token
    IssueToken {
        /// Subject (user ID)
        #[arg(long)]
        subject: String,
        /// Username claim
        #[arg(long)]
        username: String,
        /// Issue a refresh token instead of an access token
        #[arg(long)]
        refresh: bool,
    },
    /// Verify a token and print its claims
    InspectToken {
        /// Encoded token
        token: String,
        /// Verify with the refresh secret instead of the access secret
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::HashPassword { password } => {
            let hash = hash_password(&password, &config.auth.password)?;
            println!("{hash}");
        }
        Commands::IssueToken {
            subject,
            username,
            refresh,
        } => {
            let codec = codec(&config);
            let issued = if refresh {
                codec.issue_refresh_token(&subject, &username)?
            } else {
                codec.issue_access_token(&subject, &username)?
            };
            tracing::debug!(expires_at = %issued.expires_at, "Token issued");
            println!("{}", issued.token);
        }
        Commands::InspectToken { token, refresh } => {
            let codec = codec(&config);
            let result = if refresh {
                codec.verify_refresh_token(&token).await
            } else {
                codec.verify_access_token(&token).await
            };

            match result {
                Ok(credential) => println!("{}", serde_json::to_string_pretty(&credential)?),
                Err(e) => {
                    eprintln!("Token rejected: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::from_env().context("loading configuration from environment")?,
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Codec over an empty revocation store; revocation lives in the server
fn codec(config: &AppConfig) -> TokenCodec {
    TokenCodec::new(
        TokenConfig::from(&config.auth),
        Arc::new(InMemoryRevocationStore::new()),
    )
}
