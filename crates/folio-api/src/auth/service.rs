//! Authentication service layer
//!
//! Business logic for registration, login, token refresh and logout. The
//! service owns no state of its own: users and revocation records live in the
//! injected stores.

use super::jwt::{TokenCodec, TokenError};
use super::middleware::AuthenticatedUser;
use super::password::PasswordManager;
use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::error::AppError;
use folio_core::{FolioError, RevocationStore, User, UserPublic, UserStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User registration request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
    #[validate(length(min = 1, max = 1024, message = "Password must be 1-1024 characters"))]
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    #[validate(length(max = 1024, message = "Password must be at most 1024 characters"))]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Plain confirmation body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Identity returned with a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}

/// Login response with both tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserInfo,
}

/// Refresh response; the refresh token itself is not rotated
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    revocations: Arc<dyn RevocationStore>,
    tokens: TokenCodec,
    passwords: PasswordManager,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationStore>,
        tokens: TokenCodec,
        passwords: PasswordManager,
    ) -> Self {
        Self {
            users,
            revocations,
            tokens,
            passwords,
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Register a new user
    ///
    /// Fails with `Conflict("User already exists")` for a taken username.
    /// No token is issued; the client logs in afterwards.
    pub async fn register(
        &self,
        request: RegisterRequest,
        ctx: &RequestContext,
    ) -> Result<User, AppError> {
        let result = self.create_account(&request).await;

        match &result {
            Ok(user) => audit_log(&AuditEvent::RegistrationSuccess {
                user_id: user.subject(),
                username: user.username.clone(),
                ip_address: ctx.ip_address.clone(),
                user_agent: ctx.user_agent.clone(),
            }),
            Err(e) => audit_log(&AuditEvent::RegistrationFailure {
                username: request.username.clone(),
                reason: e.to_string(),
                ip_address: ctx.ip_address.clone(),
                user_agent: ctx.user_agent.clone(),
            }),
        }

        Ok(result?)
    }

    async fn create_account(&self, request: &RegisterRequest) -> Result<User, FolioError> {
        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(FolioError::Conflict("User already exists".to_string()));
        }

        let password_hash = self
            .passwords
            .hash(&request.password)
            .await
            .map_err(|e| FolioError::Other(e.into()))?;

        // The store re-checks uniqueness under its write lock
        self.users
            .create_user(User::new(request.username.clone(), password_hash))
            .await
    }

    /// Login with username and password
    ///
    /// Unknown users and wrong passwords fail identically, and both run one
    /// password verification.
    pub async fn login(
        &self,
        request: LoginRequest,
        ctx: &RequestContext,
    ) -> Result<LoginResponse, AppError> {
        let user = match self.users.find_by_username(&request.username).await? {
            Some(user) => user,
            None => {
                self.passwords.verify_dummy(&request.password).await;
                self.audit_login_failure(&request.username, "unknown user", ctx);
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self
            .passwords
            .verify(&request.password, &user.password_hash)
            .await?
        {
            self.audit_login_failure(&request.username, "wrong password", ctx);
            return Err(AppError::InvalidCredentials);
        }

        let subject = user.subject();
        let access = self.tokens.issue_access_token(&subject, &user.username)?;
        let refresh = self.tokens.issue_refresh_token(&subject, &user.username)?;

        self.revocations
            .store_refresh_token(&subject, &refresh.token, refresh.expires_at)
            .await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: subject.clone(),
            username: user.username.clone(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(LoginResponse {
            token: access.token,
            refresh_token: refresh.token,
            user: UserInfo {
                id: subject,
                username: user.username,
            },
        })
    }

    fn audit_login_failure(&self, username: &str, reason: &str, ctx: &RequestContext) {
        audit_log(&AuditEvent::LoginFailure {
            username: username.to_string(),
            reason: reason.to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The refresh token must verify and must still be the subject's active
    /// refresh token.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<RefreshResponse, AppError> {
        let credential = match self.tokens.verify_refresh_token(refresh_token).await {
            Ok(credential) => credential,
            Err(e) => {
                if matches!(
                    e,
                    TokenError::Expired | TokenError::Revoked | TokenError::Malformed
                ) {
                    self.audit_refresh_failure(&e.to_string(), ctx);
                }
                return Err(e.into());
            }
        };

        if !self
            .revocations
            .is_valid_refresh_token(&credential.subject, refresh_token)
            .await?
        {
            self.audit_refresh_failure("not the active refresh token", ctx);
            return Err(AppError::Forbidden(
                "Invalid or revoked refresh token".to_string(),
            ));
        }

        let access = self
            .tokens
            .issue_access_token(&credential.subject, &credential.username)?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id: credential.subject,
            username: credential.username,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(RefreshResponse {
            access_token: access.token,
        })
    }

    fn audit_refresh_failure(&self, reason: &str, ctx: &RequestContext) {
        audit_log(&AuditEvent::TokenRefreshFailure {
            reason: reason.to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });
    }

    /// Revoke the presented access token and, if given, the refresh token
    pub async fn logout(
        &self,
        user: &AuthenticatedUser,
        request: LogoutRequest,
        ctx: &RequestContext,
    ) -> Result<(), AppError> {
        self.revocations
            .blacklist_token(&user.token, user.expires_at)
            .await?;

        let refresh_token = request.refresh_token.filter(|t| !t.is_empty());
        if let Some(refresh_token) = &refresh_token {
            self.revocations.remove_refresh_token(refresh_token).await?;
        }

        audit_log(&AuditEvent::Logout {
            user_id: user.subject.clone(),
            username: user.username.clone(),
            refresh_token_revoked: refresh_token.is_some(),
            ip_address: ctx.ip_address.clone(),
        });

        Ok(())
    }

    /// Verify a bearer token and resolve the caller
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, TokenError> {
        let credential = self.tokens.verify_access_token(token).await?;
        Ok(AuthenticatedUser::from_credential(credential, token))
    }

    /// Profile of the user behind `subject`
    pub async fn get_user(&self, subject: &str) -> Result<UserPublic, AppError> {
        let id = Uuid::parse_str(subject).map_err(|_| AppError::NotFound("User".to_string()))?;

        self.users
            .find_by_id(id)
            .await?
            .map(|user| user.to_public())
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }
}
