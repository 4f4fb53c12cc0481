//! User account models
//!
//! `User` is the stored account row; `UserPublic` is the only shape that
//! leaves the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User account model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable subject identifier embedded in tokens
    pub id: Uuid,

    /// Unique login name (case-sensitive)
    pub username: String,

    /// Hashed password (Argon2id PHC string)
    /// This field is never serialized in API responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh identifier
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }

    /// Subject claim for tokens issued to this user
    pub fn subject(&self) -> String {
        self.id.to_string()
    }

    /// Convert user to public representation (without sensitive fields)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("alice", "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA");
        assert_eq!(user.username, "alice");
        assert_eq!(user.subject(), user.id.to_string());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("alice", "secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_public_projection_uses_camel_case() {
        let user = User::new("alice", "secret-hash");
        let json = serde_json::to_value(user.to_public()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["id"], user.id.to_string());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("passwordHash").is_none());
    }
}
