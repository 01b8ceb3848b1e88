//! User account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to newly registered accounts
pub const DEFAULT_ROLE: &str = "user";

/// User account stored in database
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub user_name: String,

    /// Login email, unique across accounts
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// Role carried in issued tokens
    pub role: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh id and the default role
    pub fn new(
        user_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_name: user_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: DEFAULT_ROLE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update request; absent or blank fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Password change request
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: new user gets default role and matching timestamps
    #[test]
    fn test_user_new_defaults() {
        let user = User::new("alice", "alice@example.com", "$argon2id$hash");

        assert_eq!(user.role, DEFAULT_ROLE);
        assert_eq!(user.created_at, user.updated_at);
        assert_ne!(user.id, Uuid::nil());
    }

    // Test 2: response never includes the password hash
    #[test]
    fn test_user_response_hides_hash() {
        let user = User::new("alice", "alice@example.com", "$argon2id$hash").with_role("admin");
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();

        assert_eq!(json["role"], "admin");
        assert_eq!(json["email"], "alice@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }

    // Test 3: update request tolerates missing fields
    #[test]
    fn test_update_request_partial() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"user_name":"bob"}"#).unwrap();
        assert_eq!(req.user_name.as_deref(), Some("bob"));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
    }
}
