//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Credits;
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// Account role matching the `users.role` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a user account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - username: VARCHAR(32) NOT NULL UNIQUE
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL
/// - display_name: VARCHAR(64) NULL
/// - bio: TEXT NULL
/// - role: TEXT NOT NULL DEFAULT 'user'
/// - banned: BOOLEAN NOT NULL DEFAULT FALSE
/// - subscription_price: BIGINT NULL (price of private access, NULL = not selling)
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Username (2-32 characters, unique)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name (optional)
    pub display_name: Option<String>,

    /// Profile text
    pub bio: Option<String>,

    pub role: UserRole,

    pub banned: bool,

    /// Price of private access to this user's posts
    pub subscription_price: Option<Credits>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Get the user's display name, falling back to username if not set.
    pub fn display_name_or_username(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether other users can buy private access from this user.
    pub fn sells_access(&self) -> bool {
        !self.banned && self.subscription_price.is_some_and(|p| p.is_positive())
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: String::new(),
            email: String::new(),
            password_hash: String::new(),
            display_name: None,
            bio: None,
            role: UserRole::default(),
            banned: false,
            subscription_price: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Aggregates shown on a public profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStats {
    pub post_count: i64,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
}

/// Repository trait for User data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find a user by their email address (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create a new user together with their wallet.
    async fn create(&self, user: &User, initial_balance: Credits) -> Result<User, AppError>;

    /// Update profile fields (display name, bio, subscription price).
    async fn update_profile(&self, user: &User) -> Result<User, AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Check if a username is already taken.
    async fn username_exists(&self, username: &str) -> Result<bool, AppError>;

    /// Set or clear the banned flag.
    async fn set_banned(&self, id: i64, banned: bool) -> Result<(), AppError>;

    /// List users newest first, optionally filtered by username/email prefix.
    async fn search(&self, query: Option<String>, page: Page) -> Result<Vec<User>, AppError>;

    /// Post count and rating summary for a profile.
    async fn stats(&self, id: i64) -> Result<UserStats, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin"), UserRole::Admin);
        assert_eq!(UserRole::from_str("ADMIN"), UserRole::Admin);
        assert_eq!(UserRole::from_str("user"), UserRole::User);
        assert_eq!(UserRole::from_str("unknown"), UserRole::User);
    }

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::User.to_string(), "user");
    }

    #[test]
    fn test_display_name_fallback() {
        let mut user = User {
            username: "seller".into(),
            ..Default::default()
        };
        assert_eq!(user.display_name_or_username(), "seller");

        user.display_name = Some("The Seller".into());
        assert_eq!(user.display_name_or_username(), "The Seller");
    }

    #[test]
    fn test_sells_access() {
        let mut user = User::default();
        assert!(!user.sells_access());

        user.subscription_price = Some(Credits::new(500));
        assert!(user.sells_access());

        user.banned = true;
        assert!(!user.sells_access());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            password_hash: "secret".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }
}
