//! Authentication Service
//!
//! Handles registration, login, JWT issuance and refresh-token sessions.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{AdminSettings, JwtSettings};
use crate::domain::{Credits, Session, SessionRepository, User, UserRepository, UserRole};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user (and their wallet)
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, AuthTokens), AuthError>;

    /// Authenticate user with credentials
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, AuthTokens), AuthError>;

    /// Exchange a refresh token for a new token pair (rotation)
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke refresh token (logout). Unknown tokens are ignored.
    async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError>;

    /// Validate access token and return its claims
    fn validate_token(&self, access_token: &str) -> Result<Claims, AuthError>;
}

/// Authentication tokens response
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Account role at issue time
    pub role: UserRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse::<i64>().map_err(|_| AuthError::InvalidToken)
    }
}

/// Decode and validate an HS256 access token.
pub fn decode_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Hex SHA-256 of a refresh token, as stored in `user_sessions`.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is banned")]
    Banned,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Email already exists")]
    EmailExists,

    #[error("Username already exists")]
    UsernameExists,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".into())
            }
            AuthError::Banned => AppError::Forbidden("Account is banned".into()),
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            AuthError::InvalidToken => AppError::Unauthorized("Invalid token".into()),
            AuthError::SessionNotFound => {
                AppError::Unauthorized("Invalid or expired refresh token".into())
            }
            AuthError::EmailExists => AppError::Conflict("Email already exists".into()),
            AuthError::UsernameExists => AppError::Conflict("Username already exists".into()),
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Repository(e) => e,
        }
    }
}

/// AuthService implementation
pub struct AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    id_generator: Arc<SnowflakeGenerator>,
    jwt_settings: JwtSettings,
    admin_settings: AdminSettings,
    initial_balance: Credits,
}

impl<U, S> AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    /// Create a new AuthServiceImpl
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        id_generator: Arc<SnowflakeGenerator>,
        jwt_settings: JwtSettings,
        admin_settings: AdminSettings,
        initial_balance: Credits,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            id_generator,
            jwt_settings,
            admin_settings,
            initial_balance,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let now = Utc::now();
        let access_expiry = now + Duration::minutes(self.jwt_settings.access_token_expiry_minutes);

        let access_claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: access_expiry.timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))?;

        // Opaque refresh token; only its hash is stored
        let refresh_token = format!("{}.{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt_settings.access_token_expiry_minutes * 60,
            token_type: "Bearer".to_string(),
        })
    }

    fn refresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.jwt_settings.refresh_token_expiry_days)
    }

    /// Issue tokens and persist the refresh session.
    async fn start_session(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let tokens = self.generate_tokens(user)?;
        let session = Session::new(
            user.id,
            hash_refresh_token(&tokens.refresh_token),
            self.refresh_expiry(),
        );
        self.session_repo.create(&session).await?;
        Ok(tokens)
    }
}

#[async_trait]
impl<U, S> AuthService for AuthServiceImpl<U, S>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, AuthTokens), AuthError> {
        let email = email.trim().to_lowercase();
        let username = username.trim();

        if self.user_repo.email_exists(&email).await? {
            return Err(AuthError::EmailExists);
        }
        if self.user_repo.username_exists(username).await? {
            return Err(AuthError::UsernameExists);
        }

        let role = if self.admin_settings.is_bootstrap_admin(&email) {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            username: username.to_string(),
            email,
            password_hash: self.hash_password(password)?,
            display_name: None,
            bio: None,
            role,
            banned: false,
            subscription_price: None,
            created_at: now,
            updated_at: now,
        };

        let created_user = self.user_repo.create(&user, self.initial_balance).await?;
        let tokens = self.start_session(&created_user).await?;

        tracing::info!(user_id = created_user.id, role = %created_user.role, "User registered");
        Ok((created_user, tokens))
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, AuthTokens), AuthError> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if user.banned {
            return Err(AuthError::Banned);
        }

        let tokens = self.start_session(&user).await?;
        Ok((user, tokens))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let presented_hash = hash_refresh_token(refresh_token);
        let session = self
            .session_repo
            .find_by_token_hash(&presented_hash)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !session.is_active() {
            return Err(AuthError::SessionNotFound);
        }

        let user = self
            .user_repo
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if user.banned {
            self.session_repo.revoke(session.id).await?;
            return Err(AuthError::Banned);
        }

        let new_tokens = self.generate_tokens(&user)?;
        self.session_repo
            .rotate(
                session.id,
                &presented_hash,
                &hash_refresh_token(&new_tokens.refresh_token),
                self.refresh_expiry(),
            )
            .await?;

        Ok(new_tokens)
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        if let Some(session) = self
            .session_repo
            .find_by_token_hash(&hash_refresh_token(refresh_token))
            .await?
        {
            self.session_repo.revoke(session.id).await?;
        }
        Ok(())
    }

    fn validate_token(&self, access_token: &str) -> Result<Claims, AuthError> {
        decode_access_token(access_token, &self.jwt_settings.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockSessionRepository, MockUserRepository};
    use mockall::predicate::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: SECRET.into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn service(
        users: MockUserRepository,
        sessions: MockSessionRepository,
    ) -> AuthServiceImpl<MockUserRepository, MockSessionRepository> {
        AuthServiceImpl::new(
            Arc::new(users),
            Arc::new(sessions),
            Arc::new(SnowflakeGenerator::new(1, 1)),
            jwt(),
            AdminSettings {
                bootstrap_emails: vec!["root@example.com".into()],
            },
            Credits::new(250),
        )
    }

    fn stored_user(password: &str, banned: bool) -> User {
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string();
        User {
            id: 42,
            username: "buyer".into(),
            email: "buyer@example.com".into(),
            password_hash: hash,
            banned,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_creates_user_wallet_and_session() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(false));
        users.expect_username_exists().returning(|_| Ok(false));
        users
            .expect_create()
            .withf(|user, balance| {
                user.email == "root@example.com"
                    && user.role == UserRole::Admin
                    && *balance == Credits::new(250)
            })
            .times(1)
            .returning(|user, _| Ok(user.clone()));

        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_create()
            .times(1)
            .returning(|session| Ok(session.clone()));

        let (user, tokens) = service(users, sessions)
            .register("root", "  Root@Example.com ", "password123")
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Admin);
        assert_ne!(user.password_hash, "password123");
        assert_eq!(tokens.token_type, "Bearer");

        let claims = decode_access_token(&tokens.access_token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(true));

        let err = service(users, MockSessionRepository::new())
            .register("buyer", "buyer@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailExists));
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut users = MockUserRepository::new();
        let user = stored_user("correct-horse", false);
        users
            .expect_find_by_email()
            .with(eq("buyer@example.com"))
            .returning(move |_| Ok(Some(user.clone())));

        let err = service(users, MockSessionRepository::new())
            .authenticate("buyer@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_banned_user() {
        let mut users = MockUserRepository::new();
        let user = stored_user("correct-horse", true);
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let err = service(users, MockSessionRepository::new())
            .authenticate("buyer@example.com", "correct-horse")
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let mut users = MockUserRepository::new();
        let user = stored_user("pw-pw-pw-pw", false);
        users
            .expect_find_by_id()
            .with(eq(42))
            .returning(move |_| Ok(Some(user.clone())));

        let mut sessions = MockSessionRepository::new();
        let session = Session::new(
            42,
            hash_refresh_token("old-token"),
            Utc::now() + Duration::days(1),
        );
        let session_id = session.id;
        sessions
            .expect_find_by_token_hash()
            .with(eq(hash_refresh_token("old-token")))
            .returning(move |_| Ok(Some(session.clone())));
        sessions
            .expect_rotate()
            .withf(move |id, old_hash, new_hash, _| {
                *id == session_id
                    && old_hash == hash_refresh_token("old-token")
                    && new_hash != hash_refresh_token("old-token")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let tokens = service(users, sessions).refresh_token("old-token").await.unwrap();
        assert_ne!(tokens.refresh_token, "old-token");
    }

    #[tokio::test]
    async fn test_refresh_loses_race_for_same_token() {
        let mut users = MockUserRepository::new();
        let user = stored_user("pw-pw-pw-pw", false);
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let mut sessions = MockSessionRepository::new();
        let session = Session::new(
            42,
            hash_refresh_token("old-token"),
            Utc::now() + Duration::days(1),
        );
        sessions
            .expect_find_by_token_hash()
            .returning(move |_| Ok(Some(session.clone())));
        // Another refresh already swapped the hash
        sessions.expect_rotate().times(1).returning(|_, _, _, _| {
            Err(AppError::Unauthorized(
                "Refresh token has already been used or revoked".into(),
            ))
        });

        let err = service(users, sessions)
            .refresh_token("old-token")
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_refresh_unknown_token() {
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|_| Ok(None));

        let err = service(MockUserRepository::new(), sessions)
            .refresh_token("nope")
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|_| Ok(None));
        sessions.expect_revoke().never();

        service(MockUserRepository::new(), sessions)
            .revoke_token("already-gone")
            .await
            .unwrap();
    }

    #[test]
    fn test_tampered_token_rejected() {
        let err = decode_access_token("not.a.jwt", SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_hash_refresh_token_is_stable_hex() {
        let hash = hash_refresh_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_refresh_token("abc"));
    }
}
