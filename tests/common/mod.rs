//! Common Test Utilities
//!
//! Builds the real router over a lazily connected pool, so every test here
//! exercises paths that finish before the database is touched.

use axum_test::TestServer;
use chrono::{Duration, Utc};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;
use jsonwebtoken::{encode, EncodingKey, Header};

use market_server::application::services::Claims;
use market_server::config::Settings;
use market_server::domain::UserRole;
use market_server::infrastructure::database;
use market_server::presentation::http::routes;
use market_server::startup::AppState;

/// Test application wrapping an in-process server
pub struct TestApp {
    pub server: TestServer,
    pub settings: Settings,
}

impl TestApp {
    pub fn new() -> Self {
        let settings = Settings::for_tests().expect("test settings");
        let pool = database::create_lazy_pool(&settings.database).expect("lazy pool");
        let state = AppState::new(settings.clone(), pool, None);
        let server = TestServer::new(routes::create_router(state)).expect("test server");

        Self { server, settings }
    }

    /// Signed access token for an arbitrary user id and role
    pub fn token_for(&self, user_id: i64, role: UserRole) -> String {
        self.token_expiring(user_id, role, Duration::minutes(15))
    }

    pub fn token_expiring(&self, user_id: i64, role: UserRole, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt.secret.as_bytes()),
        )
        .expect("token")
    }
}

pub fn fake_email() -> String {
    SafeEmail().fake()
}

pub fn fake_username() -> String {
    let name: String = Username().fake();
    name.chars().take(32).collect()
}
