//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{
    AdminServiceImpl, AuthServiceImpl, ChatLimits, ChatServiceImpl, PostServiceImpl,
    RatingServiceImpl, ReportServiceImpl, SubscriptionServiceImpl, TagServiceImpl,
    UserServiceImpl, WalletServiceImpl,
};
use crate::config::Settings;
use crate::domain::Credits;
use crate::infrastructure::repositories::{
    PgChatRepository, PgImageRepository, PgPostRepository, PgRatingRepository,
    PgReportRepository, PgSessionRepository, PgStatsRepository, PgSubscriptionRepository,
    PgTagRepository, PgUserRepository, PgWalletRepository,
};
use crate::infrastructure::storage::LocalMediaStorage;
use crate::infrastructure::{cache, database};
use crate::presentation::http::routes;
use crate::presentation::websocket::{spawn_redelivery, Gateway};
use crate::shared::snowflake::SnowflakeGenerator;

pub type AuthServiceHandle = AuthServiceImpl<PgUserRepository, PgSessionRepository>;
pub type UserServiceHandle =
    UserServiceImpl<PgUserRepository, PgWalletRepository, PgSubscriptionRepository>;
pub type PostServiceHandle = PostServiceImpl<
    PgPostRepository,
    PgImageRepository,
    PgSubscriptionRepository,
    LocalMediaStorage,
>;
pub type ChatServiceHandle = ChatServiceImpl<PgChatRepository, PgUserRepository, LocalMediaStorage>;
pub type WalletServiceHandle = WalletServiceImpl<PgWalletRepository>;
pub type SubscriptionServiceHandle =
    SubscriptionServiceImpl<PgSubscriptionRepository, PgUserRepository>;
pub type TagServiceHandle = TagServiceImpl<PgTagRepository>;
pub type RatingServiceHandle = RatingServiceImpl<PgRatingRepository, PgChatRepository>;
pub type ReportServiceHandle =
    ReportServiceImpl<PgReportRepository, PgUserRepository, PgPostRepository>;
pub type AdminServiceHandle = AdminServiceImpl<
    PgUserRepository,
    PgSessionRepository,
    PgPostRepository,
    PgReportRepository,
    PgWalletRepository,
    PgStatsRepository,
>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Only present when `redis.url` is configured
    pub redis: Option<ConnectionManager>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub gateway: Arc<Gateway>,
    pub storage: Arc<LocalMediaStorage>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings, db: PgPool, redis: Option<ConnectionManager>) -> Self {
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            0u64,
        ));
        let gateway = Arc::new(Gateway::new(&settings.websocket, settings.delivery.clone()));
        let storage = Arc::new(LocalMediaStorage::new(settings.media.root.clone()));

        Self {
            db,
            redis,
            snowflake,
            gateway,
            storage,
            settings: Arc::new(settings),
        }
    }

    fn repo<R>(&self, build: fn(PgPool) -> R) -> Arc<R> {
        Arc::new(build(self.db.clone()))
    }

    pub fn auth_service(&self) -> AuthServiceHandle {
        AuthServiceImpl::new(
            self.repo(PgUserRepository::new),
            self.repo(PgSessionRepository::new),
            self.snowflake.clone(),
            self.settings.jwt.clone(),
            self.settings.admin.clone(),
            Credits::new(self.settings.wallet.initial_balance),
        )
    }

    pub fn user_service(&self) -> UserServiceHandle {
        UserServiceImpl::new(
            self.repo(PgUserRepository::new),
            self.repo(PgWalletRepository::new),
            self.repo(PgSubscriptionRepository::new),
            self.settings.subscription.max_price,
        )
    }

    pub fn post_service(&self) -> PostServiceHandle {
        PostServiceImpl::new(
            self.repo(PgPostRepository::new),
            self.repo(PgImageRepository::new),
            self.repo(PgSubscriptionRepository::new),
            self.storage.clone(),
            self.snowflake.clone(),
            self.settings.media.clone(),
        )
    }

    pub fn chat_service(&self) -> ChatServiceHandle {
        ChatServiceImpl::new(
            self.repo(PgChatRepository::new),
            self.repo(PgUserRepository::new),
            self.storage.clone(),
            self.snowflake.clone(),
            ChatLimits {
                max_transfer: self.settings.wallet.max_transfer,
                media: self.settings.media.clone(),
            },
        )
    }

    pub fn wallet_service(&self) -> WalletServiceHandle {
        WalletServiceImpl::new(
            self.repo(PgWalletRepository::new),
            self.settings.wallet.clone(),
        )
    }

    pub fn subscription_service(&self) -> SubscriptionServiceHandle {
        SubscriptionServiceImpl::new(
            self.repo(PgSubscriptionRepository::new),
            self.repo(PgUserRepository::new),
            self.snowflake.clone(),
            self.settings.subscription.duration_days,
        )
    }

    pub fn tag_service(&self) -> TagServiceHandle {
        TagServiceImpl::new(self.repo(PgTagRepository::new))
    }

    pub fn rating_service(&self) -> RatingServiceHandle {
        RatingServiceImpl::new(
            self.repo(PgRatingRepository::new),
            self.repo(PgChatRepository::new),
            self.snowflake.clone(),
        )
    }

    pub fn report_service(&self) -> ReportServiceHandle {
        ReportServiceImpl::new(
            self.repo(PgReportRepository::new),
            self.repo(PgUserRepository::new),
            self.repo(PgPostRepository::new),
            self.snowflake.clone(),
        )
    }

    pub fn admin_service(&self) -> AdminServiceHandle {
        AdminServiceImpl::new(
            self.repo(PgUserRepository::new),
            self.repo(PgSessionRepository::new),
            self.repo(PgPostRepository::new),
            self.repo(PgReportRepository::new),
            self.repo(PgWalletRepository::new),
            self.repo(PgStatsRepository::new),
        )
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        // Redis only backs rate limiting; run without it if unreachable
        let redis = if settings.redis.is_enabled() {
            match cache::create_redis_client(&settings.redis).await {
                Ok(conn) => {
                    tracing::info!("Redis connection established");
                    Some(conn)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, rate limiting disabled");
                    None
                }
            }
        } else {
            tracing::info!("Redis not configured, rate limiting disabled");
            None
        };

        let addr = settings.server_addr();
        let state = AppState::new(settings, db, redis);
        state.storage.init().await?;

        spawn_redelivery(state.gateway.clone());

        let router = routes::create_router(state);

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
