//! # Market Server
//!
//! Creator marketplace backend: posts, paid private access, chat with
//! in-app payments, and a WebSocket gateway for live delivery.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and optional Redis
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use market_server::config::Settings;
use market_server::presentation::http::handlers::health;
use market_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    market_server::telemetry::init_tracing();
    health::init_server_start();

    info!("Starting Market Server...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
