/// Reelbase - movie catalog service
///
/// HTTP backend exposing the movie catalog, user registration/login with
/// signed session tokens, and LLM-assisted ranking of admin reviews.

mod api;
mod auth;
mod catalog;
mod config;
mod context;
mod db;
mod error;
mod review;
mod server;
mod tokens;
mod users;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelbase=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
