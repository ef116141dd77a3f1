//! review-cloud — backend for the review QR code / short link service
//!
//! Long-running HTTP service that:
//! - Receives Stripe webhooks and keeps subscription state and plan tiers in sync
//! - Creates Stripe checkout and billing portal sessions
//! - Serves short link redirects and counts scans
//! - Provides the QR code, profile and dashboard API (bearer token authenticated)

mod api;
mod auth;
mod billing;
mod config;
mod db;
mod error;
mod state;
mod stripe;
mod util;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting review-cloud (env: {})", config.environment);
    if config.allow_unsigned_webhooks {
        tracing::warn!("Unsigned Stripe webhooks are accepted");
    }

    let state = AppState::new(&config).await?;
    let app = api::create_router(state.clone());

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("review-cloud HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
