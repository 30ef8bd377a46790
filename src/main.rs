use anyhow::Context;
use std::sync::Arc;
use stock_screener::api::ApiServer;
use stock_screener::{AppState, ScreenerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_screener=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Stock Screener...");

    let config = ScreenerConfig::from_env().context("failed to load configuration")?;
    let state = AppState::new(config).context("failed to initialize application state")?;

    let mut server = ApiServer::new(Arc::new(state));
    let handle = server.start().await.context("failed to start API server")?;

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    server.stop();
    handle.await.context("API server task failed")?;

    Ok(())
}
