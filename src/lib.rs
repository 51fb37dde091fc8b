pub mod client;
pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // Session gateway
pub mod sync;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::Context;
use modules::logger;
use tracing::{error, info};

/// Run the gateway until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    let config = modules::config::load_app_config();
    // Logger first so a config failure is still recorded
    let log_dir = config.as_ref().ok().and_then(|c| c.log_dir.clone());
    logger::init_logger(log_dir.as_deref());

    let config = config.context("Failed to load gateway config")?;
    info!(
        "Starting gateway (production: {}, upstream: {})",
        config.gateway.production,
        config.gateway.api_base()
    );

    let (server, handle) = proxy::AxumServer::start(&config.gateway)
        .await
        .context("Failed to start gateway")?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested");
    server.stop();
    handle.await.context("Gateway task failed")?;
    Ok(())
}
