mod batching;
mod classify;
mod config;
mod errors;
mod hub;
mod metrics;
mod model;
mod relay;
mod rest;
mod server;
mod viewers;

use classify::ThresholdTable;
use config::Config;
use relay::Relay;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use viewers::ViewerHub;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Starting telemetry relay");
    info!("Hub: {}", config.hub);
    info!("HTTP server: {}", config.http_addr);

    metrics::init_metrics();

    let thresholds = Arc::new(ThresholdTable::default());
    let viewers = ViewerHub::new(config.viewer_buffer);
    let relay = Arc::new(Relay::new(viewers.clone(), thresholds.clone()));

    let (tx, rx) = mpsc::channel(config.batch_size * 4);

    let client_id = format!("relay-{}", uuid::Uuid::new_v4());
    let hub_conn = config.hub.clone();
    let hub_handle = tokio::spawn(async move {
        if let Err(e) = hub::run_hub(hub_conn, client_id, tx).await {
            error!("Hub task failed: {}", e);
        }
    });

    let batcher_handle = tokio::spawn(batching::run_batcher(
        rx,
        relay,
        config.batch_size,
        config.batch_timeout_ms,
    ));

    let app = server::create_app(viewers, thresholds);

    let listener = match server::bind(&config.http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening for viewers on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = hub_handle => {
            error!("Hub task terminated");
        }
        _ = batcher_handle => {
            error!("Batcher task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}
