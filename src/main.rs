use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod infrastructure;
mod modules;
mod state;
mod workers;

use crate::config::settings::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::new();
    info!(
        broker = %config.broker.host,
        queue = %config.broker.queue,
        bucket = %config.storage.bucket,
        callback = %config.callback_url,
        "Starting media worker"
    );

    tokio::fs::create_dir_all(&config.scratch_dir).await?;

    let state = AppState::from_config(config)?;

    if let Err(e) = workers::transcoder::start_transcoder_worker(state, shutdown_signal()).await {
        error!("{:#}", e);
        return Err(e);
    }

    info!("Media worker shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
