//! courierd — privileged fetch executor daemon.
//!
//! Listens on a Unix socket and performs HTTP requests on behalf of
//! restricted clients, buffered or streamed.

use anyhow::{Context, Result};
use tokio::net::UnixListener;

use courier_core::CourierConfig;
use courier_executor::{unix, FetchExecutor};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = CourierConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = CourierConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        CourierConfig::default()
    });

    let socket_path = config.daemon.socket_path.clone();
    if socket_path.exists() {
        // Stale socket from a previous run.
        std::fs::remove_file(&socket_path)
            .with_context(|| format!("failed to remove stale socket {}", socket_path.display()))?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind {}", socket_path.display()))?;
    tracing::info!(socket = %socket_path.display(), "courierd listening");

    let executor = FetchExecutor::from_config(&config).context("failed to build http client")?;

    tokio::select! {
        outcome = unix::serve(listener, executor) => {
            outcome.context("accept loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}
