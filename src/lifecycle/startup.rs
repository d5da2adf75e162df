//! Startup orchestration.
//!
//! Config is loaded and validated before anything else; the listener binds
//! last so traffic only arrives once every subsystem is ready.

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::dataset::{self, ImportError};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address {0}")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("seed import failed: {0}")]
    Import(#[from] ImportError),
}

/// Start the metrics exporter (if enabled), optionally seed the store from a
/// CSV file, bind the listener and serve until `shutdown` fires.
pub async fn run(
    config: AppConfig,
    seed: Option<&Path>,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config.clone());
    if let Some(path) = seed {
        dataset::import_file(&server.state().store, &config.dataset.source_name, path).await?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        rate_limit_enabled = config.rate_limit.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
