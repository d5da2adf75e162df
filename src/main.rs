//! event-api server binary.

use std::path::PathBuf;

use clap::Parser;

use event_api::config::load_config;
use event_api::lifecycle::{signals, startup, Shutdown};
use event_api::observability::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "event-api", version, about = "Event management API server")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Seed the store from a CSV dataset before accepting traffic.
    #[arg(long)]
    import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), args.bind.as_deref())?;

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "event-api starting");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::forward_signals(shutdown.clone()));

    startup::run(config, args.import.as_deref(), &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
