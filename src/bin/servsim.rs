//! servsim - simulated server telemetry endpoints
//!
//! Usage:
//!   servsim web --port 8080 --base-rate 50
//!   servsim db  --port 8090 --partitions shop,analytics
//!   RUST_LOG=servsim=debug servsim web

use clap::Parser;
use servsim::{Cli, DbServer, ProfileKind, ServsimError, WebServer, serve};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServsimError> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.command.resolve()?;
    info!(
        profile = ?config.profile,
        base_rate = config.base_rate,
        partitions = ?config.partitions,
        "Starting servsim."
    );

    match config.profile {
        ProfileKind::Web => serve(WebServer::new(config.base_rate, &config.partitions), &config).await,
        ProfileKind::Db => serve(DbServer::new(config.base_rate, &config.partitions), &config).await,
    }
}
