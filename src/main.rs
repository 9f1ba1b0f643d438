mod auth;
mod cli;
mod config;
mod error;
mod jenkins;
mod metrics;
mod poller;
mod server;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    info!("Starting Jenkins exporter {}", env!("CARGO_PKG_VERSION"));
    cli.execute().await?;

    Ok(())
}
