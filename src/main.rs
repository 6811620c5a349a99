mod activate;
mod catalog;
mod cli;
mod config;
mod download;
mod error;
mod install;
mod selector;
mod store;
mod term;
mod utils;
mod version;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Parse CLI arguments and execute
    let cli = Cli::parse();
    cli.run().await.map_err(|e| anyhow::anyhow!(e))
}
