mod api;
mod cli;
mod config;
mod feed;
mod gemini;
mod generator;
mod markdown;
mod model;
mod session;
mod storage;

pub const USER_AGENT: &str = concat!("crawler/", env!("CARGO_PKG_VERSION"));

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crawler=info".parse()?),
        )
        .init();

    let cli = cli::Cli::parse();
    debug!(command = ?cli.command, "starting");

    cli::run(cli)
        .await
        .inspect_err(|e| tracing::error!("command failed: {e}"))?;
    Ok(())
}
