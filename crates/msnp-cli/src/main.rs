use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use msnp_cli::{config, Cli, CommandDispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = config::load_configuration(cli.config.as_deref())
        .context("failed to load configuration")?;

    CommandDispatcher::execute(cli, config).await?;
    Ok(())
}

/// Logs go to stderr; stdout carries command output
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
