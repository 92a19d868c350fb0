// ABOUTME: Entry point for the tally binary.
// ABOUTME: Loads .env and configuration, initializes tracing on stderr, and dispatches the CLI.

mod cli;
mod config;

use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("tally=warn,tally_store=warn")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config = config::TallyConfig::from_env().context("loading configuration")?;
    tracing::debug!(
        "using entry log {} (home {})",
        config.file.display(),
        config.home.display()
    );

    cli::run(cli, &config)
}
