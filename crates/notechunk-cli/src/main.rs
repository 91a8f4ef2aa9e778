//! notechunk CLI - structure-aware chunking and incremental sync for markdown notes
//!
//! Each subcommand lives in its own module under [`commands`].

use anyhow::Result;
use clap::Parser;
use notechunk_core::Config;
use tracing::debug;

mod cli;
mod commands;
mod logging;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    execute_command(cli, &config).await
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!(?config, "Loaded configuration");
    Ok(config)
}

async fn execute_command(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Chunk { note, format } => commands::chunk(&note, format, &config.chunking),
        Commands::Diff {
            note,
            baseline,
            format,
        } => commands::diff(&note, &baseline, format, &config.chunking),
        Commands::Sync {
            note,
            store,
            format,
        } => commands::sync(&note, &store, format, config).await,
        Commands::Purge { original_id, store } => {
            commands::purge(&original_id, &store, config).await
        },
        Commands::Config { path } => commands::config(config, path),
    }
}
