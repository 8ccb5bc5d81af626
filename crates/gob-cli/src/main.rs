use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gob_config::ConfigManager;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod logger;

pub const DEFAULT_FILENAMES: [&str; 4] = ["gob.yaml", "gob.yml", "gob.toml", "config/gob.yaml"];

/// Load the given config file, or the first default one that exists.
///
/// Without an explicit file and without any default file present, the
/// configuration is empty.
fn load_config(file: Option<String>) -> Result<ConfigManager> {
    if let Some(file) = file {
        return Ok(ConfigManager::load(PathBuf::from(file))?);
    }

    let path = DEFAULT_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILENAMES[3]));

    Ok(ConfigManager::load_or_empty(path)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = config::Cli::parse();

    match cli.command {
        config::Commands::Run { file, hold, json } => {
            commands::run::run(load_config(file)?, hold, json).await
        }
        config::Commands::Check { file } => commands::check::check(&load_config(file)?),
    }
}
