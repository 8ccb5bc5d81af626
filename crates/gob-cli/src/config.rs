use clap::{Parser, Subcommand};

/// CLI for gob
#[derive(Parser, Debug)]
#[command(name = "gob", version, about = "Homelab service supervisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start every configured service, report health, and stop them on exit
    Run {
        /// File path to the configuration file (YAML or TOML)
        #[arg(short, long, env = "GOB_CONFIG")]
        file: Option<String>,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        hold: Option<u64>,

        /// Print health reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and list the configured services
    Check {
        /// File path to the configuration file (YAML or TOML)
        #[arg(short, long, env = "GOB_CONFIG")]
        file: Option<String>,
    },
}
