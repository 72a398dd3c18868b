//! statuspulse command-line interface.

pub mod commands;
pub mod logging;
pub mod output;

use clap::{Parser, Subcommand};
use statuspulse_core::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// statuspulse - deliver status events to notification channels
#[derive(Parser)]
#[command(name = "statuspulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "STATUSPULSE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch events read from a JSON file
    Send(commands::send::SendArgs),

    /// Inspect and test channels
    Channels(commands::channels::ChannelsArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

impl Cli {
    /// Load the configuration file named by `--config`, or the default one.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let config = match &self.config {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Config::load(path)?
            }
            None => Config::load_default()?,
        };
        Ok(config)
    }

    /// Load and validate the configuration.
    pub fn load_valid_config(&self) -> anyhow::Result<Config> {
        let config = self.load_config()?;
        config.validate()?;
        Ok(config)
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Send(args) => commands::send::run(&cli, args).await,
        Commands::Channels(args) => commands::channels::run(&cli, args).await,
        Commands::Config(args) => commands::config::run(&cli, args),
        Commands::Version => {
            println!("statuspulse {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}
