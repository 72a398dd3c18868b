//! Configuration commands.

use crate::Cli;
use clap::Args;
use statuspulse_core::paths;
use std::process::ExitCode;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show configuration with credentials masked
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Run the config command.
pub fn run(cli: &Cli, args: &ConfigArgs) -> anyhow::Result<ExitCode> {
    match args.command {
        ConfigCommand::Show => {
            let config = cli.load_config()?;
            println!("{}", config.to_redacted_json()?);
        }

        ConfigCommand::Path => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => paths::config_file()?,
            };
            println!("{}", path.display());
        }

        ConfigCommand::Validate => {
            let config = match cli.load_config() {
                Ok(config) => config,
                Err(e) => anyhow::bail!("Failed to load config: {}", e),
            };
            match config.validate() {
                Ok(()) => println!(
                    "Configuration is valid ({} channel(s))",
                    config.notifications.channels.len()
                ),
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
