//! Channel inspection commands.

use crate::{output, Cli};
use clap::Args;
use console::style;
use serde_json::json;
use statuspulse_notify::NotificationService;
use std::process::ExitCode;

/// Channels command arguments.
#[derive(Args)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub command: ChannelsCommand,
}

#[derive(clap::Subcommand)]
pub enum ChannelsCommand {
    /// List configured channels
    List,

    /// Construct every enabled channel and report configuration errors
    Check,

    /// Send a test event to one channel
    Test {
        /// Channel name
        name: String,
    },
}

/// Run the channels command.
pub async fn run(cli: &Cli, args: &ChannelsArgs) -> anyhow::Result<ExitCode> {
    let config = cli.load_valid_config()?;
    let service = NotificationService::new(config.notifications)?;

    match &args.command {
        ChannelsCommand::List => {
            let channels = service.channels();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&channels)?);
            } else {
                output::print_channels(&channels);
            }
            Ok(ExitCode::SUCCESS)
        }

        ChannelsCommand::Check => {
            let outcomes = service.warm_up().await;
            let failed = outcomes.iter().filter(|(_, o)| o.is_err()).count();

            if cli.json {
                let report: Vec<_> = outcomes
                    .iter()
                    .map(|(name, outcome)| {
                        json!({
                            "channel": name,
                            "ok": outcome.is_ok(),
                            "error": outcome.as_ref().err().map(|e| e.to_string()),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for (name, outcome) in &outcomes {
                    match outcome {
                        Ok(()) => println!("  {} {}", style("✓").green(), name),
                        Err(e) => println!("  {} {}: {}", style("✗").red(), name, e),
                    }
                }
            }

            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        ChannelsCommand::Test { name } => {
            let result = service.send_test(name).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_results(std::slice::from_ref(&result));
            }
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
