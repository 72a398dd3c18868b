//! statuspulse CLI entry point.

use clap::Parser;
use statuspulse_cli::{logging, run, Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it loads; commands
    // report load errors themselves.
    let logging_config = cli.load_config().map(|c| c.logging).unwrap_or_default();
    logging::init(cli.verbose, &logging_config);

    run(cli).await
}
