//! `statuspulse send`: dispatch events from a JSON file or stdin.

use crate::{output, Cli};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use statuspulse_core::NotificationEvent;
use statuspulse_notify::{ChannelStatistics, DeliveryResult, DispatchSummary, NotificationService};
use std::collections::BTreeMap;
use std::io::Read;
use std::process::ExitCode;
use tracing::info;

/// Send command arguments.
#[derive(Args)]
pub struct SendArgs {
    /// JSON file holding one event or an array of events (`-` for stdin)
    pub input: String,
}

/// Machine-readable output of `send --json`.
#[derive(Serialize)]
struct SendReport<'a> {
    results: &'a [DeliveryResult],
    summary: &'a DispatchSummary,
    statistics: BTreeMap<String, ChannelStatistics>,
}

/// Parse one event or an array of events.
pub fn parse_events(text: &str) -> anyhow::Result<Vec<NotificationEvent>> {
    let value: Value = serde_json::from_str(text).context("Input is not valid JSON")?;
    let events = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item).with_context(|| format!("Invalid event at index {}", i))
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
        other => vec![serde_json::from_value(other).context("Invalid event")?],
    };
    Ok(events)
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read events from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}

/// Run the send command.
pub async fn run(cli: &Cli, args: &SendArgs) -> anyhow::Result<ExitCode> {
    let config = cli.load_valid_config()?;
    let events = parse_events(&read_input(&args.input)?)?;
    let service = NotificationService::new(config.notifications)?;
    info!("Dispatching {} event(s)", events.len());

    let results = service.dispatch_all(&events).await;
    let summary = DispatchSummary::from_results(&results);

    if cli.json {
        let report = SendReport {
            results: &results,
            summary: &summary,
            statistics: service.statistics(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if results.is_empty() {
        println!("No channel accepted {} event(s).", events.len());
    } else {
        output::print_results(&results);
        output::print_summary(&summary);
        output::print_statistics(&service.statistics());
    }

    Ok(if summary.all_delivered() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
