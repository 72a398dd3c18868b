//! Terminal rendering of delivery results.

use console::style;
use statuspulse_notify::{ChannelInfo, ChannelStatistics, DeliveryResult, DispatchSummary};
use std::collections::BTreeMap;

/// One table row for a delivery result, without styling.
pub fn result_row(result: &DeliveryResult) -> String {
    let status = if result.success {
        "delivered".to_string()
    } else if result.skipped {
        "skipped".to_string()
    } else {
        match &result.error {
            Some(e) => format!("failed ({})", e.code),
            None => "failed".to_string(),
        }
    };
    format!(
        "{:<16} {:<10} {:<24} {:<28} {}",
        result.channel, result.provider, result.event_type.as_str(), status, result.attempts
    )
}

/// Print delivery results as a table.
pub fn print_results(results: &[DeliveryResult]) {
    println!(
        "  {}",
        style(format!(
            "{:<16} {:<10} {:<24} {:<28} {}",
            "CHANNEL", "TYPE", "EVENT", "STATUS", "ATTEMPTS"
        ))
        .bold()
    );
    for result in results {
        let row = result_row(result);
        if result.success {
            println!("  {}", row);
        } else {
            println!("  {}", style(row).red());
        }
        if let Some(error) = &result.error {
            println!("    {}", style(&error.message).dim());
        }
    }
}

/// Print the one-line dispatch summary.
pub fn print_summary(summary: &DispatchSummary) {
    let line = format!(
        "{} delivered, {} failed ({} total)",
        summary.delivered, summary.failed, summary.total
    );
    if summary.all_delivered() {
        println!("\n{} {}", style("✓").green(), line);
    } else {
        println!("\n{} {}", style("✗").red(), line);
    }
}

/// Print per-channel counters.
pub fn print_statistics(stats: &BTreeMap<String, ChannelStatistics>) {
    if stats.is_empty() {
        return;
    }
    println!("\nChannel statistics:\n");
    for (name, s) in stats {
        println!(
            "  {:<16} attempts {:<4} successes {:<4} failures {:<4} rate-limited {}",
            name, s.attempts, s.successes, s.failures, s.rate_limited
        );
    }
}

/// Print the configured channels.
pub fn print_channels(channels: &[ChannelInfo]) {
    if channels.is_empty() {
        println!("No channels configured.");
        return;
    }
    println!("  {}", style(format!("{:<16} {:<10} {:<9} EVENTS", "CHANNEL", "TYPE", "STATUS")).bold());
    for channel in channels {
        let status = if channel.enabled { "enabled" } else { "disabled" };
        let events: Vec<&str> = channel.events.iter().map(|e| e.as_str()).collect();
        println!(
            "  {:<16} {:<10} {:<9} {}",
            channel.name,
            channel.channel_type,
            status,
            events.join(", ")
        );
    }
}
