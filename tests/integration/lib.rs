//! Shared helpers for the integration tests.

use serde_json::Value;
use statuspulse_core::{Config, NotificationEvent};
use std::collections::HashMap;

/// Parse a config string, resolving `env:NAME` from `vars` only.
pub fn config_with(content: &str, vars: &[(&str, String)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Config::parse_with(content, |name| vars.get(name).cloned()).expect("config should parse")
}

/// Deserialize an event from its wire form.
pub fn event(value: Value) -> NotificationEvent {
    serde_json::from_value(value).expect("event should deserialize")
}

/// A critical `incident.opened` event.
pub fn critical_incident() -> NotificationEvent {
    event(serde_json::json!({
        "type": "incident.opened",
        "timestamp": "2024-05-01T10:00:00Z",
        "incident": {
            "id": 42,
            "title": "Checkout [EU] failing",
            "severity": "critical",
            "affectedEntities": ["api", "web"],
            "url": "https://github.com/acme/status/issues/42",
            "body": "Payments time out."
        }
    }))
}

/// A `system.recovered` event.
pub fn system_recovered() -> NotificationEvent {
    event(serde_json::json!({
        "type": "system.recovered",
        "timestamp": "2024-05-01T12:00:00Z",
        "system": { "name": "api", "type": "http", "lastCheck": "2024-05-01T12:00:00Z" },
        "downtimeMs": 7200000
    }))
}
