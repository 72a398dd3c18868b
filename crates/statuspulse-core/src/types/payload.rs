//! Payload records carried by notification events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Incident severity.
///
/// Variants are declared from least to most severe so that `Ord` can be
/// used for thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Maintenance,
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Wire name of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incident as reported by the status source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Incident identifier. Numeric issue ids are accepted and kept as text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Incident title.
    pub title: String,

    /// Severity.
    pub severity: Severity,

    /// Names of the affected systems.
    #[serde(default)]
    pub affected_entities: Vec<String>,

    /// Link to the incident page.
    pub url: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// One changed field on an updated incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// A monitored system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// System name.
    pub name: String,

    /// Check type tag (e.g. "http", "tcp").
    #[serde(rename = "type")]
    pub kind: String,

    /// Time of the check that produced the event.
    pub last_check: DateTime<Utc>,
}

/// A maintenance window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub affected_entities: Vec<String>,
    pub url: String,
}

/// An SLO breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloBreach {
    /// System whose objective was breached.
    pub entity: String,
    /// Metric name (e.g. "uptime").
    pub metric: String,
    pub target: f64,
    pub actual: f64,
    /// Period label (e.g. "30d").
    pub period: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
