//! Notification events.

use super::{FieldChange, Incident, Maintenance, Severity, SloBreach, SystemStatus};
use crate::error::ParseEventTypeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminator of a [`NotificationEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "incident.opened")]
    IncidentOpened,
    #[serde(rename = "incident.closed")]
    IncidentClosed,
    #[serde(rename = "incident.updated")]
    IncidentUpdated,
    #[serde(rename = "system.down")]
    SystemDown,
    #[serde(rename = "system.degraded")]
    SystemDegraded,
    #[serde(rename = "system.recovered")]
    SystemRecovered,
    #[serde(rename = "maintenance.scheduled")]
    MaintenanceScheduled,
    #[serde(rename = "maintenance.started")]
    MaintenanceStarted,
    #[serde(rename = "maintenance.completed")]
    MaintenanceCompleted,
    #[serde(rename = "slo.breached")]
    SloBreached,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 10] = [
        Self::IncidentOpened,
        Self::IncidentClosed,
        Self::IncidentUpdated,
        Self::SystemDown,
        Self::SystemDegraded,
        Self::SystemRecovered,
        Self::MaintenanceScheduled,
        Self::MaintenanceStarted,
        Self::MaintenanceCompleted,
        Self::SloBreached,
    ];

    /// Wire tag, e.g. `incident.opened`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncidentOpened => "incident.opened",
            Self::IncidentClosed => "incident.closed",
            Self::IncidentUpdated => "incident.updated",
            Self::SystemDown => "system.down",
            Self::SystemDegraded => "system.degraded",
            Self::SystemRecovered => "system.recovered",
            Self::MaintenanceScheduled => "maintenance.scheduled",
            Self::MaintenanceStarted => "maintenance.started",
            Self::MaintenanceCompleted => "maintenance.completed",
            Self::SloBreached => "slo.breached",
        }
    }

    /// Human readable label used in message headings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::IncidentOpened => "Incident opened",
            Self::IncidentClosed => "Incident resolved",
            Self::IncidentUpdated => "Incident updated",
            Self::SystemDown => "System down",
            Self::SystemDegraded => "System degraded",
            Self::SystemRecovered => "System recovered",
            Self::MaintenanceScheduled => "Maintenance scheduled",
            Self::MaintenanceStarted => "Maintenance started",
            Self::MaintenanceCompleted => "Maintenance completed",
            Self::SloBreached => "SLO breached",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ParseEventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEventTypeError(s.to_string()))
    }
}

/// A status event to be delivered to notification channels.
///
/// Serialized as a flat object with a `type` discriminator and an ISO-8601
/// `timestamp` next to the variant's own fields:
///
/// ```json
/// {"type": "system.down", "timestamp": "2024-05-01T10:00:00Z",
///  "system": {"name": "api", "type": "http", "lastCheck": "2024-05-01T10:00:00Z"},
///  "statusCode": 503}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// Variant payload, including the `type` tag.
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Variant-specific content of a [`NotificationEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "incident.opened")]
    IncidentOpened { incident: Incident },

    #[serde(rename = "incident.closed")]
    IncidentClosed {
        incident: Incident,
        #[serde(
            rename = "durationMs",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        duration_ms: Option<u64>,
    },

    #[serde(rename = "incident.updated")]
    IncidentUpdated {
        incident: Incident,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        changes: Vec<FieldChange>,
    },

    #[serde(rename = "system.down")]
    SystemDown {
        system: SystemStatus,
        #[serde(
            rename = "statusCode",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        status_code: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "system.degraded")]
    SystemDegraded {
        system: SystemStatus,
        #[serde(
            rename = "responseTimeMs",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        response_time_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "system.recovered")]
    SystemRecovered {
        system: SystemStatus,
        #[serde(
            rename = "downtimeMs",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        downtime_ms: Option<u64>,
    },

    #[serde(rename = "maintenance.scheduled")]
    MaintenanceScheduled { maintenance: Maintenance },

    #[serde(rename = "maintenance.started")]
    MaintenanceStarted { maintenance: Maintenance },

    #[serde(rename = "maintenance.completed")]
    MaintenanceCompleted { maintenance: Maintenance },

    #[serde(rename = "slo.breached")]
    SloBreached { slo: SloBreach },
}

impl NotificationEvent {
    /// Create an event stamped with the current time.
    pub fn new(payload: EventPayload) -> Self {
        Self::at(Utc::now(), payload)
    }

    /// Create an event with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }

    /// A harmless `system.recovered` event used to check that a channel is
    /// wired up correctly.
    pub fn test_event() -> Self {
        let now = Utc::now();
        Self::at(
            now,
            EventPayload::SystemRecovered {
                system: SystemStatus {
                    name: "statuspulse".to_string(),
                    kind: "test".to_string(),
                    last_check: now,
                },
                downtime_ms: None,
            },
        )
    }

    /// The event's discriminator.
    pub fn event_type(&self) -> EventType {
        match &self.payload {
            EventPayload::IncidentOpened { .. } => EventType::IncidentOpened,
            EventPayload::IncidentClosed { .. } => EventType::IncidentClosed,
            EventPayload::IncidentUpdated { .. } => EventType::IncidentUpdated,
            EventPayload::SystemDown { .. } => EventType::SystemDown,
            EventPayload::SystemDegraded { .. } => EventType::SystemDegraded,
            EventPayload::SystemRecovered { .. } => EventType::SystemRecovered,
            EventPayload::MaintenanceScheduled { .. } => EventType::MaintenanceScheduled,
            EventPayload::MaintenanceStarted { .. } => EventType::MaintenanceStarted,
            EventPayload::MaintenanceCompleted { .. } => EventType::MaintenanceCompleted,
            EventPayload::SloBreached { .. } => EventType::SloBreached,
        }
    }

    /// The incident carried by `incident.*` events.
    pub fn incident(&self) -> Option<&Incident> {
        match &self.payload {
            EventPayload::IncidentOpened { incident }
            | EventPayload::IncidentClosed { incident, .. }
            | EventPayload::IncidentUpdated { incident, .. } => Some(incident),
            _ => None,
        }
    }

    /// Severity of the event.
    ///
    /// Incidents carry their own; system and SLO events map onto the
    /// incident scale and maintenance events are always `Maintenance`.
    pub fn severity(&self) -> Severity {
        match &self.payload {
            EventPayload::IncidentOpened { incident }
            | EventPayload::IncidentClosed { incident, .. }
            | EventPayload::IncidentUpdated { incident, .. } => incident.severity,
            EventPayload::SystemDown { .. } => Severity::Critical,
            EventPayload::SystemDegraded { .. } | EventPayload::SloBreached { .. } => {
                Severity::Major
            }
            EventPayload::SystemRecovered { .. } => Severity::Minor,
            EventPayload::MaintenanceScheduled { .. }
            | EventPayload::MaintenanceStarted { .. }
            | EventPayload::MaintenanceCompleted { .. } => Severity::Maintenance,
        }
    }

    /// Names of the systems this event concerns.
    pub fn affected_entities(&self) -> Vec<&str> {
        match &self.payload {
            EventPayload::IncidentOpened { incident }
            | EventPayload::IncidentClosed { incident, .. }
            | EventPayload::IncidentUpdated { incident, .. } => {
                incident.affected_entities.iter().map(String::as_str).collect()
            }
            EventPayload::SystemDown { system, .. }
            | EventPayload::SystemDegraded { system, .. }
            | EventPayload::SystemRecovered { system, .. } => vec![system.name.as_str()],
            EventPayload::MaintenanceScheduled { maintenance }
            | EventPayload::MaintenanceStarted { maintenance }
            | EventPayload::MaintenanceCompleted { maintenance } => maintenance
                .affected_entities
                .iter()
                .map(String::as_str)
                .collect(),
            EventPayload::SloBreached { slo } => vec![slo.entity.as_str()],
        }
    }

    /// Link to the incident or maintenance page, when there is one.
    pub fn url(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::IncidentOpened { incident }
            | EventPayload::IncidentClosed { incident, .. }
            | EventPayload::IncidentUpdated { incident, .. } => Some(&incident.url),
            EventPayload::MaintenanceScheduled { maintenance }
            | EventPayload::MaintenanceStarted { maintenance }
            | EventPayload::MaintenanceCompleted { maintenance } => Some(&maintenance.url),
            _ => None,
        }
    }
}
