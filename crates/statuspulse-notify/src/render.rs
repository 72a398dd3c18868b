//! Channel-neutral rendering of events.
//!
//! [`render`] turns any event into a [`Message`]: a heading, a title, an
//! optional body and a list of labelled fields. Providers lay the message
//! out in their own markup.

use chrono::{DateTime, Utc};
use statuspulse_core::{EventPayload, EventType, NotificationEvent, Severity};

/// A labelled value shown under the message title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub value: String,
}

impl Field {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Rendered content of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub event_type: EventType,
    pub severity: Severity,
    /// Event label, e.g. "Incident opened".
    pub heading: String,
    /// Subject line.
    pub title: String,
    pub body: Option<String>,
    pub fields: Vec<Field>,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Heading prefixed with the event's emoji.
    pub fn decorated_heading(&self) -> String {
        format!("{} {}", emoji(self.event_type, self.severity), self.heading)
    }

    /// One-line summary, used where a channel needs fallback text.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.heading, self.title)
    }

    /// Multi-line plain-text rendering.
    pub fn plain_text(&self) -> String {
        let mut lines = vec![self.summary()];
        if let Some(body) = &self.body {
            lines.push(String::new());
            lines.push(body.clone());
        }
        if !self.fields.is_empty() {
            lines.push(String::new());
            lines.extend(self.fields.iter().map(|f| format!("{}: {}", f.name, f.value)));
        }
        if let Some(url) = &self.url {
            lines.push(String::new());
            lines.push(url.clone());
        }
        lines.join("\n")
    }
}

/// Render an event.
pub fn render(event: &NotificationEvent) -> Message {
    let event_type = event.event_type();
    let mut fields = Vec::new();

    let (title, body) = match &event.payload {
        EventPayload::IncidentOpened { incident } => {
            fields.push(Field::new("Severity", incident.severity.as_str()));
            push_affected(&mut fields, &incident.affected_entities);
            (incident.title.clone(), incident.body.clone())
        }
        EventPayload::IncidentClosed {
            incident,
            duration_ms,
        } => {
            fields.push(Field::new("Severity", incident.severity.as_str()));
            push_affected(&mut fields, &incident.affected_entities);
            if let Some(ms) = duration_ms {
                fields.push(Field::new("Duration", format_duration(*ms)));
            }
            (incident.title.clone(), None)
        }
        EventPayload::IncidentUpdated { incident, changes } => {
            fields.push(Field::new("Severity", incident.severity.as_str()));
            push_affected(&mut fields, &incident.affected_entities);
            let body = if changes.is_empty() {
                incident.body.clone()
            } else {
                let lines: Vec<String> = changes
                    .iter()
                    .map(|c| {
                        format!(
                            "{}: {} → {}",
                            c.field,
                            c.from.as_deref().unwrap_or("none"),
                            c.to.as_deref().unwrap_or("none")
                        )
                    })
                    .collect();
                Some(lines.join("\n"))
            };
            (incident.title.clone(), body)
        }
        EventPayload::SystemDown {
            system,
            status_code,
            error,
        } => {
            fields.push(Field::new("Check", system.kind.as_str()));
            if let Some(code) = status_code {
                fields.push(Field::new("Status code", code.to_string()));
            }
            fields.push(Field::new("Last check", format_time(&system.last_check)));
            (format!("{} is down", system.name), error.clone())
        }
        EventPayload::SystemDegraded {
            system,
            response_time_ms,
            reason,
        } => {
            fields.push(Field::new("Check", system.kind.as_str()));
            if let Some(ms) = response_time_ms {
                fields.push(Field::new("Response time", format!("{}ms", ms)));
            }
            fields.push(Field::new("Last check", format_time(&system.last_check)));
            (format!("{} is degraded", system.name), reason.clone())
        }
        EventPayload::SystemRecovered {
            system,
            downtime_ms,
        } => {
            fields.push(Field::new("Check", system.kind.as_str()));
            if let Some(ms) = downtime_ms {
                fields.push(Field::new("Downtime", format_duration(*ms)));
            }
            (format!("{} has recovered", system.name), None)
        }
        EventPayload::MaintenanceScheduled { maintenance }
        | EventPayload::MaintenanceStarted { maintenance }
        | EventPayload::MaintenanceCompleted { maintenance } => {
            fields.push(Field::new("Start", format_time(&maintenance.start)));
            fields.push(Field::new("End", format_time(&maintenance.end)));
            push_affected(&mut fields, &maintenance.affected_entities);
            (maintenance.title.clone(), None)
        }
        EventPayload::SloBreached { slo } => {
            fields.push(Field::new("Target", format_number(slo.target)));
            fields.push(Field::new("Actual", format_number(slo.actual)));
            fields.push(Field::new("Period", slo.period.as_str()));
            (
                format!("{} breached its {} objective", slo.entity, slo.metric),
                None,
            )
        }
    };

    Message {
        event_type,
        severity: event.severity(),
        heading: event_type.label().to_string(),
        title,
        body,
        fields,
        url: event.url().map(str::to_string),
        timestamp: event.timestamp,
    }
}

fn push_affected(fields: &mut Vec<Field>, entities: &[String]) {
    if !entities.is_empty() {
        fields.push(Field::new("Affected", entities.join(", ")));
    }
}

/// Format a millisecond duration using its two largest non-zero units.
///
/// `7_200_000` renders as `2h`, `90_061_000` as `1d 1h`. Durations below
/// one second render in milliseconds.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return format!("{}ms", ms);
    }

    let secs = ms / 1000;
    let units = [
        (secs / 86_400, "d"),
        ((secs % 86_400) / 3600, "h"),
        ((secs % 3600) / 60, "m"),
        (secs % 60, "s"),
    ];

    units
        .iter()
        .filter(|(n, _)| *n > 0)
        .take(2)
        .map(|(n, unit)| format!("{}{}", n, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a timestamp for humans.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').to_string()
    }
}

/// Emoji shown before the heading.
pub fn emoji(event_type: EventType, severity: Severity) -> &'static str {
    match event_type {
        EventType::IncidentOpened | EventType::IncidentUpdated => match severity {
            Severity::Critical => "🔴",
            Severity::Major => "🟠",
            Severity::Minor => "🟡",
            Severity::Maintenance => "🔧",
        },
        EventType::IncidentClosed | EventType::SystemRecovered => "✅",
        EventType::SystemDown => "🔴",
        EventType::SystemDegraded => "🟡",
        EventType::MaintenanceScheduled => "🗓️",
        EventType::MaintenanceStarted => "🔧",
        EventType::MaintenanceCompleted => "✅",
        EventType::SloBreached => "📉",
    }
}

/// RGB colour for a severity, used by Discord embeds and Slack attachments.
pub fn color(event_type: EventType, severity: Severity) -> u32 {
    match event_type {
        EventType::IncidentClosed
        | EventType::SystemRecovered
        | EventType::MaintenanceCompleted => 0x2E_B8_86,
        _ => match severity {
            Severity::Critical => 0xE0_1E_5A,
            Severity::Major => 0xF2_8C_28,
            Severity::Minor => 0xEC_B2_2E,
            Severity::Maintenance => 0x36_C5_F0,
        },
    }
}
