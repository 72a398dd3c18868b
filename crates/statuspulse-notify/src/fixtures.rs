//! Shared test fixtures.

use crate::delivery::DeliveryError;
use crate::traits::Transport;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use statuspulse_core::{
    EventPayload, EventType, FieldChange, Incident, Maintenance, NotificationEvent, Severity,
    SloBreach, SystemStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn incident(severity: Severity) -> Incident {
    Incident {
        id: "17".to_string(),
        title: "Elevated [API] error rates".to_string(),
        severity,
        affected_entities: vec!["api".to_string(), "web".to_string()],
        url: "https://github.com/acme/status/issues/17".to_string(),
        body: Some("Requests to /v1 are failing.".to_string()),
    }
}

fn system(name: &str) -> SystemStatus {
    SystemStatus {
        name: name.to_string(),
        kind: "http".to_string(),
        last_check: Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 30).unwrap(),
    }
}

fn maintenance() -> Maintenance {
    Maintenance {
        id: "21".to_string(),
        title: "Database upgrade".to_string(),
        start: Utc.with_ymd_and_hms(2024, 5, 4, 22, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 5, 5, 1, 0, 0).unwrap(),
        affected_entities: vec!["db".to_string()],
        url: "https://github.com/acme/status/issues/21".to_string(),
    }
}

/// One representative event per type.
pub fn sample_event(event_type: EventType) -> NotificationEvent {
    let payload = match event_type {
        EventType::IncidentOpened => EventPayload::IncidentOpened {
            incident: incident(Severity::Critical),
        },
        EventType::IncidentClosed => EventPayload::IncidentClosed {
            incident: incident(Severity::Major),
            duration_ms: Some(90_061_000),
        },
        EventType::IncidentUpdated => EventPayload::IncidentUpdated {
            incident: incident(Severity::Minor),
            changes: vec![FieldChange {
                field: "severity".to_string(),
                from: Some("major".to_string()),
                to: Some("minor".to_string()),
            }],
        },
        EventType::SystemDown => EventPayload::SystemDown {
            system: system("api"),
            status_code: Some(503),
            error: Some("Service Unavailable".to_string()),
        },
        EventType::SystemDegraded => EventPayload::SystemDegraded {
            system: system("api"),
            response_time_ms: Some(4200),
            reason: Some("Slow responses".to_string()),
        },
        EventType::SystemRecovered => EventPayload::SystemRecovered {
            system: system("api"),
            downtime_ms: Some(7_200_000),
        },
        EventType::MaintenanceScheduled => EventPayload::MaintenanceScheduled {
            maintenance: maintenance(),
        },
        EventType::MaintenanceStarted => EventPayload::MaintenanceStarted {
            maintenance: maintenance(),
        },
        EventType::MaintenanceCompleted => EventPayload::MaintenanceCompleted {
            maintenance: maintenance(),
        },
        EventType::SloBreached => EventPayload::SloBreached {
            slo: SloBreach {
                entity: "api".to_string(),
                metric: "uptime".to_string(),
                target: 99.9,
                actual: 99.2,
                period: "30d".to_string(),
            },
        },
    };
    NotificationEvent::at(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(), payload)
}

/// Shared call counter.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Tracks how many deliveries run at the same time.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A transport whose outcomes are scripted.
pub struct ScriptedTransport {
    calls: CallCounter,
    fail_first: usize,
    error: Option<DeliveryError>,
    delay: Duration,
    in_flight: Option<InFlight>,
}

impl ScriptedTransport {
    pub fn succeeding() -> Self {
        Self {
            calls: CallCounter::default(),
            fail_first: 0,
            error: None,
            delay: Duration::ZERO,
            in_flight: None,
        }
    }

    pub fn failing(error: DeliveryError) -> Self {
        Self::failing_then_succeeding(usize::MAX, error)
    }

    pub fn failing_then_succeeding(failures: usize, error: DeliveryError) -> Self {
        Self {
            fail_first: failures,
            error: Some(error),
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration, in_flight: InFlight) -> Self {
        self.delay = delay;
        self.in_flight = Some(in_flight);
        self
    }

    pub fn with_counter(mut self, calls: CallCounter) -> Self {
        self.calls = calls;
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn deliver(&self, _event: &NotificationEvent) -> Result<(), DeliveryError> {
        let call = self.calls.bump();

        if let Some(in_flight) = &self.in_flight {
            let now = in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
            in_flight.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            in_flight.current.fetch_sub(1, Ordering::SeqCst);
        }

        match &self.error {
            Some(error) if call < self.fail_first => Err(error.clone()),
            _ => Ok(()),
        }
    }
}
