//! Event-type policy and per-channel filters.

use crate::error::ValidationError;
use statuspulse_core::config::EventSelection;
use statuspulse_core::EventType;
use std::collections::{BTreeMap, BTreeSet};

/// Service-wide table deciding which event types are delivered at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPolicy {
    enabled: BTreeMap<EventType, bool>,
}

impl Default for EventPolicy {
    /// Every event type is enabled except `incident.updated`, which tends to
    /// be noisy.
    fn default() -> Self {
        let enabled = EventType::ALL
            .into_iter()
            .map(|t| {
                let on = match t {
                    EventType::IncidentUpdated => false,
                    EventType::IncidentOpened
                    | EventType::IncidentClosed
                    | EventType::SystemDown
                    | EventType::SystemDegraded
                    | EventType::SystemRecovered
                    | EventType::MaintenanceScheduled
                    | EventType::MaintenanceStarted
                    | EventType::MaintenanceCompleted
                    | EventType::SloBreached => true,
                };
                (t, on)
            })
            .collect();
        Self { enabled }
    }
}

impl EventPolicy {
    /// The default table with the given overrides applied.
    pub fn with_overrides(overrides: &BTreeMap<String, bool>) -> Result<Self, ValidationError> {
        let mut policy = Self::default();
        for (name, &on) in overrides {
            policy.set(parse_event_type(name)?, on);
        }
        Ok(policy)
    }

    /// Enable or disable one event type.
    pub fn set(&mut self, event_type: EventType, enabled: bool) {
        self.enabled.insert(event_type, enabled);
    }

    /// Whether the table enables `event_type`.
    pub fn is_enabled(&self, event_type: EventType) -> bool {
        self.enabled.get(&event_type).copied().unwrap_or(false)
    }
}

/// The set of event types one channel accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    accepted: BTreeSet<EventType>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(&EventPolicy::default(), &EventSelection::default())
            .unwrap_or_else(|_| Self::allow_all())
    }
}

impl EventFilter {
    /// Resolve a channel's accepted types.
    ///
    /// `deny` always wins. A non-empty `allow` list is the channel's explicit
    /// policy and replaces `policy` entirely; otherwise `policy` decides.
    pub fn new(policy: &EventPolicy, selection: &EventSelection) -> Result<Self, ValidationError> {
        let allow = parse_all(&selection.allow)?;
        let deny = parse_all(&selection.deny)?;

        let accepted = EventType::ALL
            .into_iter()
            .filter(|t| !deny.contains(t))
            .filter(|t| {
                if allow.is_empty() {
                    policy.is_enabled(*t)
                } else {
                    allow.contains(t)
                }
            })
            .collect();

        Ok(Self { accepted })
    }

    /// A filter accepting every event type.
    pub fn allow_all() -> Self {
        Self {
            accepted: EventType::ALL.into_iter().collect(),
        }
    }

    /// Whether the channel accepts `event_type`.
    pub fn accepts(&self, event_type: EventType) -> bool {
        self.accepted.contains(&event_type)
    }

    /// Accepted event types, in declaration order.
    pub fn accepted(&self) -> impl Iterator<Item = EventType> + '_ {
        self.accepted.iter().copied()
    }
}

fn parse_event_type(name: &str) -> Result<EventType, ValidationError> {
    name.parse()
        .map_err(|_| ValidationError::UnknownEventType(name.to_string()))
}

fn parse_all(names: &[String]) -> Result<BTreeSet<EventType>, ValidationError> {
    names.iter().map(|n| parse_event_type(n)).collect()
}
