//! Construction-time errors.

use thiserror::Error;

/// A channel could not be constructed from its configuration.
///
/// Raised once, when the channel is first instantiated. Delivery failures
/// are never reported through this type; see
/// [`DeliveryError`](crate::delivery::DeliveryError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required setting is missing or empty.
    #[error("{provider} {field} is required")]
    Required {
        /// Display name of the channel type, e.g. "Slack".
        provider: &'static str,
        /// Setting name as written in the config file.
        field: String,
    },

    /// A setting is present but malformed.
    #[error("Invalid {provider} {what}")]
    Invalid {
        provider: &'static str,
        what: String,
    },

    /// Settings could not be deserialized.
    #[error("Invalid {provider} settings: {message}")]
    Settings {
        provider: &'static str,
        message: String,
    },

    /// No factory is registered for the channel type tag.
    #[error("Unknown channel type: {0}")]
    UnknownChannelType(String),

    /// No channel with that name is configured.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// An event type name in a policy or filter is not recognised.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

impl ValidationError {
    /// Create a missing-setting error.
    pub fn required(provider: &'static str, field: impl Into<String>) -> Self {
        Self::Required {
            provider,
            field: field.into(),
        }
    }

    /// Create a malformed-setting error.
    pub fn invalid(provider: &'static str, what: impl Into<String>) -> Self {
        Self::Invalid {
            provider,
            what: what.into(),
        }
    }

    /// Create a settings deserialization error.
    pub fn settings(provider: &'static str, message: impl ToString) -> Self {
        Self::Settings {
            provider,
            message: message.to_string(),
        }
    }
}
