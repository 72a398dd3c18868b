//! Transport and factory traits.

use crate::delivery::DeliveryError;
use crate::error::ValidationError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use statuspulse_core::NotificationEvent;
use std::time::Duration;

/// Renders an event into a channel's native payload and sends it.
///
/// A transport makes exactly one call per `deliver`. Filtering, rate
/// limiting, retries and statistics are layered around it by
/// [`ChannelProvider`](crate::provider::ChannelProvider).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one event.
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError>;
}

/// Shared resources handed to factories.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Name of the channel being constructed.
    pub channel: String,

    /// Shared HTTP client.
    pub http: reqwest::Client,

    /// Per-request timeout (the channel's `retryConfig.timeoutMs`).
    pub timeout: Duration,
}

impl ProviderContext {
    pub fn new(channel: impl Into<String>, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            channel: channel.into(),
            http,
            timeout,
        }
    }
}

/// Builds transports for one channel type.
///
/// `create` validates the channel's settings and must not perform network
/// I/O.
pub trait ProviderFactory: Send + Sync {
    /// Channel type tag this factory handles.
    fn channel_type(&self) -> &str;

    /// Validate settings and build a transport.
    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError>;
}

/// A factory backed by a closure.
pub(crate) struct FnFactory<F> {
    pub(crate) channel_type: String,
    pub(crate) build: F,
}

impl<F> ProviderFactory for FnFactory<F>
where
    F: Fn(&ProviderContext, &Map<String, Value>) -> Result<Box<dyn Transport>, ValidationError>
        + Send
        + Sync,
{
    fn channel_type(&self) -> &str {
        &self.channel_type
    }

    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError> {
        (self.build)(ctx, settings)
    }
}

/// Deserialize a channel's settings into its typed form.
pub(crate) fn parse_settings<T>(
    provider: &'static str,
    settings: &Map<String, Value>,
) -> Result<T, ValidationError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(Value::Object(settings.clone()))
        .map_err(|e| ValidationError::settings(provider, e))
}
