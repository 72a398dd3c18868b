//! Registry mapping channel type tags to provider factories.

use crate::error::ValidationError;
use crate::traits::{FnFactory, ProviderContext, ProviderFactory, Transport};
use crate::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Channel type tag to factory map.
///
/// Populated once at startup and then shared read-only with every
/// [`NotificationService`](crate::NotificationService) built from it.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in channel type.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "slack")]
        registry.register_factory(Arc::new(crate::providers::SlackFactory));
        #[cfg(feature = "discord")]
        registry.register_factory(Arc::new(crate::providers::DiscordFactory));
        #[cfg(feature = "telegram")]
        registry.register_factory(Arc::new(crate::providers::TelegramFactory));
        #[cfg(feature = "webhook")]
        registry.register_factory(Arc::new(crate::providers::WebhookFactory));
        #[cfg(feature = "email")]
        registry.register_factory(Arc::new(crate::providers::EmailFactory));

        registry
    }

    /// Register a factory under its own channel type. Replaces any
    /// factory already registered for that type.
    pub fn register_factory(&mut self, factory: Arc<dyn ProviderFactory>) {
        let channel_type = factory.channel_type().to_string();
        info!("Registering provider for channel type: {}", channel_type);
        self.factories.insert(channel_type, factory);
    }

    /// Register a custom channel type backed by a constructor function.
    pub fn register<F>(&mut self, channel_type: impl Into<String>, build: F)
    where
        F: Fn(&ProviderContext, &Map<String, Value>) -> Result<Box<dyn Transport>>
            + Send
            + Sync
            + 'static,
    {
        self.register_factory(Arc::new(FnFactory {
            channel_type: channel_type.into(),
            build,
        }));
    }

    /// Whether a channel type is registered.
    pub fn contains(&self, channel_type: &str) -> bool {
        self.factories.contains_key(channel_type)
    }

    /// Registered channel types, sorted.
    pub fn channel_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Construct a transport for `channel_type`.
    pub fn create(
        &self,
        channel_type: &str,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>> {
        let factory = self
            .factories
            .get(channel_type)
            .ok_or_else(|| ValidationError::UnknownChannelType(channel_type.to_string()))?;
        factory.create(ctx, settings)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("channel_types", &self.channel_types())
            .finish()
    }
}
