//! Dispatch orchestration across configured channels.

use crate::delivery::{ChannelStatistics, DeliveryError, DeliveryResult};
use crate::error::ValidationError;
use crate::filter::{EventFilter, EventPolicy};
use crate::provider::ChannelProvider;
use crate::registry::ProviderRegistry;
use crate::retry::RetryPolicy;
use crate::traits::ProviderContext;
use crate::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use statuspulse_core::config::{ChannelConfig, NotificationsConfig, RateLimitConfig, RetryConfig};
use statuspulse_core::{EventType, NotificationEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type Construction = std::result::Result<Arc<ChannelProvider>, ValidationError>;

/// A configured channel and its lazily constructed provider.
struct ChannelSlot {
    name: String,
    channel_type: String,
    config: ChannelConfig,
    filter: EventFilter,
    retry: RetryConfig,
    rate_limit: RateLimitConfig,
    provider: OnceCell<Construction>,
}

/// Summary of one configured channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub channel_type: String,
    pub enabled: bool,
    /// Event types the channel receives.
    pub events: Vec<EventType>,
}

/// Builder for [`NotificationService`].
pub struct NotificationServiceBuilder {
    config: NotificationsConfig,
    registry: Option<Arc<ProviderRegistry>>,
    http: Option<reqwest::Client>,
}

impl NotificationServiceBuilder {
    pub fn new(config: NotificationsConfig) -> Self {
        Self {
            config,
            registry: None,
            http: None,
        }
    }

    /// Use a custom registry. Defaults to the built-in channel types.
    pub fn registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Resolve event filters and build the service.
    ///
    /// Fails on unknown event type names in the policy or in a channel's
    /// allow/deny lists, and on retry or rate-limit settings that could never
    /// deliver. Channels themselves are constructed on first use.
    pub fn build(self) -> Result<NotificationService> {
        let policy = EventPolicy::with_overrides(&self.config.event_policy)?;

        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .user_agent(concat!("statuspulse/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ValidationError::settings("HTTP client", e))?,
        };

        let mut channels = Vec::with_capacity(self.config.channels.len());
        for (name, config) in &self.config.channels {
            let filter = EventFilter::new(&policy, &config.events).map_err(|e| {
                ValidationError::settings("Channel", format!("'{}': {}", name, e))
            })?;
            let retry = self.config.retry_for(config);
            let rate_limit = self.config.rate_limit_for(config);
            let problems = [retry.problems(), rate_limit.problems()].concat();
            if !problems.is_empty() {
                return Err(ValidationError::settings(
                    "Channel",
                    format!("'{}': {}", name, problems.join("; ")),
                ));
            }

            channels.push(ChannelSlot {
                name: name.clone(),
                channel_type: config.channel_type(name).to_string(),
                config: config.clone(),
                filter,
                retry,
                rate_limit,
                provider: OnceCell::new(),
            });
        }

        Ok(NotificationService {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(ProviderRegistry::with_builtins())),
            http,
            concurrency: self.config.concurrency.max(1),
            channels,
        })
    }
}

/// Delivers events to every configured channel that accepts them.
///
/// Channels are constructed on first use and cached for the service's
/// lifetime, including failed constructions. Configuration is fixed once the
/// service is built.
pub struct NotificationService {
    registry: Arc<ProviderRegistry>,
    http: reqwest::Client,
    concurrency: usize,
    channels: Vec<ChannelSlot>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("concurrency", &self.concurrency)
            .field(
                "channels",
                &self.channels.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    /// Start building a service from configuration.
    pub fn builder(config: NotificationsConfig) -> NotificationServiceBuilder {
        NotificationServiceBuilder::new(config)
    }

    /// Build a service over the built-in channel types.
    pub fn new(config: NotificationsConfig) -> Result<Self> {
        NotificationServiceBuilder::new(config).build()
    }

    /// Deliver `event` to every enabled channel that accepts its type.
    ///
    /// Returns one result per selected channel, in completion order.
    /// Channels that do not accept the event are left out.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Vec<DeliveryResult> {
        let event_type = event.event_type();
        let selected: Vec<&ChannelSlot> = self
            .channels
            .iter()
            .filter(|slot| slot.config.enabled && slot.filter.accepts(event_type))
            .collect();

        if selected.is_empty() {
            debug!("No channel accepts {}", event_type);
            return Vec::new();
        }
        debug!("Dispatching {} to {} channel(s)", event_type, selected.len());

        stream::iter(selected)
            .map(|slot| self.deliver(slot, event))
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Dispatch each event in order; results for one event settle before
    /// the next begins.
    pub async fn dispatch_all(&self, events: &[NotificationEvent]) -> Vec<DeliveryResult> {
        let mut results = Vec::new();
        for event in events {
            results.extend(self.dispatch(event).await);
        }
        results
    }

    /// Construct every enabled channel now and report each outcome.
    pub async fn warm_up(&self) -> Vec<(String, Result<()>)> {
        let mut outcomes = Vec::new();
        for slot in self.channels.iter().filter(|s| s.config.enabled) {
            let outcome = self.provider(slot).await.map(|_| ());
            outcomes.push((slot.name.clone(), outcome));
        }
        outcomes
    }

    /// Send the built-in test event to one channel, bypassing its event
    /// filter.
    pub async fn send_test(&self, channel: &str) -> Result<DeliveryResult> {
        let slot = self
            .channels
            .iter()
            .find(|s| s.name == channel)
            .ok_or_else(|| ValidationError::UnknownChannel(channel.to_string()))?;
        let provider = self.provider(slot).await?;
        Ok(provider
            .send_unfiltered(&NotificationEvent::test_event())
            .await)
    }

    /// Counters of every channel constructed so far.
    pub fn statistics(&self) -> BTreeMap<String, ChannelStatistics> {
        self.channels
            .iter()
            .filter_map(|slot| match slot.provider.get() {
                Some(Ok(provider)) => Some((slot.name.clone(), provider.statistics())),
                _ => None,
            })
            .collect()
    }

    /// Configured channels, in name order.
    pub fn channels(&self) -> Vec<ChannelInfo> {
        self.channels
            .iter()
            .map(|slot| ChannelInfo {
                name: slot.name.clone(),
                channel_type: slot.channel_type.clone(),
                enabled: slot.config.enabled,
                events: slot.filter.accepted().collect(),
            })
            .collect()
    }

    /// The registry channels are built from.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    async fn deliver(&self, slot: &ChannelSlot, event: &NotificationEvent) -> DeliveryResult {
        match self.provider(slot).await {
            Ok(provider) => provider.send(event).await,
            Err(e) => DeliveryResult::failed(
                &slot.name,
                &slot.channel_type,
                event.event_type(),
                0,
                DeliveryError::provider_init(&e),
            ),
        }
    }

    /// The channel's provider, constructing it on first call. Concurrent
    /// callers wait for the same construction.
    async fn provider(&self, slot: &ChannelSlot) -> Construction {
        slot.provider
            .get_or_init(|| async { self.construct(slot) })
            .await
            .clone()
    }

    fn construct(&self, slot: &ChannelSlot) -> Construction {
        let ctx = ProviderContext::new(
            slot.name.clone(),
            self.http.clone(),
            Duration::from_millis(slot.retry.timeout_ms),
        );

        match self
            .registry
            .create(&slot.channel_type, &ctx, &slot.config.settings)
        {
            Ok(transport) => {
                info!("Initialized channel {} ({})", slot.name, slot.channel_type);
                let provider = ChannelProvider::new(&slot.name, &slot.channel_type, transport)
                    .with_filter(slot.filter.clone())
                    .with_retry(RetryPolicy::from_config(&slot.retry))
                    .with_rate_limit(&slot.rate_limit);
                Ok(Arc::new(provider))
            }
            Err(e) => {
                warn!("Channel {} failed to initialize: {}", slot.name, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ErrorCode;
    use crate::fixtures::{sample_event, CallCounter, InFlight, ScriptedTransport};
    use crate::traits::Transport;
    use statuspulse_core::config::EventSelection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn channel(kind: &str) -> ChannelConfig {
        ChannelConfig::new(kind).with_retry(RetryConfig::no_retry())
    }

    fn config(channels: Vec<(&str, ChannelConfig)>) -> NotificationsConfig {
        NotificationsConfig {
            channels: channels
                .into_iter()
                .map(|(name, c)| (name.to_string(), c))
                .collect(),
            ..NotificationsConfig::default()
        }
    }

    fn register_scripted<F>(registry: &mut ProviderRegistry, tag: &str, make: F)
    where
        F: Fn() -> ScriptedTransport + Send + Sync + 'static,
    {
        registry.register(tag, move |_ctx, _settings| {
            Ok(Box::new(make()) as Box<dyn Transport>)
        });
    }

    fn service(registry: ProviderRegistry, config: NotificationsConfig) -> NotificationService {
        NotificationService::builder(config)
            .registry(Arc::new(registry))
            .build()
            .unwrap()
    }

    fn find<'a>(results: &'a [DeliveryResult], channel: &str) -> &'a DeliveryResult {
        results.iter().find(|r| r.channel == channel).unwrap()
    }

    #[tokio::test]
    async fn test_failing_channel_is_isolated() {
        let mut registry = ProviderRegistry::new();
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);
        register_scripted(&mut registry, "broken", || {
            ScriptedTransport::failing(DeliveryError::network("connection reset"))
        });

        let svc = service(
            registry,
            config(vec![
                ("a", channel("ok")),
                ("b", channel("broken")),
                ("c", channel("ok")),
            ]),
        );

        let results = svc.dispatch(&sample_event(EventType::IncidentOpened)).await;
        assert_eq!(results.len(), 3);
        assert!(find(&results, "a").success);
        assert!(find(&results, "c").success);

        let failed = find(&results, "b");
        assert!(!failed.success);
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.error_code(), Some(ErrorCode::NetworkError));
    }

    #[tokio::test]
    async fn test_dispatch_all_tags_each_result() {
        let mut registry = ProviderRegistry::new();
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);
        let svc = service(registry, config(vec![("ops", channel("ok"))]));

        let events = [
            sample_event(EventType::SystemDown),
            sample_event(EventType::SystemRecovered),
        ];
        let results = svc.dispatch_all(&events).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.channel == "ops" && r.success));
        assert_eq!(results[0].event_type, EventType::SystemDown);
        assert_eq!(results[1].event_type, EventType::SystemRecovered);
    }

    #[tokio::test]
    async fn test_disabled_event_type_makes_no_calls() {
        let calls = CallCounter::default();
        let mut registry = ProviderRegistry::new();
        let counter = calls.clone();
        register_scripted(&mut registry, "ok", move || {
            ScriptedTransport::succeeding().with_counter(counter.clone())
        });
        let svc = service(registry, config(vec![("ops", channel("ok"))]));

        let results = svc.dispatch(&sample_event(EventType::IncidentUpdated)).await;
        assert!(results.is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test]
    async fn test_policy_override_and_channel_selection() {
        let mut registry = ProviderRegistry::new();
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);

        let mut cfg = config(vec![
            ("all", channel("ok")),
            ("quiet", {
                let mut c = channel("ok");
                c.events = EventSelection {
                    allow: vec![],
                    deny: vec!["incident.updated".to_string()],
                };
                c
            }),
            ("off", channel("ok").with_enabled(false)),
        ]);
        cfg.event_policy.insert("incident.updated".to_string(), true);
        let svc = service(registry, cfg);

        let results = svc.dispatch(&sample_event(EventType::IncidentUpdated)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel, "all");
    }

    #[tokio::test]
    async fn test_channel_allow_list_receives_policy_disabled_type() {
        let mut registry = ProviderRegistry::new();
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);

        let mut updates = channel("ok");
        updates.events.allow = vec!["incident.updated".to_string()];
        let svc = service(registry, config(vec![("all", channel("ok")), ("updates", updates)]));

        let results = svc.dispatch(&sample_event(EventType::IncidentUpdated)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel, "updates");
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn test_unknown_event_name_rejected_at_build() {
        let mut cfg = config(vec![]);
        cfg.event_policy.insert("incident.reopened".to_string(), true);
        let err = NotificationService::new(cfg).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownEventType("incident.reopened".to_string())
        );
    }

    #[test]
    fn test_undeliverable_settings_rejected_at_build() {
        let empty_bucket = channel("ok").with_rate_limit(RateLimitConfig {
            capacity: 0,
            refill_per_second: 1.0,
        });
        let err = NotificationService::new(config(vec![("ops", empty_bucket)])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Channel settings: 'ops': rateLimit.capacity must be greater than 0"
        );

        let no_time = ChannelConfig::new("ok").with_retry(RetryConfig {
            timeout_ms: 0,
            ..RetryConfig::no_retry()
        });
        let err = NotificationService::new(config(vec![("pager", no_time)])).unwrap_err();
        assert!(err.to_string().contains("'pager': retryConfig.timeoutMs must be greater than 0"));

        let mut cfg = config(vec![("inherits", ChannelConfig::new("ok"))]);
        cfg.defaults.rate_limit.refill_per_second = 0.0;
        let err = NotificationService::new(cfg).unwrap_err();
        assert!(err.to_string().contains("rateLimit.refillPerSecond must be positive"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let in_flight = InFlight::default();
        let mut registry = ProviderRegistry::new();
        let tracker = in_flight.clone();
        register_scripted(&mut registry, "slow", move || {
            ScriptedTransport::succeeding().with_delay(Duration::from_millis(50), tracker.clone())
        });

        let mut cfg = config(
            ["a", "b", "c", "d", "e", "f"]
                .into_iter()
                .map(|n| (n, channel("slow")))
                .collect(),
        );
        cfg.concurrency = 2;
        let svc = service(registry, cfg);

        let results = svc.dispatch(&sample_event(EventType::SystemDown)).await;
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(in_flight.peak(), 2);
    }

    #[tokio::test]
    async fn test_provider_constructed_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = ProviderRegistry::new();
        let counter = built.clone();
        registry.register("ok", move |_ctx, _settings| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedTransport::succeeding()) as Box<dyn Transport>)
        });
        let svc = service(registry, config(vec![("ops", channel("ok"))]));

        let event = sample_event(EventType::SystemDown);
        let (first, second) = tokio::join!(svc.dispatch(&event), svc.dispatch(&event));
        assert_eq!(first.len() + second.len(), 2);
        svc.warm_up().await;
        svc.dispatch(&event).await;

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(svc.statistics()["ops"].successes, 3);
    }

    #[tokio::test]
    async fn test_construction_failure_is_cached_and_reported() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = ProviderRegistry::new();
        let counter = built.clone();
        registry.register("pager", move |_ctx, _settings| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ValidationError::required("Pager", "routingKey"))
        });
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);
        let svc = service(
            registry,
            config(vec![("pager", channel("pager")), ("ops", channel("ok"))]),
        );

        for _ in 0..2 {
            let results = svc.dispatch(&sample_event(EventType::SystemDown)).await;
            assert_eq!(results.len(), 2);
            let failed = find(&results, "pager");
            assert_eq!(failed.error_code(), Some(ErrorCode::ProviderInit));
            assert_eq!(failed.attempts, 0);
            assert!(find(&results, "ops").success);
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(!svc.statistics().contains_key("pager"));
    }

    #[tokio::test]
    async fn test_unknown_channel_type_is_a_failed_result() {
        let svc = service(ProviderRegistry::new(), config(vec![("x", channel("carrier-pigeon"))]));
        let results = svc.dispatch(&sample_event(EventType::SystemDown)).await;

        assert_eq!(results.len(), 1);
        let error = results[0].error.as_ref().unwrap();
        assert_eq!(error.code, ErrorCode::ProviderInit);
        assert!(error.message.contains("Unknown channel type: carrier-pigeon"));
    }

    #[tokio::test]
    async fn test_warm_up_reports_each_channel() {
        let mut registry = ProviderRegistry::new();
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);
        let svc = service(
            registry,
            config(vec![
                ("good", channel("ok")),
                ("bad", channel("missing")),
                ("off", channel("missing").with_enabled(false)),
            ]),
        );

        let outcomes: BTreeMap<_, _> = svc.warm_up().await.into_iter().collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes["good"].is_ok());
        assert_eq!(
            outcomes["bad"].clone().unwrap_err().to_string(),
            "Unknown channel type: missing"
        );
    }

    #[tokio::test]
    async fn test_send_test_bypasses_filter() {
        let mut registry = ProviderRegistry::new();
        register_scripted(&mut registry, "ok", ScriptedTransport::succeeding);
        let mut only_incidents = channel("ok");
        only_incidents.events.allow = vec!["incident.opened".to_string()];
        let svc = service(registry, config(vec![("ops", only_incidents)]));

        let result = svc.send_test("ops").await.unwrap();
        assert!(result.success);
        assert_eq!(result.event_type, EventType::SystemRecovered);

        let err = svc.send_test("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown channel: nope");
    }

    #[test]
    fn test_channel_listing() {
        let svc = service(
            ProviderRegistry::with_builtins(),
            config(vec![(
                "alerts",
                ChannelConfig::new("slack").with_enabled(false),
            )]),
        );

        let channels = svc.channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "alerts");
        assert_eq!(channels[0].channel_type, "slack");
        assert!(!channels[0].enabled);
        assert!(!channels[0].events.contains(&EventType::IncidentUpdated));
    }
}
