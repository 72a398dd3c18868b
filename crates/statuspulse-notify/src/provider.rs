//! A channel: filter, rate limit and retry composed around a transport.

use crate::delivery::{ChannelStatistics, DeliveryError, DeliveryResult};
use crate::filter::EventFilter;
use crate::rate_limit::TokenBucket;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::traits::Transport;
use chrono::Utc;
use parking_lot::Mutex;
use statuspulse_core::config::RateLimitConfig;
use statuspulse_core::NotificationEvent;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, error, warn};

/// One configured notification channel.
///
/// `send` runs the pipeline: event filter, then the retry loop, where each
/// attempt first passes the token bucket and then calls the transport.
/// Statistics are updated once the loop has finished.
pub struct ChannelProvider {
    name: String,
    channel_type: String,
    transport: Box<dyn Transport>,
    filter: EventFilter,
    retry: RetryPolicy,
    limiter: Mutex<TokenBucket>,
    stats: Mutex<ChannelStatistics>,
}

impl std::fmt::Debug for ChannelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProvider")
            .field("name", &self.name)
            .field("channel_type", &self.channel_type)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ChannelProvider {
    /// Create a provider with default filter, retry and rate limit.
    pub fn new(
        name: impl Into<String>,
        channel_type: impl Into<String>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            channel_type: channel_type.into(),
            transport,
            filter: EventFilter::default(),
            retry: RetryPolicy::default(),
            limiter: Mutex::new(TokenBucket::from_config(&RateLimitConfig::default())),
            stats: Mutex::new(ChannelStatistics::default()),
        }
    }

    /// Set the event filter.
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the rate limit.
    pub fn with_rate_limit(mut self, rate_limit: &RateLimitConfig) -> Self {
        self.limiter = Mutex::new(TokenBucket::from_config(rate_limit));
        self
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel type tag.
    pub fn channel_type(&self) -> &str {
        &self.channel_type
    }

    /// The channel's event filter.
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Snapshot of the channel's counters.
    pub fn statistics(&self) -> ChannelStatistics {
        self.stats.lock().clone()
    }

    /// Deliver `event` if the channel's filter accepts it.
    ///
    /// A filtered-out event returns a skipped result without touching the
    /// transport or the statistics.
    pub async fn send(&self, event: &NotificationEvent) -> DeliveryResult {
        let event_type = event.event_type();
        if !self.filter.accepts(event_type) {
            debug!("Channel {} skips {}", self.name, event_type);
            return DeliveryResult::skipped(&self.name, &self.channel_type, event_type);
        }
        self.send_unfiltered(event).await
    }

    /// Deliver `event` regardless of the channel's filter.
    pub async fn send_unfiltered(&self, event: &NotificationEvent) -> DeliveryResult {
        let event_type = event.event_type();
        let admitted = AtomicBool::new(false);
        let refused = AtomicU32::new(0);
        let (admitted_ref, refused_ref) = (&admitted, &refused);

        let outcome = self
            .retry
            .run(move |attempt| async move {
                // One token per delivery; retries of an admitted delivery are free.
                if !admitted_ref.load(Ordering::Relaxed) {
                    self.acquire_token().map_err(|e| {
                        refused_ref.fetch_add(1, Ordering::Relaxed);
                        e
                    })?;
                    admitted_ref.store(true, Ordering::Relaxed);
                }
                debug!(
                    "Delivering {} to channel {} (attempt {})",
                    event_type,
                    self.name,
                    attempt + 1
                );
                self.transport.deliver(event).await
            })
            .await;

        let refused = refused.load(Ordering::Relaxed);
        let transport_attempts = outcome.attempts - refused;
        self.record(&outcome, transport_attempts, refused);

        match outcome.result {
            Ok(()) => {
                debug!(
                    "Delivered {} to channel {} in {} attempt(s)",
                    event_type, self.name, transport_attempts
                );
                DeliveryResult::delivered(
                    &self.name,
                    &self.channel_type,
                    event_type,
                    transport_attempts,
                )
            }
            Err(e) => {
                if e.retryable {
                    error!(
                        "Delivery of {} to channel {} failed after {} attempt(s): {}",
                        event_type, self.name, outcome.attempts, e
                    );
                } else {
                    warn!(
                        "Delivery of {} to channel {} rejected: {}",
                        event_type, self.name, e
                    );
                }
                DeliveryResult::failed(
                    &self.name,
                    &self.channel_type,
                    event_type,
                    transport_attempts,
                    e,
                )
            }
        }
    }

    fn acquire_token(&self) -> Result<(), DeliveryError> {
        let mut limiter = self.limiter.lock();
        if limiter.try_acquire() {
            Ok(())
        } else {
            let wait = limiter.time_until_available();
            Err(DeliveryError::rate_limited(
                format!("Channel {} rate limit exceeded", self.name),
                Some(wait),
            ))
        }
    }

    fn record(&self, outcome: &RetryOutcome, transport_attempts: u32, refused: u32) {
        let now = Utc::now();
        let mut stats = self.stats.lock();
        stats.attempts += u64::from(transport_attempts);
        stats.failures += u64::from(outcome.failures);
        stats.rate_limited += u64::from(refused);

        if outcome.failures > 0 || outcome.result.is_err() {
            stats.last_failure = Some(now);
        }
        match &outcome.result {
            Ok(()) => {
                stats.successes += 1;
                stats.last_success = Some(now);
            }
            Err(e) => stats.last_error = Some(e.to_string()),
        }
    }
}
