//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Main statuspulse configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Notification channels and dispatch settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Notifications configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsConfig {
    /// Number of channels delivered to in parallel for one event.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overrides of the default event policy, keyed by event type name.
    #[serde(default)]
    pub event_policy: BTreeMap<String, bool>,

    /// Settings shared by every channel unless overridden.
    #[serde(default)]
    pub defaults: ChannelDefaults,

    /// Channels keyed by their identity.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            event_policy: BTreeMap::new(),
            defaults: ChannelDefaults::default(),
            channels: BTreeMap::new(),
        }
    }
}

impl NotificationsConfig {
    /// Retry settings for a channel: its own block if present, otherwise the shared defaults.
    pub fn retry_for(&self, channel: &ChannelConfig) -> RetryConfig {
        channel
            .retry_config
            .clone()
            .unwrap_or_else(|| self.defaults.retry_config.clone())
    }

    /// Rate limit settings for a channel.
    pub fn rate_limit_for(&self, channel: &ChannelConfig) -> RateLimitConfig {
        channel
            .rate_limit
            .clone()
            .unwrap_or_else(|| self.defaults.rate_limit.clone())
    }
}

/// Defaults applied to channels that do not set their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDefaults {
    #[serde(default)]
    pub retry_config: RetryConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Retry and timeout settings for deliveries.
///
/// Fields missing from a configured block take the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Additional attempts after the first. `0` means exactly one attempt.
    pub max_retries: u32,

    /// Base delay; attempt `i` waits `retry_delay_ms * 2^i`.
    pub retry_delay_ms: u64,

    /// Per-attempt timeout.
    pub timeout_ms: u64,

    /// Upper bound for a single backoff delay.
    pub max_retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 1000,
            timeout_ms: 5000,
            max_retry_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting. Mostly useful in tests.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Settings that would make every delivery fail.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.timeout_ms == 0 {
            problems.push("retryConfig.timeoutMs must be greater than 0".to_string());
        }
        if self.max_retry_delay_ms < self.retry_delay_ms {
            problems.push(format!(
                "retryConfig.maxRetryDelayMs ({}) is below retryDelayMs ({})",
                self.max_retry_delay_ms, self.retry_delay_ms
            ));
        }
        problems
    }
}

/// Token bucket settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Bucket size.
    pub capacity: u32,

    /// Tokens added per second.
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            refill_per_second: 1.0,
        }
    }
}

impl RateLimitConfig {
    /// Settings under which the bucket could never admit a delivery.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.capacity == 0 {
            problems.push("rateLimit.capacity must be greater than 0".to_string());
        }
        if !(self.refill_per_second > 0.0) {
            problems.push(format!(
                "rateLimit.refillPerSecond must be positive, got {}",
                self.refill_per_second
            ));
        }
        problems
    }
}

/// Per-channel event selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSelection {
    /// When non-empty, exactly these event types are delivered, whatever the
    /// service-wide policy says.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    /// Event types never delivered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

impl EventSelection {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

/// Configuration of one notification channel.
///
/// Keys not listed here (webhook URLs, tokens, SMTP settings, ...) are kept
/// in `settings` and interpreted by the channel's provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    /// Channel type tag. Defaults to the channel's key in the channels map.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Whether the channel receives events.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    #[serde(default, skip_serializing_if = "EventSelection::is_empty")]
    pub events: EventSelection,

    /// Channel-specific settings.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: None,
            enabled: true,
            retry_config: None,
            rate_limit: None,
            events: EventSelection::default(),
            settings: Map::new(),
        }
    }
}

impl ChannelConfig {
    /// Create a config for the given channel type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Set a channel-specific setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Override the retry settings.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry_config = Some(retry);
        self
    }

    /// Override the rate limit.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Enable or disable the channel.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Channel type tag, falling back to the channel's name.
    pub fn channel_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.kind.as_deref().unwrap_or(name)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    5
}
