//! Delivery outcomes, errors and per-channel statistics.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statuspulse_core::EventType;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Longest response body excerpt kept in an error message.
const MAX_DETAIL_CHARS: usize = 200;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Connection or I/O failure before a response was received.
    NetworkError,
    /// The attempt exceeded its timeout.
    Timeout,
    /// Refused by the channel's own token bucket or by the remote service.
    RateLimited,
    /// Credentials were rejected.
    AuthFailed,
    /// The remote service refused the request.
    Rejected,
    /// The remote service failed to process the request.
    ServerError,
    /// The message could not be built.
    InvalidPayload,
    /// The channel could not be constructed.
    ProviderInit,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::AuthFailed => "AUTH_FAILED",
            Self::Rejected => "REJECTED",
            Self::ServerError => "SERVER_ERROR",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::ProviderInit => "PROVIDER_INIT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed delivery attempt.
///
/// This is a value carried inside [`DeliveryResult`]; `retryable` drives the
/// retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct DeliveryError {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,

    /// HTTP status, when the failure came from a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Server-requested wait before the next attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl DeliveryError {
    /// Create an error with the given code and retry flag.
    pub fn new(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retryable,
            timestamp: Utc::now(),
            status: None,
            retry_after_ms: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message, true)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Attempt timed out after {}ms", after.as_millis()),
            true,
        )
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::new(ErrorCode::RateLimited, message, true).with_retry_after(retry_after)
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPayload, message, false)
    }

    /// A channel that failed construction. Retrying cannot fix configuration.
    pub fn provider_init(error: &ValidationError) -> Self {
        Self::new(ErrorCode::ProviderInit, error.to_string(), false)
    }

    /// Classify a non-2xx HTTP status.
    ///
    /// 408 and 5xx are transient, 429 is a rate limit, 401/403 are
    /// credential problems and every other status is a permanent rejection.
    pub fn from_status(status: u16, detail: &str) -> Self {
        let message = if detail.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, excerpt(detail.trim()))
        };

        let (code, retryable) = match status {
            408 => (ErrorCode::Timeout, true),
            429 => (ErrorCode::RateLimited, true),
            401 | 403 => (ErrorCode::AuthFailed, false),
            500..=599 => (ErrorCode::ServerError, true),
            _ => (ErrorCode::Rejected, false),
        };

        Self {
            status: Some(status),
            ..Self::new(code, message, retryable)
        }
    }

    /// Attach a server-requested wait.
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after_ms = retry_after.map(|d| d.as_millis() as u64);
        self
    }

    /// Server-requested wait, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_DETAIL_CHARS).collect();
    format!("{}…", cut)
}

/// Outcome of delivering one event to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Channel identity (its key in the configuration).
    pub channel: String,

    /// Channel type tag, e.g. "slack".
    pub provider: String,

    pub event_type: EventType,

    pub success: bool,

    /// The channel's filter rejected the event; nothing was sent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,

    /// Transport calls made.
    pub attempts: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DeliveryError>,
}

impl DeliveryResult {
    pub fn delivered(
        channel: impl Into<String>,
        provider: impl Into<String>,
        event_type: EventType,
        attempts: u32,
    ) -> Self {
        Self {
            channel: channel.into(),
            provider: provider.into(),
            event_type,
            success: true,
            skipped: false,
            attempts,
            error: None,
        }
    }

    pub fn failed(
        channel: impl Into<String>,
        provider: impl Into<String>,
        event_type: EventType,
        attempts: u32,
        error: DeliveryError,
    ) -> Self {
        Self {
            channel: channel.into(),
            provider: provider.into(),
            event_type,
            success: false,
            skipped: false,
            attempts,
            error: Some(error),
        }
    }

    pub fn skipped(
        channel: impl Into<String>,
        provider: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            channel: channel.into(),
            provider: provider.into(),
            event_type,
            success: false,
            skipped: true,
            attempts: 0,
            error: None,
        }
    }

    /// Failure code, when the delivery failed.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// Running counters for one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatistics {
    /// Transport calls made.
    pub attempts: u64,
    /// Deliveries that succeeded.
    pub successes: u64,
    /// Failed attempts, including those refused by the rate limiter.
    pub failures: u64,
    /// Attempts refused by the rate limiter.
    pub rate_limited: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ChannelStatistics {
    /// Fraction of attempts that failed, 0.0 when nothing was attempted.
    pub fn failure_rate(&self) -> f64 {
        let total = self.attempts + self.rate_limited;
        if total == 0 {
            0.0
        } else {
            self.failures as f64 / total as f64
        }
    }
}

/// Totals over a set of delivery results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    /// `(channel, message)` for each failed delivery.
    pub failures: Vec<(String, String)>,
}

impl DispatchSummary {
    /// Summarise results. Skipped results are not counted.
    pub fn from_results(results: &[DeliveryResult]) -> Self {
        let mut summary = Self::default();
        for result in results.iter().filter(|r| !r.skipped) {
            summary.total += 1;
            if result.success {
                summary.delivered += 1;
            } else {
                summary.failed += 1;
                let message = result
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string());
                summary.failures.push((result.channel.clone(), message));
            }
        }
        summary
    }

    /// True when nothing failed.
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}
