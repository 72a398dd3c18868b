//! Per-channel token bucket.
//!
//! Each channel owns one bucket. An attempt takes a token if one is
//! available and is refused otherwise; the bucket never waits, so a
//! throttled channel does not hold a slot in the dispatch pool.

use statuspulse_core::config::RateLimitConfig;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Token bucket rate limiter.
#[derive(Debug)]
pub struct TokenBucket {
    /// Current number of tokens.
    tokens: f64,
    /// Maximum tokens (burst capacity).
    capacity: u32,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last refill time.
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            tokens: capacity as f64,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Create a bucket from configuration.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.capacity, config.refill_per_second)
    }

    /// Try to take a token.
    ///
    /// Returns `true` if a token was taken, `false` if rate limited.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            trace!("Token bucket empty ({:.2} tokens)", self.tokens);
            false
        }
    }

    /// Get the current number of available tokens.
    pub fn available_tokens(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    /// Get the time until the next token is available.
    pub fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else if self.refill_rate <= 0.0 || !self.refill_rate.is_finite() {
            Duration::MAX
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.refill_rate)
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        if self.refill_rate > 0.0 {
            let new_tokens = elapsed.as_secs_f64() * self.refill_rate;
            self.tokens = (self.tokens + new_tokens).min(self.capacity as f64);
        }
        self.last_refill = now;
    }
}
