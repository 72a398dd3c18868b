//! Exponential-backoff retry around a single delivery attempt.

use crate::delivery::DeliveryError;
use statuspulse_core::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry schedule and per-attempt timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Budget for one attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Final state of a retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome {
    /// Result of the last attempt.
    pub result: Result<(), DeliveryError>,
    /// Attempts made, including the last.
    pub attempts: u32,
    /// Attempts that failed.
    pub failures: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_delay_ms),
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Backoff before retry number `attempt_index + 1`: `base * 2^attempt_index`, capped.
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Wait before the next attempt, honouring a server-requested delay.
    fn delay_after(&self, attempt_index: u32, error: &DeliveryError) -> Duration {
        let backoff = self.backoff(attempt_index);
        match error.retry_after() {
            Some(requested) => backoff.max(requested.min(self.max_delay)),
            None => backoff,
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent.
    ///
    /// `attempt` receives the zero-based attempt index. Each call is bounded
    /// by `timeout`; an attempt that exceeds it counts as a retryable
    /// `TIMEOUT` failure.
    pub async fn run<F, Fut>(&self, mut attempt: F) -> RetryOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        let mut index = 0u32;
        let mut failures = 0u32;

        loop {
            let result = match tokio::time::timeout(self.timeout, attempt(index)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::timeout(self.timeout)),
            };

            let error = match result {
                Ok(()) => {
                    return RetryOutcome {
                        result: Ok(()),
                        attempts: index + 1,
                        failures,
                    }
                }
                Err(error) => error,
            };
            failures += 1;

            if !error.retryable || index >= self.max_retries {
                return RetryOutcome {
                    result: Err(error),
                    attempts: index + 1,
                    failures,
                };
            }

            let delay = self.delay_after(index, &error);
            debug!(
                "Attempt {} failed ({}), retrying in {:?}",
                index + 1,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            index += 1;
        }
    }
}
