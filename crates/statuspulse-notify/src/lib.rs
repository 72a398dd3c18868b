//! Multi-channel notification dispatch for statuspulse.
//!
//! A [`NotificationService`] takes a [`NotificationEvent`] and delivers it to
//! every configured channel whose event policy accepts it. Each channel is a
//! [`ChannelProvider`]: an event filter, a token bucket, and a retry loop
//! composed around a channel-specific [`Transport`].
//!
//! Delivery never fails through `Err`: every outcome is a [`DeliveryResult`].
//! Misconfiguration is reported as a [`ValidationError`] when a channel is
//! constructed.
//!
//! [`NotificationEvent`]: statuspulse_core::NotificationEvent

pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod provider;
pub mod rate_limit;
pub mod registry;
pub mod render;
pub mod retry;
pub mod traits;

mod http;
pub mod providers;

#[cfg(test)]
pub(crate) mod fixtures;

pub use delivery::{ChannelStatistics, DeliveryError, DeliveryResult, DispatchSummary, ErrorCode};
pub use dispatcher::{ChannelInfo, NotificationService, NotificationServiceBuilder};
pub use error::ValidationError;
pub use filter::{EventFilter, EventPolicy};
pub use provider::ChannelProvider;
pub use rate_limit::TokenBucket;
pub use registry::ProviderRegistry;
pub use retry::{RetryOutcome, RetryPolicy};
pub use traits::{ProviderContext, ProviderFactory, Transport};

/// Result type for channel construction.
pub type Result<T> = std::result::Result<T, ValidationError>;
