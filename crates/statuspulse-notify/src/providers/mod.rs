//! Built-in channel providers.
//!
//! Each provider module exposes a [`ProviderFactory`](crate::traits::ProviderFactory)
//! registered under its channel type tag by
//! [`ProviderRegistry::with_builtins`](crate::registry::ProviderRegistry::with_builtins).

#[cfg(feature = "discord")]
pub mod discord;
#[cfg(feature = "email")]
pub mod email;
#[cfg(feature = "slack")]
pub mod slack;
#[cfg(feature = "telegram")]
pub mod telegram;
#[cfg(feature = "webhook")]
pub mod webhook;

#[cfg(feature = "discord")]
pub use discord::DiscordFactory;
#[cfg(feature = "email")]
pub use email::EmailFactory;
#[cfg(feature = "slack")]
pub use slack::SlackFactory;
#[cfg(feature = "telegram")]
pub use telegram::TelegramFactory;
#[cfg(feature = "webhook")]
pub use webhook::WebhookFactory;

use crate::error::ValidationError;
use statuspulse_core::SecretString;
use url::Url;

/// Require a non-blank secret setting.
#[allow(dead_code)]
pub(crate) fn require_secret<'a>(
    provider: &'static str,
    field: &str,
    value: &'a Option<SecretString>,
) -> Result<&'a SecretString, ValidationError> {
    match value {
        Some(secret) if !secret.is_blank() => Ok(secret),
        _ => Err(ValidationError::required(provider, field)),
    }
}

/// Parse a chat webhook URL and check it points at the service's webhook
/// endpoint: https, one of `hosts`, and a path under `path_prefix`.
#[allow(dead_code)]
pub(crate) fn parse_webhook_url(
    provider: &'static str,
    raw: &SecretString,
    hosts: &[&str],
    path_prefix: &str,
) -> Result<Url, ValidationError> {
    let invalid = || ValidationError::invalid(provider, "webhook URL");
    let url = Url::parse(raw.expose_secret().trim()).map_err(|_| invalid())?;

    let host_ok = url
        .host_str()
        .map(|h| hosts.iter().any(|allowed| h.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false);
    let path_ok = url.path().len() > path_prefix.len() && url.path().starts_with(path_prefix);

    if url.scheme() == "https" && host_ok && path_ok {
        Ok(url)
    } else {
        Err(invalid())
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
#[allow(dead_code)]
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
