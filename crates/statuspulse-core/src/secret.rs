//! Credential handling that keeps tokens and webhook URLs out of logs.

use serde::{Deserialize, Deserializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "[REDACTED]";

/// A channel credential: bot token, SMTP password, auth header, or a webhook
/// URL whose path is itself the credential.
///
/// Providers parse their settings straight into this type. The value is
/// zeroed on drop, prints as `[REDACTED]`, and only leaves through
/// [`expose_secret`](Self::expose_secret) when a request is built.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// The raw credential, for building a request.
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// True for an empty or whitespace-only value, which no channel accepts.
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Equal lengths are compared without early exit.
impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.value.as_bytes(), other.value.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl Eq for SecretString {}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reduce a URL to its scheme and host for log output.
///
/// Webhook URLs carry their credential in the path, so only the origin is
/// safe to print: `https://hooks.slack.com/services/T0/B0/xyz` becomes
/// `https://hooks.slack.com/…`.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return REDACTED.to_string();
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    // Userinfo is a credential too.
    let host = host.rsplit('@').next().unwrap_or(host);
    format!("{scheme}://{host}/…")
}
