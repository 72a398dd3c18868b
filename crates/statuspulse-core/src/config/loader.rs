//! Configuration loading and validation.

use super::{env, ChannelConfig, Config, RateLimitConfig, RetryConfig};
use crate::error::ConfigError;
use crate::paths;
use crate::secret::redact_url;
use crate::types::EventType;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

const REDACTED: &str = "[REDACTED]";

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(
            "Loaded configuration from {} ({} channels)",
            path.display(),
            config.notifications.channels.len()
        );
        Ok(config)
    }

    /// Parse configuration from a string, resolving `env:NAME` references
    /// against the process environment.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::parse_with(content, env::get_var)
    }

    /// Parse configuration from a string with a custom variable lookup.
    pub fn parse_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut value: Value =
            json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))?;
        env::resolve_env_refs(&mut value, &lookup)?;
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Pretty JSON rendering with credentials masked, for display.
    pub fn to_redacted_json(&self) -> Result<String, ConfigError> {
        let mut value =
            serde_json::to_value(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        redact(&mut value, None);
        serde_json::to_string_pretty(&value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let notifications = &self.notifications;

        if notifications.concurrency == 0 {
            errors.push("Notification concurrency must be greater than 0".to_string());
        }

        for name in notifications.event_policy.keys() {
            if let Err(e) = name.parse::<EventType>() {
                errors.push(format!("eventPolicy: {}", e));
            }
        }

        check_retry("defaults", &notifications.defaults.retry_config, &mut errors);
        check_rate_limit("defaults", &notifications.defaults.rate_limit, &mut errors);

        for (name, channel) in &notifications.channels {
            check_channel(name, channel, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

fn check_channel(name: &str, channel: &ChannelConfig, errors: &mut Vec<String>) {
    let scope = format!("Channel '{}'", name);

    if channel.channel_type(name).trim().is_empty() {
        errors.push(format!("{}: type must not be empty", scope));
    }
    if let Some(retry) = &channel.retry_config {
        check_retry(&scope, retry, errors);
    }
    if let Some(rate_limit) = &channel.rate_limit {
        check_rate_limit(&scope, rate_limit, errors);
    }
    for event in channel.events.allow.iter().chain(&channel.events.deny) {
        if let Err(e) = event.parse::<EventType>() {
            errors.push(format!("{}: {}", scope, e));
        }
    }
}

fn check_retry(scope: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    errors.extend(retry.problems().into_iter().map(|p| format!("{}: {}", scope, p)));
}

fn check_rate_limit(scope: &str, rate_limit: &RateLimitConfig, errors: &mut Vec<String>) {
    errors.extend(rate_limit.problems().into_iter().map(|p| format!("{}: {}", scope, p)));
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["token", "password", "secret", "authorization", "apikey", "credential"]
        .iter()
        .any(|needle| key.contains(needle))
}

fn redact(value: &mut Value, parent: Option<&str>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                let masked = match parent {
                    Some("headers") => true,
                    Some("auth") => key != "type",
                    _ => is_sensitive_key(key),
                };

                match item {
                    Value::String(s) if masked => *s = REDACTED.to_string(),
                    Value::String(s) if key.to_ascii_lowercase().ends_with("url") => {
                        *s = redact_url(s);
                    }
                    _ => redact(item, Some(key.as_str())),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact(item, parent);
            }
        }
        _ => {}
    }
}
