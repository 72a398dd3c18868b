//! Config file loading, env resolution and validation.

use statuspulse_core::{Config, ConfigError};
use statuspulse_integration_tests::config_with;
use std::path::Path;
use tempfile::TempDir;

const SAMPLE: &str = r#"{
  // Notification channels
  notifications: {
    concurrency: 3,
    eventPolicy: { "incident.updated": true },
    channels: {
      slack: {
        webhookUrl: "env:SP_IT_SLACK_URL",
        mentions: ["U123"],
        retryConfig: { maxRetries: 1, retryDelayMs: 250, timeoutMs: 2000 },
      },
      oncall: {
        type: "telegram",
        botToken: "env:SP_IT_TG_TOKEN",
        chatId: "-100123",
        events: { deny: ["maintenance.scheduled"] },
      },
    },
  },
  logging: { level: "debug", format: "json" },
}"#;

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statuspulse.json5");
    std::fs::write(&path, r#"{ notifications: { channels: { hook: { type: "webhook", url: "https://example.com/h" } } } }"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.notifications.concurrency, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_nonexistent() {
    let err = Config::load(Path::new("/nonexistent/statuspulse.json5")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_env_references_resolved() {
    let config = config_with(
        SAMPLE,
        &[
            ("SP_IT_SLACK_URL", "https://hooks.slack.com/services/T/B/X".to_string()),
            ("SP_IT_TG_TOKEN", "1:abc".to_string()),
        ],
    );

    let slack = &config.notifications.channels["slack"];
    assert_eq!(
        slack.settings["webhookUrl"],
        "https://hooks.slack.com/services/T/B/X"
    );
    assert_eq!(slack.retry_config.as_ref().unwrap().max_retries, 1);
    assert_eq!(config.notifications.channels["oncall"].channel_type("oncall"), "telegram");
    assert!(config.validate().is_ok());

    let shown = config.to_redacted_json().unwrap();
    assert!(!shown.contains("1:abc"));
    assert!(!shown.contains("/services/T/B/X"));
}

#[test]
fn test_unresolved_env_reference() {
    let err = Config::parse_with(SAMPLE, |_| None).unwrap_err();
    match err {
        ConfigError::UnresolvedEnv { name, path } => {
            assert!(name.starts_with("SP_IT_"));
            assert!(path.starts_with("notifications.channels."));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_validation_collects_errors() {
    let config = config_with(
        r#"{
          notifications: {
            concurrency: 0,
            eventPolicy: { "incident.reopened": true },
            channels: { a: { type: "webhook", rateLimit: { capacity: 0 } } },
          },
        }"#,
        &[],
    );
    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("concurrency"));
    assert!(message.contains("incident.reopened"));
    assert!(message.contains("Channel 'a'"));
}
