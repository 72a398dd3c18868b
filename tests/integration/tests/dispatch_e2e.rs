//! End-to-end dispatch through config, registry and HTTP transports.

use statuspulse_integration_tests::{config_with, critical_incident, system_recovered};
use statuspulse_notify::{ErrorCode, NotificationService};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TWO_WEBHOOKS: &str = r#"{
  notifications: {
    defaults: { retryConfig: { maxRetries: 0 } },
    channels: {
      primary: { type: "webhook", url: "env:PRIMARY_URL" },
      backup: { type: "webhook", url: "env:BACKUP_URL", method: "PUT" },
    },
  },
}"#;

#[tokio::test]
async fn test_one_failing_channel_does_not_affect_the_other() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/primary"))
        .and(body_partial_json(serde_json::json!({ "type": "incident.opened" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/backup"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_with(
        TWO_WEBHOOKS,
        &[
            ("PRIMARY_URL", format!("{}/primary", server.uri())),
            ("BACKUP_URL", format!("{}/backup", server.uri())),
        ],
    );
    config.validate().unwrap();
    let service = NotificationService::new(config.notifications).unwrap();

    let results = service.dispatch(&critical_incident()).await;
    assert_eq!(results.len(), 2);

    let primary = results.iter().find(|r| r.channel == "primary").unwrap();
    assert!(primary.success);
    assert_eq!(primary.provider, "webhook");

    let backup = results.iter().find(|r| r.channel == "backup").unwrap();
    assert!(!backup.success);
    assert_eq!(backup.attempts, 1);
    assert_eq!(backup.error_code(), Some(ErrorCode::ServerError));

    let stats = service.statistics();
    assert_eq!(stats["primary"].successes, 1);
    assert_eq!(stats["backup"].failures, 1);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_with(
        r#"{
          notifications: {
            channels: {
              hook: {
                type: "webhook",
                url: "env:HOOK_URL",
                retryConfig: { maxRetries: 2, retryDelayMs: 10 },
              },
            },
          },
        }"#,
        &[("HOOK_URL", server.uri())],
    );
    let service = NotificationService::new(config.notifications).unwrap();

    let results = service.dispatch(&system_recovered()).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].attempts, 2);

    let stats = &service.statistics()["hook"];
    assert_eq!(stats.attempts, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.successes, 1);
}

#[tokio::test]
async fn test_dispatch_all_with_one_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_with(
        r#"{ notifications: { channels: { ops: { type: "webhook", url: "env:URL" } } } }"#,
        &[("URL", server.uri())],
    );
    let service = NotificationService::new(config.notifications).unwrap();

    let results = service
        .dispatch_all(&[critical_incident(), system_recovered()])
        .await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.channel == "ops" && r.success));
}

#[tokio::test]
async fn test_telegram_through_api_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123456:ABCdef_ghi-jkl/sendMessage"))
        .and(body_partial_json(serde_json::json!({ "chat_id": "-1001", "parse_mode": "Markdown" })))
        .and(body_string_contains(r"Checkout \\[EU] failing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_with(
        r#"{
          notifications: {
            channels: {
              oncall: {
                type: "telegram",
                botToken: "env:TG_TOKEN",
                chatId: -1001,
                apiBaseUrl: "env:TG_API",
              },
            },
          },
        }"#,
        &[
            ("TG_TOKEN", "123456:ABCdef_ghi-jkl".to_string()),
            ("TG_API", server.uri()),
        ],
    );
    let service = NotificationService::new(config.notifications).unwrap();

    let results = service.dispatch(&critical_incident()).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].success, "{:?}", results[0].error);
}

#[tokio::test]
async fn test_misconfigured_channel_reports_and_isolates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_with(
        r#"{
          notifications: {
            channels: {
              slack: { webhookUrl: "https://example.com/not-slack" },
              hook: { type: "webhook", url: "env:URL" },
            },
          },
        }"#,
        &[("URL", server.uri())],
    );
    let service = NotificationService::new(config.notifications).unwrap();

    let warm = service.warm_up().await;
    let slack = warm.iter().find(|(name, _)| name == "slack").unwrap();
    assert_eq!(
        slack.1.as_ref().unwrap_err().to_string(),
        "Invalid Slack webhook URL"
    );

    let results = service.dispatch(&critical_incident()).await;
    assert_eq!(results.len(), 2);
    let slack = results.iter().find(|r| r.channel == "slack").unwrap();
    assert_eq!(slack.error_code(), Some(ErrorCode::ProviderInit));
    assert!(results.iter().find(|r| r.channel == "hook").unwrap().success);
}
