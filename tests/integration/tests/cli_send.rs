//! CLI argument handling against real config and event files.

use clap::Parser;
use statuspulse_cli::commands::send::parse_events;
use statuspulse_cli::{run, Cli};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS: &str = r#"[
  {
    "type": "maintenance.scheduled",
    "timestamp": "2024-05-01T10:00:00Z",
    "maintenance": {
      "id": "21",
      "title": "Database upgrade",
      "start": "2024-05-04T22:00:00Z",
      "end": "2024-05-05T01:00:00Z",
      "affectedEntities": ["db"],
      "url": "https://github.com/acme/status/issues/21"
    }
  },
  {
    "type": "slo.breached",
    "timestamp": "2024-05-01T11:00:00Z",
    "slo": { "entity": "api", "metric": "uptime", "target": 99.9, "actual": 99.2, "period": "30d" }
  }
]"#;

fn write_config(dir: &TempDir, hook_url: &str) -> String {
    let path = dir.path().join("statuspulse.json5");
    std::fs::write(
        &path,
        format!(
            "{{ notifications: {{ channels: {{ hook: {{ type: 'webhook', url: '{}', retryConfig: {{ maxRetries: 0 }} }} }} }} }}",
            hook_url
        ),
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_event_file_parses() {
    let events = parse_events(EVENTS).unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_send_command_delivers_every_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server.uri());
    let events = dir.path().join("events.json");
    std::fs::write(&events, EVENTS).unwrap();

    let cli = Cli::try_parse_from([
        "statuspulse",
        "--config",
        config.as_str(),
        "--json",
        "send",
        events.to_str().unwrap(),
    ])
    .unwrap();
    assert!(run(cli).await.is_ok());
}

#[tokio::test]
async fn test_config_validate_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statuspulse.json5");
    std::fs::write(&path, "{ notifications: { concurrency: 0 } }").unwrap();

    let cli = Cli::try_parse_from([
        "statuspulse",
        "--config",
        path.to_str().unwrap(),
        "config",
        "validate",
    ])
    .unwrap();
    let err = run(cli).await.unwrap_err();
    assert!(err.to_string().contains("concurrency"));
}
