//! Slack incoming-webhook channel.
//!
//! Posts Block Kit messages to a `https://hooks.slack.com/services/…` URL.
//! Critical `incident.opened` events mention the configured users.

use super::{parse_webhook_url, require_secret, truncate};
use crate::delivery::DeliveryError;
use crate::error::ValidationError;
use crate::http;
use crate::render::{self, Message};
use crate::traits::{parse_settings, ProviderContext, ProviderFactory, Transport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use statuspulse_core::{EventType, NotificationEvent, SecretString, Severity};
use std::time::Duration;

const PROVIDER: &str = "Slack";
const HEADER_MAX: usize = 150;
const SECTION_MAX: usize = 3000;
const MAX_FIELDS: usize = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlackSettings {
    webhook_url: Option<SecretString>,
    #[serde(default)]
    mentions: Vec<String>,
    username: Option<String>,
    icon_emoji: Option<String>,
    channel: Option<String>,
}

/// Factory for the `slack` channel type.
#[derive(Debug, Default)]
pub struct SlackFactory;

impl ProviderFactory for SlackFactory {
    fn channel_type(&self) -> &str {
        "slack"
    }

    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError> {
        Ok(Box::new(SlackTransport::new(ctx, settings)?))
    }
}

/// Slack webhook transport.
pub struct SlackTransport {
    client: reqwest::Client,
    webhook_url: SecretString,
    timeout: Duration,
    mentions: Vec<String>,
    username: Option<String>,
    icon_emoji: Option<String>,
    channel: Option<String>,
}

impl SlackTransport {
    /// Validate settings and build the transport.
    pub fn new(ctx: &ProviderContext, settings: &Map<String, Value>) -> Result<Self, ValidationError> {
        let settings: SlackSettings = parse_settings(PROVIDER, settings)?;
        let raw = require_secret(PROVIDER, "webhookUrl", &settings.webhook_url)?;
        let url = parse_webhook_url(PROVIDER, raw, &["hooks.slack.com"], "/services/")?;

        Ok(Self {
            client: ctx.http.clone(),
            webhook_url: SecretString::new(url.to_string()),
            timeout: ctx.timeout,
            mentions: settings
                .mentions
                .into_iter()
                .filter(|m| !m.trim().is_empty())
                .collect(),
            username: settings.username,
            icon_emoji: settings.icon_emoji,
            channel: settings.channel,
        })
    }

    #[cfg(test)]
    fn with_endpoint(mut self, url: String) -> Self {
        self.webhook_url = SecretString::new(url);
        self
    }

    /// Build the JSON body for an event.
    pub fn build_payload(&self, event: &NotificationEvent) -> Value {
        let message = render::render(event);
        let mut payload = json!({
            "text": escape(&message.summary()),
            "blocks": self.blocks(&message),
            "attachments": [{
                "color": format!("#{:06x}", render::color(message.event_type, message.severity)),
                "fallback": escape(&message.summary()),
                "footer": "statuspulse",
                "ts": message.timestamp.timestamp(),
            }],
        });

        if let Value::Object(map) = &mut payload {
            if let Some(username) = &self.username {
                map.insert("username".into(), json!(username));
            }
            if let Some(icon) = &self.icon_emoji {
                map.insert("icon_emoji".into(), json!(icon));
            }
            if let Some(channel) = &self.channel {
                map.insert("channel".into(), json!(channel));
            }
        }
        payload
    }

    fn blocks(&self, message: &Message) -> Value {
        let title = match &message.url {
            Some(url) => format!("*<{}|{}>*", url, escape(&message.title)),
            None => format!("*{}*", escape(&message.title)),
        };
        let mut text = title;
        if let Some(body) = &message.body {
            text.push('\n');
            text.push_str(&escape(body));
        }

        // Mentions are never truncated.
        let mention_line = if self.should_mention(message) {
            let tokens: Vec<String> = self.mentions.iter().map(|m| mention_token(m)).collect();
            format!("\n\n{}", tokens.join(" "))
        } else {
            String::new()
        };
        let budget = SECTION_MAX.saturating_sub(mention_line.chars().count());
        let mut text = truncate(&text, budget);
        text.push_str(&mention_line);

        let mut blocks = vec![
            json!({
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": truncate(&message.decorated_heading(), HEADER_MAX),
                    "emoji": true,
                },
            }),
            json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": text },
            }),
        ];

        if !message.fields.is_empty() {
            let fields: Vec<Value> = message
                .fields
                .iter()
                .take(MAX_FIELDS)
                .map(|f| {
                    json!({
                        "type": "mrkdwn",
                        "text": format!("*{}*\n{}", f.name, escape(&f.value)),
                    })
                })
                .collect();
            blocks.push(json!({ "type": "section", "fields": fields }));
        }

        blocks.push(json!({
            "type": "context",
            "elements": [{
                "type": "mrkdwn",
                "text": format!("statuspulse · {}", render::format_time(&message.timestamp)),
            }],
        }));

        Value::Array(blocks)
    }

    fn should_mention(&self, message: &Message) -> bool {
        !self.mentions.is_empty()
            && message.event_type == EventType::IncidentOpened
            && message.severity == Severity::Critical
    }
}

#[async_trait]
impl Transport for SlackTransport {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let payload = self.build_payload(event);
        let request = self
            .client
            .post(self.webhook_url.expose_secret())
            .timeout(self.timeout)
            .json(&payload);
        http::execute(request).await
    }
}

/// Inline mention for a user id, user group id, or broadcast keyword.
fn mention_token(id: &str) -> String {
    let id = id.trim();
    match id {
        "here" | "channel" | "everyone" => format!("<!{}>", id),
        _ if id.starts_with('S') => format!("<!subteam^{}>", id),
        _ => format!("<@{}>", id),
    }
}

/// Escape the characters Slack's mrkdwn treats as control sequences.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_event;
    use statuspulse_core::{EventPayload, EventType};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://hooks.slack.com/services/T000/B000/XXXX";

    fn ctx() -> ProviderContext {
        ProviderContext::new("slack", reqwest::Client::new(), Duration::from_secs(5))
    }

    fn settings(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn transport(mentions: &[&str]) -> SlackTransport {
        SlackTransport::new(&ctx(), &settings(json!({ "webhookUrl": URL, "mentions": mentions })))
            .unwrap()
    }

    #[test]
    fn test_slack_channel_creation() {
        let factory = SlackFactory;
        assert_eq!(factory.channel_type(), "slack");
        assert!(factory.create(&ctx(), &settings(json!({ "webhookUrl": URL }))).is_ok());
    }

    #[test]
    fn test_missing_webhook_url() {
        for value in [json!({}), json!({ "webhookUrl": "" }), json!({ "webhookUrl": "   " })] {
            let err = SlackTransport::new(&ctx(), &settings(value)).err().unwrap();
            assert_eq!(err.to_string(), "Slack webhookUrl is required");
        }
    }

    #[test]
    fn test_invalid_webhook_url() {
        let err = SlackTransport::new(
            &ctx(),
            &settings(json!({ "webhookUrl": "https://example.com/services/T/B/X" })),
        )
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "Invalid Slack webhook URL");
    }

    #[test]
    fn test_payload_shape() {
        let payload = transport(&[]).build_payload(&sample_event(EventType::SystemDown));

        assert!(payload["blocks"].is_array());
        assert!(payload["attachments"].is_array());
        assert_eq!(payload["blocks"][0]["type"], "header");
        assert_eq!(payload["attachments"][0]["color"], "#e01e5a");
        assert_eq!(payload["text"], "System down: api is down");
    }

    #[test]
    fn test_critical_incident_mentions() {
        let payload =
            transport(&["U111", "U222"]).build_payload(&sample_event(EventType::IncidentOpened));
        let serialized = payload.to_string();

        assert!(serialized.contains("<@U111>"));
        assert!(serialized.contains("<@U222>"));
    }

    #[test]
    fn test_mentions_survive_long_body() {
        let mut event = sample_event(EventType::IncidentOpened);
        if let EventPayload::IncidentOpened { incident } = &mut event.payload {
            incident.body = Some("x".repeat(3_500));
        }

        let payload = transport(&["U111", "U222"]).build_payload(&event);
        let section = payload["blocks"][1]["text"]["text"].as_str().unwrap();

        assert!(section.chars().count() <= SECTION_MAX);
        assert!(section.ends_with("<@U111> <@U222>"));
        assert!(section.contains('…'));
    }

    #[test]
    fn test_no_mentions_for_other_events() {
        let payload =
            transport(&["U111"]).build_payload(&sample_event(EventType::IncidentClosed));
        assert!(!payload.to_string().contains("<@U111>"));
    }

    #[test]
    fn test_mention_tokens() {
        assert_eq!(mention_token("U1"), "<@U1>");
        assert_eq!(mention_token("here"), "<!here>");
        assert_eq!(mention_token("S9"), "<!subteam^S9>");
    }

    #[test]
    fn test_escapes_control_characters() {
        assert_eq!(escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }

    #[tokio::test]
    async fn test_deliver_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T000/B000/XXXX"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({ "text": "System recovered: api has recovered" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(&[])
            .with_endpoint(format!("{}/services/T000/B000/XXXX", server.uri()));
        let result = transport
            .deliver(&sample_event(EventType::SystemRecovered))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_deliver_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid_token"))
            .mount(&server)
            .await;

        let transport = transport(&[]).with_endpoint(server.uri());
        let err = transport
            .deliver(&sample_event(EventType::SystemDown))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::delivery::ErrorCode::AuthFailed);
        assert!(!err.retryable);
    }
}
