//! Discord webhook channel.

use super::{parse_webhook_url, require_secret, truncate};
use crate::delivery::DeliveryError;
use crate::error::ValidationError;
use crate::http;
use crate::render;
use crate::traits::{parse_settings, ProviderContext, ProviderFactory, Transport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use statuspulse_core::{EventType, NotificationEvent, SecretString, Severity};
use std::time::Duration;

const PROVIDER: &str = "Discord";
const HOSTS: [&str; 4] = [
    "discord.com",
    "discordapp.com",
    "ptb.discord.com",
    "canary.discord.com",
];
const TITLE_MAX: usize = 256;
const DESCRIPTION_MAX: usize = 4096;
const FIELD_VALUE_MAX: usize = 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscordSettings {
    webhook_url: Option<SecretString>,
    #[serde(default)]
    mentions: Vec<String>,
    username: Option<String>,
    avatar_url: Option<String>,
}

/// Factory for the `discord` channel type.
#[derive(Debug, Default)]
pub struct DiscordFactory;

impl ProviderFactory for DiscordFactory {
    fn channel_type(&self) -> &str {
        "discord"
    }

    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError> {
        Ok(Box::new(DiscordTransport::new(ctx, settings)?))
    }
}

/// Discord webhook transport.
pub struct DiscordTransport {
    client: reqwest::Client,
    webhook_url: SecretString,
    timeout: Duration,
    mentions: Vec<String>,
    username: Option<String>,
    avatar_url: Option<String>,
}

impl DiscordTransport {
    pub fn new(ctx: &ProviderContext, settings: &Map<String, Value>) -> Result<Self, ValidationError> {
        let settings: DiscordSettings = parse_settings(PROVIDER, settings)?;
        let raw = require_secret(PROVIDER, "webhookUrl", &settings.webhook_url)?;
        let url = parse_webhook_url(PROVIDER, raw, &HOSTS, "/api/webhooks/")?;

        Ok(Self {
            client: ctx.http.clone(),
            webhook_url: SecretString::new(url.to_string()),
            timeout: ctx.timeout,
            mentions: settings.mentions,
            username: settings.username,
            avatar_url: settings.avatar_url,
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

        let fields: Vec<Value> = message
            .fields
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "value": truncate(&f.value, FIELD_VALUE_MAX),
                    "inline": true,
                })
            })
            .collect();

        let mut embed = json!({
            "title": truncate(&format!("{}: {}", message.decorated_heading(), message.title), TITLE_MAX),
            "color": render::color(message.event_type, message.severity),
            "timestamp": message.timestamp.to_rfc3339(),
            "fields": fields,
            "footer": { "text": "statuspulse" },
        });
        if let Some(body) = &message.body {
            embed["description"] = json!(truncate(body, DESCRIPTION_MAX));
        }
        if let Some(url) = &message.url {
            embed["url"] = json!(url);
        }

        let mut payload = json!({ "embeds": [embed] });

        let mentioned = event.event_type() == EventType::IncidentOpened
            && event.severity() == Severity::Critical
            && !self.mentions.is_empty();
        if mentioned {
            let tokens: Vec<String> = self.mentions.iter().map(|id| format!("<@{}>", id)).collect();
            payload["content"] = json!(tokens.join(" "));
            payload["allowed_mentions"] = json!({ "users": self.mentions });
        }
        if let Some(username) = &self.username {
            payload["username"] = json!(username);
        }
        if let Some(avatar_url) = &self.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }
}

#[async_trait]
impl Transport for DiscordTransport {
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
