//! Generic JSON webhook channel.

use super::require_secret;
use crate::delivery::DeliveryError;
use crate::error::ValidationError;
use crate::http;
use crate::render;
use crate::traits::{parse_settings, ProviderContext, ProviderFactory, Transport};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use statuspulse_core::{NotificationEvent, SecretString};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const PROVIDER: &str = "Webhook";

/// Webhook authentication.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WebhookAuth {
    Bearer { token: SecretString },
    Basic {
        username: String,
        password: SecretString,
    },
    Header { name: String, value: SecretString },
}

#[derive(Debug, Default, Deserialize)]
struct WebhookSettings {
    url: Option<SecretString>,
    method: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, SecretString>,
    auth: Option<WebhookAuth>,
}

/// Factory for the `webhook` channel type.
#[derive(Debug, Default)]
pub struct WebhookFactory;

impl ProviderFactory for WebhookFactory {
    fn channel_type(&self) -> &str {
        "webhook"
    }

    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError> {
        Ok(Box::new(WebhookTransport::new(ctx, settings)?))
    }
}

/// Generic webhook transport.
pub struct WebhookTransport {
    client: reqwest::Client,
    url: SecretString,
    method: Method,
    headers: HeaderMap,
    basic: Option<(String, SecretString)>,
    timeout: Duration,
}

impl WebhookTransport {
    pub fn new(ctx: &ProviderContext, settings: &Map<String, Value>) -> Result<Self, ValidationError> {
        let settings: WebhookSettings = parse_settings(PROVIDER, settings)?;

        let raw = require_secret(PROVIDER, "url", &settings.url)?;
        let url = Url::parse(raw.expose_secret().trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .ok_or_else(|| ValidationError::invalid(PROVIDER, "url"))?;

        let method = match settings.method.as_deref().map(str::to_ascii_uppercase) {
            None => Method::POST,
            Some(m) if m == "POST" => Method::POST,
            Some(m) if m == "PUT" => Method::PUT,
            Some(_) => return Err(ValidationError::invalid(PROVIDER, "method")),
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &settings.headers {
            insert_header(&mut headers, name, value)?;
        }

        let mut basic = None;
        match settings.auth {
            Some(WebhookAuth::Bearer { token }) => {
                let bearer = SecretString::new(format!("Bearer {}", token.expose_secret()));
                insert_header(&mut headers, AUTHORIZATION.as_str(), &bearer)?;
            }
            Some(WebhookAuth::Header { name, value }) => {
                insert_header(&mut headers, &name, &value)?;
            }
            Some(WebhookAuth::Basic { username, password }) => {
                basic = Some((username, password));
            }
            None => {}
        }

        Ok(Self {
            client: ctx.http.clone(),
            url: SecretString::new(url.to_string()),
            method,
            headers,
            basic,
            timeout: ctx.timeout,
        })
    }

    /// Request body for an event.
    pub fn build_payload(&self, event: &NotificationEvent) -> Value {
        let message = render::render(event);
        let mut payload = json!({
            "type": event.event_type(),
            "timestamp": event.timestamp.to_rfc3339(),
            "title": message.title,
            "message": message.plain_text(),
            "severity": event.severity(),
            "event": event,
        });
        if let Some(url) = event.url() {
            payload["url"] = json!(url);
        }
        payload
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let payload = self.build_payload(event);
        let mut request = self
            .client
            .request(self.method.clone(), self.url.expose_secret())
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .json(&payload);
        if let Some((username, password)) = &self.basic {
            request = request.basic_auth(username, Some(password.expose_secret()));
        }
        http::execute(request).await
    }
}

fn insert_header(
    headers: &mut HeaderMap,
    name: &str,
    value: &SecretString,
) -> Result<(), ValidationError> {
    let header_name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| ValidationError::invalid(PROVIDER, format!("header name: {}", name)))?;
    let mut header_value = HeaderValue::from_str(value.expose_secret())
        .map_err(|_| ValidationError::invalid(PROVIDER, format!("header value for {}", name)))?;
    header_value.set_sensitive(true);
    headers.insert(header_name, header_value);
    Ok(())
}
