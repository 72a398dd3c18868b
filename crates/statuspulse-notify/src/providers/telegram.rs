//! Telegram Bot API channel.
//!
//! Sends `sendMessage` requests with the event rendered in one of
//! Telegram's markup modes. User-supplied text is escaped for the chosen
//! mode so titles like `[API] outage` cannot break the markup.

use super::require_secret;
use crate::delivery::DeliveryError;
use crate::error::ValidationError;
use crate::http;
use crate::render::{self, Message};
use crate::traits::{parse_settings, ProviderContext, ProviderFactory, Transport};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use statuspulse_core::{NotificationEvent, SecretString, Severity};
use std::time::Duration;
use url::Url;

const PROVIDER: &str = "Telegram";
const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const TOKEN_PATTERN: &str = r"^\d+:[A-Za-z0-9_-]+$";

/// Maximum message length accepted by the Bot API.
pub const MESSAGE_LIMIT: usize = 4096;
const TRUNCATION_SUFFIX: &str = "\n\n[truncated]";

/// Telegram markup mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
            Self::MarkdownV2 => "MarkdownV2",
            Self::Html => "HTML",
        }
    }

    /// Escape text so it renders literally outside an entity.
    pub fn escape(&self, text: &str) -> String {
        let specials: &[char] = match self {
            Self::Markdown => &['_', '*', '`', '['],
            Self::MarkdownV2 => &[
                '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}',
                '.', '!', '\\',
            ],
            Self::Html => {
                return text
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;")
            }
        };

        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if specials.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    fn bold(&self, text: &str) -> String {
        match self {
            // Legacy Markdown has no escapes inside an entity.
            Self::Markdown => format!("*{}*", text.replace('*', "")),
            Self::MarkdownV2 => format!("*{}*", self.escape(text)),
            Self::Html => format!("<b>{}</b>", self.escape(text)),
        }
    }

    /// Event title line. Legacy Markdown keeps user text outside the bold
    /// entity so it can still be escaped.
    fn title(&self, text: &str) -> String {
        match self {
            Self::Markdown => self.escape(text),
            Self::MarkdownV2 | Self::Html => self.bold(text),
        }
    }

    fn link(&self, text: &str, url: &str) -> String {
        match self {
            Self::Markdown => format!("[{}]({})", self.escape(text), url),
            Self::MarkdownV2 => format!(
                "[{}]({})",
                self.escape(text),
                url.replace('\\', "\\\\").replace(')', "\\)")
            ),
            Self::Html => format!(
                "<a href=\"{}\">{}</a>",
                url.replace('&', "&amp;").replace('"', "&quot;"),
                self.escape(text)
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatId {
    Text(String),
    Number(i64),
}

impl ChatId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelegramSettings {
    bot_token: Option<SecretString>,
    chat_id: Option<ChatId>,
    #[serde(default)]
    parse_mode: ParseMode,
    api_base_url: Option<String>,
    silent_below: Option<Severity>,
    #[serde(default)]
    disable_web_page_preview: bool,
}

/// Factory for the `telegram` channel type.
#[derive(Debug, Default)]
pub struct TelegramFactory;

impl ProviderFactory for TelegramFactory {
    fn channel_type(&self) -> &str {
        "telegram"
    }

    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError> {
        Ok(Box::new(TelegramTransport::new(ctx, settings)?))
    }
}

/// Telegram `sendMessage` transport.
pub struct TelegramTransport {
    client: reqwest::Client,
    /// Full `sendMessage` URL; contains the bot token.
    endpoint: SecretString,
    timeout: Duration,
    chat_id: String,
    parse_mode: ParseMode,
    silent_below: Option<Severity>,
    disable_web_page_preview: bool,
}

impl TelegramTransport {
    pub fn new(ctx: &ProviderContext, settings: &Map<String, Value>) -> Result<Self, ValidationError> {
        let settings: TelegramSettings = parse_settings(PROVIDER, settings)?;

        let token = require_secret(PROVIDER, "botToken", &settings.bot_token)?;
        let token = token.expose_secret().trim();
        let well_formed = Regex::new(TOKEN_PATTERN)
            .map(|re| re.is_match(token))
            .unwrap_or(false);
        if !well_formed {
            return Err(ValidationError::invalid(PROVIDER, "bot token"));
        }

        let chat_id = settings
            .chat_id
            .map(ChatId::into_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ValidationError::required(PROVIDER, "chatId"))?;

        let base = settings
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        let base_ok = Url::parse(base)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !base_ok {
            return Err(ValidationError::invalid(PROVIDER, "apiBaseUrl"));
        }

        Ok(Self {
            client: ctx.http.clone(),
            endpoint: SecretString::new(format!("{}/bot{}/sendMessage", base, token)),
            timeout: ctx.timeout,
            chat_id,
            parse_mode: settings.parse_mode,
            silent_below: settings.silent_below,
            disable_web_page_preview: settings.disable_web_page_preview,
        })
    }

    /// Message text for an event, escaped and truncated.
    ///
    /// An over-long body is cut before escaping, so the cut never splits an
    /// escape sequence or entity and the fields and link still follow it.
    pub fn render_text(&self, event: &NotificationEvent) -> String {
        let mode = self.parse_mode;
        let message = render::render(event);
        let body = message.body.as_deref().map(|b| mode.escape(b));
        let text = self.layout(&message, body.as_deref());
        if text.chars().count() <= MESSAGE_LIMIT {
            return text;
        }

        let suffix = mode.escape(TRUNCATION_SUFFIX);
        if let Some(raw) = &message.body {
            // Two newlines join the blank line and the body into the layout.
            let fixed = self.layout(&message, None).chars().count() + 2 + suffix.chars().count();
            if fixed < MESSAGE_LIMIT {
                let mut body = escape_prefix(mode, raw, MESSAGE_LIMIT - fixed);
                body.push_str(&suffix);
                return self.layout(&message, Some(&body));
            }
        }
        truncate_message(mode, &text, MESSAGE_LIMIT)
    }

    fn layout(&self, message: &Message, body: Option<&str>) -> String {
        let mode = self.parse_mode;
        let mut lines = vec![
            mode.bold(&message.decorated_heading()),
            mode.title(&message.title),
        ];

        if let Some(body) = body {
            lines.push(String::new());
            lines.push(body.to_string());
        }

        if !message.fields.is_empty() {
            lines.push(String::new());
            for field in &message.fields {
                lines.push(format!(
                    "{}: {}",
                    mode.escape(field.name),
                    mode.escape(&field.value)
                ));
            }
        }

        if let Some(url) = &message.url {
            lines.push(String::new());
            lines.push(mode.link("View details", url));
        }

        lines.join("\n")
    }

    /// Request body for an event.
    pub fn build_payload(&self, event: &NotificationEvent) -> Value {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": self.render_text(event),
            "parse_mode": self.parse_mode.as_str(),
        });

        if let Some(threshold) = self.silent_below {
            if event.severity() < threshold {
                payload["disable_notification"] = json!(true);
            }
        }
        if self.disable_web_page_preview {
            payload["disable_web_page_preview"] = json!(true);
        }
        payload
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let payload = self.build_payload(event);
        let request = self
            .client
            .post(self.endpoint.expose_secret())
            .timeout(self.timeout)
            .json(&payload);
        http::execute(request).await
    }
}

/// Escaped form of the longest prefix of `text` that fits in `budget` chars.
fn escape_prefix(mode: ParseMode, text: &str, budget: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let escaped = mode.escape(c.encode_utf8(&mut buf));
        let len = escaped.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        out.push_str(&escaped);
    }
    out
}

/// Hard cut of already-escaped text, backing off so no escape sequence or
/// HTML entity is split.
fn truncate_message(mode: ParseMode, text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = mode.escape(TRUNCATION_SUFFIX);
    let budget = limit.saturating_sub(suffix.chars().count());
    let mut truncated: String = text.chars().take(budget).collect();

    match mode {
        ParseMode::Markdown | ParseMode::MarkdownV2 => {
            let trailing = truncated.chars().rev().take_while(|&c| c == '\\').count();
            if trailing % 2 == 1 {
                truncated.pop();
            }
        }
        ParseMode::Html => {
            if let Some(amp) = truncated.rfind('&') {
                if !truncated[amp..].contains(';') {
                    truncated.truncate(amp);
                }
            }
        }
    }
    truncated.push_str(&suffix);
    truncated
}
