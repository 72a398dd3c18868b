//! Email channel over SMTP.

use crate::delivery::{DeliveryError, ErrorCode};
use crate::error::ValidationError;
use crate::render::{self, Message as Rendered};
use crate::traits::{parse_settings, ProviderContext, ProviderFactory, Transport};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::{Map, Value};
use statuspulse_core::{NotificationEvent, SecretString};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "Email";

/// Connection security for the SMTP session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    Tls,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    Starttls,
    /// Unencrypted. Only for local relays.
    None,
}

impl SmtpSecurity {
    fn default_port(&self) -> u16 {
        match self {
            Self::Tls => 465,
            Self::Starttls => 587,
            Self::None => 25,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SmtpSettings {
    host: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    security: SmtpSecurity,
    username: Option<String>,
    password: Option<SecretString>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailSettings {
    #[serde(default)]
    smtp: SmtpSettings,
    from: Option<String>,
    #[serde(default)]
    to: Vec<String>,
    subject_prefix: Option<String>,
}

/// Factory for the `email` channel type.
#[derive(Debug, Default)]
pub struct EmailFactory;

impl ProviderFactory for EmailFactory {
    fn channel_type(&self) -> &str {
        "email"
    }

    fn create(
        &self,
        ctx: &ProviderContext,
        settings: &Map<String, Value>,
    ) -> Result<Box<dyn Transport>, ValidationError> {
        Ok(Box::new(EmailTransport::new(ctx, settings)?))
    }
}

/// SMTP transport.
pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject_prefix: Option<String>,
}

impl EmailTransport {
    pub fn new(ctx: &ProviderContext, settings: &Map<String, Value>) -> Result<Self, ValidationError> {
        let settings: EmailSettings = parse_settings(PROVIDER, settings)?;

        let host = settings
            .smtp
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ValidationError::required(PROVIDER, "smtp.host"))?;

        let from = settings
            .from
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| ValidationError::required(PROVIDER, "from"))
            .and_then(parse_mailbox)?;

        if settings.to.iter().all(|t| t.trim().is_empty()) {
            return Err(ValidationError::required(PROVIDER, "to"));
        }
        let to = settings
            .to
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| parse_mailbox(t))
            .collect::<Result<Vec<_>, _>>()?;

        let security = settings.smtp.security;
        let builder = match security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            SmtpSecurity::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            SmtpSecurity::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        }
        .map_err(|_| ValidationError::invalid(PROVIDER, "smtp.host"))?;

        let mut builder = builder
            .port(settings.smtp.port.unwrap_or_else(|| security.default_port()))
            .timeout(Some(ctx.timeout));
        if let Some(username) = settings.smtp.username.filter(|u| !u.is_empty()) {
            let password = settings
                .smtp
                .password
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
            to,
            subject_prefix: settings.subject_prefix.filter(|p| !p.trim().is_empty()),
        })
    }

    /// Subject line for a rendered event.
    fn subject(&self, rendered: &Rendered) -> String {
        match &self.subject_prefix {
            Some(prefix) => format!("{} {}", prefix.trim(), rendered.summary()),
            None => rendered.summary(),
        }
    }

    /// Build the MIME message for an event.
    pub fn build_message(&self, event: &NotificationEvent) -> Result<Message, DeliveryError> {
        let rendered = render::render(event);

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject(&rendered))
            .date(event.timestamp.into());
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                rendered.plain_text(),
                html_body(&rendered),
            ))
            .map_err(|e| DeliveryError::invalid_payload(e.to_string()))
    }
}

#[async_trait]
impl Transport for EmailTransport {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let message = self.build_message(event)?;
        let response = self.mailer.send(message).await.map_err(from_smtp)?;
        debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ValidationError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|_| ValidationError::invalid(PROVIDER, format!("address: {}", address.trim())))
}

fn from_smtp(error: lettre::transport::smtp::Error) -> DeliveryError {
    let message = error.to_string();
    if error.is_permanent() {
        DeliveryError::new(ErrorCode::Rejected, message, false)
    } else if error.is_transient() {
        DeliveryError::new(ErrorCode::ServerError, message, true)
    } else if error.is_timeout() {
        DeliveryError::new(ErrorCode::Timeout, message, true)
    } else {
        DeliveryError::network(message)
    }
}

fn html_body(rendered: &Rendered) -> String {
    let mut html = format!(
        "<h2>{}</h2>\n<p><strong>{}</strong></p>\n",
        escape_html(&rendered.heading),
        escape_html(&rendered.title)
    );
    if let Some(body) = &rendered.body {
        html.push_str(&format!("<p>{}</p>\n", escape_html(body).replace('\n', "<br>")));
    }
    if !rendered.fields.is_empty() {
        html.push_str("<table>\n");
        for field in &rendered.fields {
            html.push_str(&format!(
                "<tr><th align=\"left\">{}</th><td>{}</td></tr>\n",
                escape_html(field.name),
                escape_html(&field.value)
            ));
        }
        html.push_str("</table>\n");
    }
    if let Some(url) = &rendered.url {
        html.push_str(&format!(
            "<p><a href=\"{}\">View details</a></p>\n",
            escape_html(url)
        ));
    }
    html.push_str(&format!(
        "<p><small>statuspulse · {}</small></p>",
        render::format_time(&rendered.timestamp)
    ));
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
