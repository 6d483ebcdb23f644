//! Transactional email over HTTP.
//!
//! Posts a JSON message to a Brevo-compatible `smtp/email` endpoint.

use serde::Serialize;
use tracing::{debug, instrument};

use cubetime_core::config::EmailConfig;

use super::{EmailMessage, NotificationError, Notifier, SessionNotice};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    name: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
    attachment: Vec<Attachment>,
}

/// HTTP email client.
#[derive(Debug)]
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpMailer {
    /// Build a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::NotConfigured` if the API key or sender
    /// address is missing.
    pub fn from_config(
        config: &EmailConfig,
        http: reqwest::Client,
    ) -> Result<Self, NotificationError> {
        let api_key =
            non_blank(config.api_key.as_deref()).ok_or(NotificationError::NotConfigured)?;
        let sender_email =
            non_blank(config.sender_email.as_deref()).ok_or(NotificationError::NotConfigured)?;

        debug!(api_url = %config.api_url, sender = %sender_email, "Email client initialized");

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key,
            sender_email,
            sender_name: config.sender_name.clone(),
        })
    }

    fn build_body(&self, message: EmailMessage) -> SendEmailBody {
        SendEmailBody {
            sender: EmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![EmailAddress {
                email: message.to,
                name: None,
            }],
            subject: message.subject,
            html_content: message.html_content,
            text_content: message.text_content,
            attachment: vec![Attachment {
                name: message.attachment_name,
                content: message.attachment_content,
            }],
        }
    }

    /// Send a rendered message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let body = self.build_body(message);

        let resp = self
            .http
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(NotificationError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for HttpMailer {
    #[instrument(skip(self, notice), fields(session_id = %notice.session_id))]
    async fn notify_session_issued(&self, notice: &SessionNotice) -> Result<(), NotificationError> {
        self.send(notice.to_email()).await
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
