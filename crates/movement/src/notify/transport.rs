use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::templates::TemplateError;

/// Provider tag; values are restricted to ASCII letters, digits, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailTag {
    pub name: String,
    pub value: String,
}

fn sanitize_tag(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Addressing for one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailEnvelope {
    pub to: String,
    pub subject: String,
    pub reply_to: Option<String>,
    pub tags: Vec<EmailTag>,
}

impl EmailEnvelope {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            reply_to: None,
            tags: Vec::new(),
        }
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    pub fn tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(EmailTag {
            name: sanitize_tag(name),
            value: sanitize_tag(value),
        });
        self
    }
}

/// Envelope plus rendered body, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub from: String,
    pub envelope: EmailEnvelope,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailReceipt {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("email provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("email transport failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Transport(err.to_string())
    }
}

/// Delivery backend for rendered messages.
#[async_trait::async_trait]
pub trait EmailTransport: Send + Sync {
    async fn deliver(&self, email: &RenderedEmail) -> Result<EmailReceipt, MailError>;
    /// Latest provider event for a delivered message, if the provider reports one.
    async fn last_event(&self, provider_id: &str) -> Result<Option<String>, MailError>;
}

/// Development transport that logs instead of sending.
#[derive(Debug, Default, Clone)]
pub struct LogTransport;

#[async_trait::async_trait]
impl EmailTransport for LogTransport {
    async fn deliver(&self, email: &RenderedEmail) -> Result<EmailReceipt, MailError> {
        let id = format!("dev-{}", uuid::Uuid::new_v4());
        info!(
            id = %id,
            from = %email.from,
            to = %email.envelope.to,
            subject = %email.envelope.subject,
            "email delivery skipped (log transport)"
        );
        debug!(html = %email.html, "rendered email body");
        Ok(EmailReceipt { id })
    }

    async fn last_event(&self, _provider_id: &str) -> Result<Option<String>, MailError> {
        Ok(None)
    }
}

#[derive(Debug, Serialize)]
struct ResendSendBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a [EmailTag],
}

fn no_tags(tags: &&[EmailTag]) -> bool {
    tags.is_empty()
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailDetails {
    last_event: Option<String>,
}

/// Resend HTTP API transport.
#[derive(Debug, Clone)]
pub struct ResendTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ResendTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, MailError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn rejection(response: reqwest::Response) -> MailError {
        let status = response.status().as_u16();
        let message = response
            .json::<ResendErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| "no error body".to_string());
        MailError::Rejected { status, message }
    }
}

#[async_trait::async_trait]
impl EmailTransport for ResendTransport {
    async fn deliver(&self, email: &RenderedEmail) -> Result<EmailReceipt, MailError> {
        let body = ResendSendBody {
            from: &email.from,
            to: [email.envelope.to.as_str()],
            subject: &email.envelope.subject,
            html: &email.html,
            reply_to: email.envelope.reply_to.as_deref(),
            tags: &email.envelope.tags,
        };
        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let err = Self::rejection(response).await;
            warn!(to = %email.envelope.to, error = %err, "resend rejected email");
            return Err(err);
        }
        let receipt: EmailReceipt = response.json().await?;
        debug!(id = %receipt.id, to = %email.envelope.to, "email sent");
        Ok(receipt)
    }

    async fn last_event(&self, provider_id: &str) -> Result<Option<String>, MailError> {
        let response = self
            .http
            .get(format!("{}/emails/{provider_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        let details: ResendEmailDetails = response.json().await?;
        Ok(details.last_event)
    }
}
