//! Templated email fan-out to a selected cohort with bounded concurrency.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::http::{Classify, ErrorClass};
use crate::notify::{EmailEnvelope, Mailer, Recipient};
use crate::validation::is_email;
use crate::workflows::recovery::FailedEntry;

/// Per-recipient outcome of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: Vec<FailedEntry>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("subject should not be empty")]
    MissingSubject,
    #[error("email template '{0}' does not exist")]
    UnknownTemplate(String),
    #[error("at least one recipient is required")]
    NoRecipients,
    #[error("template data must be a JSON object")]
    InvalidData,
}

impl Classify for BroadcastError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}

/// One message body sent to every recipient, personalised with their name and email.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub subject: String,
    pub template: String,
    pub data: Option<Value>,
}

pub struct Broadcaster {
    mailer: Arc<dyn Mailer>,
    concurrency: usize,
}

impl Broadcaster {
    pub fn new(mailer: Arc<dyn Mailer>, concurrency: usize) -> Self {
        Self {
            mailer,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn dispatch(
        &self,
        broadcast: &Broadcast,
        recipients: Vec<Recipient>,
    ) -> Result<DispatchReport, BroadcastError> {
        if broadcast.subject.trim().is_empty() {
            return Err(BroadcastError::MissingSubject);
        }
        if !self.mailer.has_template(&broadcast.template) {
            return Err(BroadcastError::UnknownTemplate(broadcast.template.clone()));
        }
        let base = match &broadcast.data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(BroadcastError::InvalidData),
        };

        let mut report = DispatchReport {
            total: recipients.len(),
            ..DispatchReport::default()
        };
        let mut deliverable = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            if is_email(&recipient.email) {
                deliverable.push(recipient);
            } else {
                report.failed.push(FailedEntry {
                    email: recipient.email,
                    error: "Invalid email address".to_string(),
                });
            }
        }

        let results: Vec<(String, Result<(), String>)> = stream::iter(deliverable)
            .map(|recipient| {
                let data = personalise(&base, &recipient);
                let envelope = EmailEnvelope::new(recipient.email.clone(), broadcast.subject.clone())
                    .tag("email_type", "broadcast")
                    .tag("template", &broadcast.template);
                async move {
                    let outcome = self
                        .mailer
                        .send_templated(&broadcast.template, data, envelope)
                        .await
                        .map(|_| ())
                        .map_err(|err| err.to_string());
                    (recipient.email, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (email, outcome) in results {
            match outcome {
                Ok(()) => report.sent += 1,
                Err(error) => {
                    warn!(email = %email, error = %error, "broadcast delivery failed");
                    report.failed.push(FailedEntry { email, error });
                }
            }
        }
        info!(
            template = %broadcast.template,
            sent = report.sent,
            failed = report.failed.len(),
            total = report.total,
            "broadcast finished"
        );
        Ok(report)
    }
}

fn personalise(base: &Map<String, Value>, recipient: &Recipient) -> Value {
    let mut data = base.clone();
    if !recipient.name.is_empty() {
        data.insert("name".to_string(), Value::String(recipient.name.clone()));
    }
    data.entry("email")
        .or_insert_with(|| Value::String(recipient.email.clone()));
    Value::Object(data)
}
