//! Recording and failing doubles for the outbound collaborators.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use serde_json::Value;

use crate::notify::{EmailEnvelope, EmailReceipt, MailError, Mailer, TemplateRegistry};
use crate::storage::{DocumentStorage, DocumentUpload, StorageError, StoredDocument};

#[derive(Debug, Clone)]
pub(crate) struct SentMail {
    pub template: String,
    pub data: Value,
    pub envelope: EmailEnvelope,
}

/// Mailer that records every message; addresses in `reject` fail delivery.
#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    reject: Vec<String>,
}

impl RecordingMailer {
    pub(crate) fn rejecting(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: addresses.iter().map(|address| address.to_string()).collect(),
        }
    }

    pub(crate) fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer mutex").clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send_templated(
        &self,
        template: &str,
        data: Value,
        envelope: EmailEnvelope,
    ) -> Result<EmailReceipt, MailError> {
        if !TemplateRegistry::with_defaults().contains(template) {
            return Err(crate::notify::TemplateError::Unknown(template.to_string()).into());
        }
        if self.reject.contains(&envelope.to) {
            return Err(MailError::Rejected {
                status: 422,
                message: format!("{} is not deliverable", envelope.to),
            });
        }
        let mut sent = self.sent.lock().expect("mailer mutex");
        sent.push(SentMail {
            template: template.to_string(),
            data,
            envelope,
        });
        Ok(EmailReceipt {
            id: format!("test-{}", sent.len()),
        })
    }

    fn has_template(&self, template: &str) -> bool {
        TemplateRegistry::with_defaults().contains(template)
    }
}

/// Mailer whose every delivery fails.
pub(crate) struct FailingMailer;

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send_templated(
        &self,
        _template: &str,
        _data: Value,
        _envelope: EmailEnvelope,
    ) -> Result<EmailReceipt, MailError> {
        Err(MailError::Transport("provider offline".to_string()))
    }

    fn has_template(&self, _template: &str) -> bool {
        true
    }
}

/// In-memory document storage keyed by `memory://folder/file` urls.
#[derive(Default)]
pub(crate) struct MemoryStorage {
    files: Mutex<HashMap<String, (String, Bytes)>>,
}

impl MemoryStorage {
    pub(crate) fn uploads(&self) -> usize {
        self.files.lock().expect("storage mutex").len()
    }

    pub(crate) fn content_type(&self, url: &str) -> Option<String> {
        self.files
            .lock()
            .expect("storage mutex")
            .get(url)
            .map(|(content_type, _)| content_type.clone())
    }
}

#[async_trait::async_trait]
impl DocumentStorage for MemoryStorage {
    async fn upload(&self, document: DocumentUpload) -> Result<StoredDocument, StorageError> {
        let url = format!("memory://{}/{}", document.folder, document.file_name);
        self.files
            .lock()
            .expect("storage mutex")
            .insert(url.clone(), (document.content_type, document.bytes));
        Ok(StoredDocument { url })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError> {
        self.files
            .lock()
            .expect("storage mutex")
            .get(url)
            .map(|(_, bytes)| bytes.clone())
            .ok_or(StorageError::NotFound)
    }
}

/// Storage backend that rejects every request.
pub(crate) struct FailingStorage;

#[async_trait::async_trait]
impl DocumentStorage for FailingStorage {
    async fn upload(&self, _document: DocumentUpload) -> Result<StoredDocument, StorageError> {
        Err(StorageError::Backend("quota exceeded".to_string()))
    }

    async fn fetch(&self, _url: &str) -> Result<Bytes, StorageError> {
        Err(StorageError::Backend("quota exceeded".to_string()))
    }
}
