use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::templates::TemplateRegistry;
use super::tracking::{
    EmailTemplateRepository, EmailTrackingRepository, NewTrackedEmail, TemplateRecord,
    TrackedEmail,
};
use super::transport::{EmailEnvelope, EmailReceipt, EmailTransport, MailError, RenderedEmail};
use crate::paging::{Page, Paging};
use crate::store::RepositoryError;

/// Seam used by the workflows to send templated mail.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_templated(
        &self,
        template: &str,
        data: Value,
        envelope: EmailEnvelope,
    ) -> Result<EmailReceipt, MailError>;

    fn has_template(&self, template: &str) -> bool;
}

/// Outcome of a tracking status sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Renders templates, hands them to the transport, and records each delivery.
pub struct EmailService {
    templates: TemplateRegistry,
    transport: Arc<dyn EmailTransport>,
    tracking: Arc<dyn EmailTrackingRepository>,
    from: String,
}

impl EmailService {
    pub fn new(
        templates: TemplateRegistry,
        transport: Arc<dyn EmailTransport>,
        tracking: Arc<dyn EmailTrackingRepository>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            templates,
            transport,
            tracking,
            from: from.into(),
        }
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Mirror the loaded templates into the store for the admin listing.
    pub fn publish_templates(
        &self,
        repository: &dyn EmailTemplateRepository,
    ) -> Result<Vec<TemplateRecord>, RepositoryError> {
        repository.sync_templates(&self.templates.entries())?;
        repository.templates()
    }

    pub fn tracked(&self, paging: Paging) -> Result<Page<TrackedEmail>, RepositoryError> {
        self.tracking.tracked(paging)
    }

    /// Pull the provider's latest event for every unsettled message.
    pub async fn sync_statuses(&self, limit: usize) -> Result<SyncReport, RepositoryError> {
        let pending = self.tracking.unsettled(limit)?;
        let mut report = SyncReport {
            checked: pending.len(),
            ..SyncReport::default()
        };
        for email in pending {
            match self.transport.last_event(&email.provider_id).await {
                Ok(Some(event)) if event != email.status => {
                    self.tracking.update_status(&email.provider_id, &event)?;
                    report.updated += 1;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(provider_id = %email.provider_id, error = %err, "status sync failed");
                    report.failed += 1;
                }
            }
        }
        debug!(?report, "email tracking sync finished");
        Ok(report)
    }
}

#[async_trait::async_trait]
impl Mailer for EmailService {
    async fn send_templated(
        &self,
        template: &str,
        data: Value,
        envelope: EmailEnvelope,
    ) -> Result<EmailReceipt, MailError> {
        let html = self.templates.render(template, &data)?;
        let email = RenderedEmail {
            from: self.from.clone(),
            envelope,
            html,
        };
        let receipt = self.transport.deliver(&email).await?;

        let tracked = NewTrackedEmail {
            provider_id: receipt.id.clone(),
            recipient: email.envelope.to.clone(),
            template: template.to_string(),
            subject: email.envelope.subject.clone(),
        };
        if let Err(err) = self.tracking.record_sent(tracked) {
            warn!(provider_id = %receipt.id, error = %err, "failed to record email tracking");
        }
        Ok(receipt)
    }

    fn has_template(&self, template: &str) -> bool {
        self.templates.contains(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::transport::LogTransport;
    use crate::store::SqliteStore;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedTransport {
        events: Mutex<Vec<Option<String>>>,
    }

    #[async_trait::async_trait]
    impl EmailTransport for ScriptedTransport {
        async fn deliver(&self, _email: &RenderedEmail) -> Result<EmailReceipt, MailError> {
            Ok(EmailReceipt {
                id: format!("re_{}", uuid::Uuid::new_v4()),
            })
        }

        async fn last_event(&self, _provider_id: &str) -> Result<Option<String>, MailError> {
            Ok(self.events.lock().expect("events mutex").pop().flatten())
        }
    }

    #[tokio::test]
    async fn send_records_tracking_row() {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let service = EmailService::new(
            TemplateRegistry::with_defaults(),
            Arc::new(LogTransport),
            store.clone(),
            "noreply@sugria.com",
        );

        let receipt = service
            .send_templated(
                "welcome-email",
                json!({ "name": "Ada", "workEmail": "ada.lovelace@sugria.com" }),
                EmailEnvelope::new("ada@example.com", "Welcome"),
            )
            .await
            .expect("sends");

        let page = service.tracked(Paging::default()).expect("tracked");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].provider_id, receipt.id);
        assert_eq!(page.items[0].status, "sent");
        assert_eq!(page.items[0].template, "welcome-email");
    }

    #[tokio::test]
    async fn unknown_template_is_an_error() {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let service = EmailService::new(
            TemplateRegistry::with_defaults(),
            Arc::new(LogTransport),
            store,
            "noreply@sugria.com",
        );
        let err = service
            .send_templated("missing", json!({}), EmailEnvelope::new("a@b.co", "x"))
            .await
            .expect_err("template missing");
        assert!(matches!(err, MailError::Template(_)));
    }

    #[tokio::test]
    async fn sync_applies_provider_events() {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let service = EmailService::new(
            TemplateRegistry::with_defaults(),
            Arc::new(ScriptedTransport {
                events: Mutex::new(vec![Some("delivered".to_string())]),
            }),
            store.clone(),
            "noreply@sugria.com",
        );
        service
            .send_templated(
                "custom-email",
                json!({ "name": "Ada", "content": "<p>Hello</p>" }),
                EmailEnvelope::new("ada@example.com", "News"),
            )
            .await
            .expect("sends");

        let report = service.sync_statuses(50).await.expect("sync");
        assert_eq!(report, SyncReport { checked: 1, updated: 1, failed: 0 });
        let page = service.tracked(Paging::default()).expect("tracked");
        assert_eq!(page.items[0].status, "delivered");

        let report = service.sync_statuses(50).await.expect("sync");
        assert_eq!(report.checked, 0);
    }
}
