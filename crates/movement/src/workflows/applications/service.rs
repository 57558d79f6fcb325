use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission, Attachment,
    DocumentKind, DocumentMetadata, DuplicateField, DuplicateMatch, GrantRecord,
    InsertOutcome, IntakeAttachments, MotivationRecord,
};
use super::repository::ApplicationRepository;
use super::validation::{check_attachment, normalize, validate_submission, AttachmentViolation};
use crate::http::{Classify, ErrorClass};
use crate::notify::{templates, EmailEnvelope, Mailer};
use crate::storage::{secure_file_name, DocumentStorage, DocumentUpload, StorageError};
use crate::store::RepositoryError;
use crate::validation::ValidationError;

const MAX_ID_ATTEMPTS: usize = 5;

/// Knobs for the intake pipeline.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub max_attachment_bytes: usize,
    pub programs_reply_to: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_attachment_bytes: 5 * 1024 * 1024,
            programs_reply_to: "programs@sugria.com".to_string(),
        }
    }
}

/// Service composing validation, duplicate detection, uploads, and persistence.
pub struct ApplicationIntakeService<R> {
    repository: Arc<R>,
    storage: Arc<dyn DocumentStorage>,
    mailer: Arc<dyn Mailer>,
    config: IntakeConfig,
}

impl<R> ApplicationIntakeService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        storage: Arc<dyn DocumentStorage>,
        mailer: Arc<dyn Mailer>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            repository,
            storage,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Run a submission through every intake step, returning the persisted application.
    pub async fn submit(
        &self,
        submission: ApplicationSubmission,
        attachments: IntakeAttachments,
    ) -> Result<ApplicationRecord, IntakeError> {
        let (budget, identity) = match (attachments.budget, attachments.identity) {
            (Some(budget), Some(identity)) => (budget, identity),
            _ => return Err(IntakeError::MissingFiles),
        };
        check_attachment(DocumentKind::Budget, &budget, self.config.max_attachment_bytes)?;
        check_attachment(DocumentKind::Identity, &identity, self.config.max_attachment_bytes)?;

        let submission = normalize(submission);
        validate_submission(&submission)?;

        if let Some(duplicate) = self.repository.find_duplicate(&submission.personal)? {
            return Err(IntakeError::duplicate(duplicate));
        }

        let application_id = self.allocate_id()?;
        let folder = format!("applications/{application_id}");
        let (budget_file, identity_file) = tokio::try_join!(
            self.store_document(&application_id, &folder, DocumentKind::Budget, &budget),
            self.store_document(&application_id, &folder, DocumentKind::Identity, &identity),
        )?;

        let now = Utc::now();
        let ApplicationSubmission {
            program,
            personal,
            farm,
            grant,
            training,
            motivation,
            declaration,
        } = submission;
        let record = ApplicationRecord {
            application_id: application_id.clone(),
            status: ApplicationStatus::Pending,
            submitted_at: now,
            updated_at: now,
            program,
            personal,
            farm,
            grant: GrantRecord {
                outcomes: grant.outcomes,
                budget_file,
            },
            training,
            motivation: MotivationRecord {
                statement: motivation.statement,
                implementation: motivation.implementation,
                identity_file,
            },
            declaration,
        };

        let stored = match self.repository.insert(record) {
            Ok(InsertOutcome::Created(stored)) => stored,
            Ok(InsertOutcome::Duplicate(duplicate)) => {
                warn!(
                    application_id = %application_id,
                    existing = %duplicate.application_id,
                    "duplicate detected at write time; uploaded documents are orphaned"
                );
                return Err(IntakeError::duplicate(duplicate));
            }
            Err(err) => {
                error!(application_id = %application_id, error = %err, "application write failed");
                return Err(IntakeError::ApplicationCreationFailed);
            }
        };

        info!(
            application_id = %stored.application_id,
            category = %stored.program.category,
            "application submitted"
        );
        self.send_confirmation(&stored).await;
        Ok(stored)
    }

    fn allocate_id(&self) -> Result<ApplicationId, IntakeError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = ApplicationId::generate(Utc::now());
            if !self.repository.exists(&candidate)? {
                return Ok(candidate);
            }
            warn!(candidate = %candidate, "application id collision, regenerating");
        }
        error!("could not allocate a free application id");
        Err(IntakeError::ApplicationCreationFailed)
    }

    async fn store_document(
        &self,
        application_id: &ApplicationId,
        folder: &str,
        kind: DocumentKind,
        attachment: &Attachment,
    ) -> Result<DocumentMetadata, IntakeError> {
        let file_name = secure_file_name(
            application_id.as_str(),
            &attachment.file_name,
            &attachment.extension(),
        );
        let upload = DocumentUpload {
            folder: folder.to_string(),
            file_name,
            content_type: attachment.content_type.clone(),
            bytes: attachment.bytes.clone(),
        };
        let stored = self.storage.upload(upload).await.map_err(|err: StorageError| {
            error!(
                application_id = %application_id,
                document = kind.label(),
                error = %err,
                "document upload failed"
            );
            IntakeError::UploadFailed(kind)
        })?;
        Ok(DocumentMetadata {
            url: stored.url,
            file_name: attachment.file_name.clone(),
            size: attachment.size() as u64,
            mime_type: attachment.content_type.clone(),
        })
    }

    async fn send_confirmation(&self, record: &ApplicationRecord) {
        let data = json!({
            "name": record.personal.full_name,
            "applicationId": record.application_id,
            "category": record.program.category,
            "email": record.personal.email,
            "year": Utc::now().year(),
        });
        let envelope = EmailEnvelope::new(
            record.personal.email.clone(),
            "SUGRiA Program Application Received",
        )
        .reply_to(self.config.programs_reply_to.clone())
        .tag("email_type", "application_confirmation")
        .tag("application_id", record.application_id.as_str());

        if let Err(err) = self
            .mailer
            .send_templated(templates::APPLICATION_CONFIRMATION, data, envelope)
            .await
        {
            warn!(
                application_id = %record.application_id,
                error = %err,
                "confirmation email failed"
            );
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Both budget and identity files are required")]
    MissingFiles,
    #[error(transparent)]
    InvalidAttachment(#[from] AttachmentViolation),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("malformed application form: {0}")]
    MalformedForm(String),
    #[error(
        "An application with this {} already exists (application {application_id}, {category} program)",
        field.label()
    )]
    DuplicateApplication {
        field: DuplicateField,
        application_id: ApplicationId,
        category: String,
    },
    #[error("Failed to upload {} document", .0.label())]
    UploadFailed(DocumentKind),
    #[error("Failed to create application")]
    ApplicationCreationFailed,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntakeError {
    fn duplicate(found: DuplicateMatch) -> Self {
        IntakeError::DuplicateApplication {
            field: found.field,
            application_id: found.application_id,
            category: found.category,
        }
    }
}

impl Classify for IntakeError {
    fn class(&self) -> ErrorClass {
        match self {
            IntakeError::MissingFiles
            | IntakeError::InvalidAttachment(_)
            | IntakeError::Invalid(_)
            | IntakeError::MalformedForm(_)
            | IntakeError::ApplicationCreationFailed => ErrorClass::Validation,
            IntakeError::DuplicateApplication { .. } => ErrorClass::Conflict,
            IntakeError::UploadFailed(_) => ErrorClass::Upstream,
            IntakeError::Repository(_) => ErrorClass::Internal,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            IntakeError::DuplicateApplication {
                field,
                application_id,
                category,
            } => Some(json!({
                "field": field.label(),
                "applicationId": application_id,
                "category": category,
            })),
            IntakeError::Invalid(err) => Some(json!({ "field": err.field })),
            _ => None,
        }
    }
}
