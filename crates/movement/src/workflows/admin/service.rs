use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::auth::{AccessToken, AdminAuthenticator, AuthError, LoginRequest, TokenIssuer};
use super::broadcast::{Broadcast, BroadcastError, Broadcaster, DispatchReport};
use super::repository::{DirectoryEntry, DirectoryKind, DirectoryRepository};
use crate::http::{Classify, ErrorClass};
use crate::notify::{
    EmailService, EmailTemplateRepository, Recipient, SyncReport, TemplateRecord, TrackedEmail,
};
use crate::paging::{Page, Paging};
use crate::settings::MembershipGate;
use crate::storage::DocumentStorage;
use crate::store::RepositoryError;
use crate::workflows::applications::{
    ApplicantCohort, ApplicationId, ApplicationQuery, ApplicationRecord, ApplicationRepository,
    ApplicationStatus, ApplicationSummary, DocumentKind, DocumentMetadata,
};
use crate::workflows::members::{
    MemberCohort, MemberQuery, MemberRecord, MemberRepository, MemberSummary,
};
use crate::workflows::recovery::RecoveryRepository;

/// Every store trait the admin surface reads from.
pub trait AdminStore:
    ApplicationRepository
    + MemberRepository
    + RecoveryRepository
    + DirectoryRepository
    + EmailTemplateRepository
{
}

impl<T> AdminStore for T where
    T: ApplicationRepository
        + MemberRepository
        + RecoveryRepository
        + DirectoryRepository
        + EmailTemplateRepository
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCounts {
    pub members: u64,
    pub applications: u64,
    pub pending_recoveries: u64,
}

/// Body of `POST /email/members` and `POST /email/applicants`.
#[derive(Debug, Clone, Deserialize)]
pub struct CohortEmailRequest<F> {
    pub subject: String,
    pub template: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub filters: Option<F>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Addressees {
    One(String),
    Many(Vec<String>),
}

impl Addressees {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Addressees::One(address) => vec![address],
            Addressees::Many(addresses) => addresses,
        }
    }
}

/// Body of `POST /email/send-bulk`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailRequest {
    pub to: Addressees,
    pub subject: String,
    pub template_name: String,
    #[serde(default)]
    pub template_data: Option<Value>,
}

/// Stored document together with its bytes.
#[derive(Debug, Clone)]
pub struct DocumentDownload {
    pub metadata: DocumentMetadata,
    pub bytes: Bytes,
}

/// Outbound collaborators of the admin surface.
pub struct AdminCollaborators {
    pub auth: Arc<AdminAuthenticator>,
    pub storage: Arc<dyn DocumentStorage>,
    pub email: Arc<EmailService>,
    pub broadcaster: Broadcaster,
    pub gate: MembershipGate,
}

pub struct AdminService<R> {
    repository: Arc<R>,
    auth: Arc<AdminAuthenticator>,
    storage: Arc<dyn DocumentStorage>,
    email: Arc<EmailService>,
    broadcaster: Broadcaster,
    gate: MembershipGate,
}

impl<R> AdminService<R>
where
    R: AdminStore + 'static,
{
    pub fn new(repository: Arc<R>, collaborators: AdminCollaborators) -> Self {
        Self {
            repository,
            auth: collaborators.auth,
            storage: collaborators.storage,
            email: collaborators.email,
            broadcaster: collaborators.broadcaster,
            gate: collaborators.gate,
        }
    }

    pub fn issuer(&self) -> Arc<TokenIssuer> {
        self.auth.issuer()
    }

    pub fn login(&self, request: &LoginRequest) -> Result<AccessToken, AdminError> {
        Ok(self.auth.login(request)?)
    }

    pub fn members(
        &self,
        query: &MemberQuery,
        paging: Paging,
    ) -> Result<Page<MemberSummary>, AdminError> {
        Ok(MemberRepository::search(&*self.repository, query, paging)?)
    }

    pub fn member(&self, id: i64) -> Result<MemberRecord, AdminError> {
        MemberRepository::fetch(&*self.repository, id)?.ok_or(AdminError::NotFound("Member"))
    }

    pub fn delete_member(&self, id: i64) -> Result<(), AdminError> {
        MemberRepository::delete(&*self.repository, id).map_err(|err| not_found(err, "Member"))?;
        info!(member_id = id, "member deleted");
        Ok(())
    }

    pub fn applications(
        &self,
        query: &ApplicationQuery,
        paging: Paging,
    ) -> Result<Page<ApplicationSummary>, AdminError> {
        Ok(ApplicationRepository::search(&*self.repository, query, paging)?)
    }

    pub fn application(&self, id: &ApplicationId) -> Result<ApplicationRecord, AdminError> {
        ApplicationRepository::fetch(&*self.repository, id)?
            .ok_or(AdminError::NotFound("Application"))
    }

    pub fn set_application_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, AdminError> {
        let record = self
            .repository
            .set_status(id, status)
            .map_err(|err| not_found(err, "Application"))?;
        info!(application_id = %id, status = status.label(), "application status updated");
        Ok(record)
    }

    pub fn delete_application(&self, id: &ApplicationId) -> Result<(), AdminError> {
        ApplicationRepository::delete(&*self.repository, id)
            .map_err(|err| not_found(err, "Application"))?;
        info!(application_id = %id, "application deleted");
        Ok(())
    }

    pub async fn document(
        &self,
        id: &ApplicationId,
        kind: DocumentKind,
    ) -> Result<DocumentDownload, AdminError> {
        let record = self.application(id)?;
        let metadata = record.document(kind).clone();
        let bytes = self.storage.fetch(&metadata.url).await.map_err(|err| {
            error!(application_id = %id, document = kind.label(), error = %err, "document fetch failed");
            AdminError::DocumentUnavailable
        })?;
        Ok(DocumentDownload { metadata, bytes })
    }

    pub fn directory(
        &self,
        kind: DirectoryKind,
        search: Option<&str>,
        paging: Paging,
    ) -> Result<Page<DirectoryEntry>, AdminError> {
        Ok(self.repository.directory(kind, search, paging)?)
    }

    pub fn counts(&self) -> Result<RecordCounts, AdminError> {
        Ok(RecordCounts {
            members: MemberRepository::count(&*self.repository)?,
            applications: ApplicationRepository::count(&*self.repository)?,
            pending_recoveries: self.repository.count_pending()?,
        })
    }

    pub async fn email_members(
        &self,
        request: CohortEmailRequest<MemberCohort>,
    ) -> Result<DispatchReport, AdminError> {
        let today = Utc::now().date_naive();
        let filters = request.filters.unwrap_or_default();
        let recipients = MemberRepository::recipients(&*self.repository, &filters, today)?;
        self.broadcast(request.subject, request.template, request.data, recipients)
            .await
    }

    pub async fn email_applicants(
        &self,
        request: CohortEmailRequest<ApplicantCohort>,
    ) -> Result<DispatchReport, AdminError> {
        let filters = request.filters.unwrap_or_default();
        let recipients = ApplicationRepository::recipients(&*self.repository, &filters)?;
        self.broadcast(request.subject, request.template, request.data, recipients)
            .await
    }

    pub async fn send_bulk(&self, request: BulkEmailRequest) -> Result<DispatchReport, AdminError> {
        let recipients: Vec<Recipient> = request
            .to
            .into_vec()
            .into_iter()
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .map(|email| Recipient {
                email,
                name: String::new(),
            })
            .collect();
        if recipients.is_empty() {
            return Err(BroadcastError::NoRecipients.into());
        }
        self.broadcast(
            request.subject,
            request.template_name,
            request.template_data,
            recipients,
        )
        .await
    }

    async fn broadcast(
        &self,
        subject: String,
        template: String,
        data: Option<Value>,
        recipients: Vec<Recipient>,
    ) -> Result<DispatchReport, AdminError> {
        let broadcast = Broadcast {
            subject,
            template,
            data,
        };
        Ok(self.broadcaster.dispatch(&broadcast, recipients).await?)
    }

    pub fn set_membership(&self, enabled: bool) -> Result<bool, AdminError> {
        self.gate.set_open(enabled)?;
        Ok(self.gate.is_open()?)
    }

    pub fn email_templates(&self) -> Result<Vec<TemplateRecord>, AdminError> {
        Ok(self.email.publish_templates(&*self.repository)?)
    }

    pub fn email_tracking(&self, paging: Paging) -> Result<Page<TrackedEmail>, AdminError> {
        Ok(self.email.tracked(paging)?)
    }

    pub async fn sync_email_tracking(&self, limit: usize) -> Result<SyncReport, AdminError> {
        Ok(self.email.sync_statuses(limit).await?)
    }
}

fn not_found(err: RepositoryError, entity: &'static str) -> AdminError {
    match err {
        RepositoryError::NotFound => AdminError::NotFound(entity),
        other => AdminError::Repository(other),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error("Document could not be retrieved from storage")]
    DocumentUnavailable,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl Classify for AdminError {
    fn class(&self) -> ErrorClass {
        match self {
            AdminError::Auth(err) => err.class(),
            AdminError::NotFound(_) => ErrorClass::NotFound,
            AdminError::Broadcast(err) => err.class(),
            AdminError::DocumentUnavailable => ErrorClass::Upstream,
            AdminError::Repository(_) => ErrorClass::Internal,
        }
    }
}
