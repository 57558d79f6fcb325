use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{MemberField, MemberRecord, MemberRegistration};
use super::repository::{MemberProbe, MemberRepository};
use super::validation::prepare_member;
use crate::http::{Classify, ErrorClass};
use crate::notify::{templates, EmailEnvelope, Mailer};
use crate::settings::MembershipGate;
use crate::store::RepositoryError;
use crate::validation::ValidationError;

/// Organisation settings the member workflows need.
#[derive(Debug, Clone)]
pub struct MemberSettings {
    /// Domain used for generated work emails.
    pub domain: String,
    pub reply_to: String,
}

impl Default for MemberSettings {
    fn default() -> Self {
        Self {
            domain: "sugria.com".to_string(),
            reply_to: "support@sugria.com".to_string(),
        }
    }
}

/// Direct "join the movement" registration.
pub struct MemberService<R> {
    repository: Arc<R>,
    gate: MembershipGate,
    mailer: Arc<dyn Mailer>,
    settings: MemberSettings,
}

impl<R> MemberService<R>
where
    R: MemberRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        gate: MembershipGate,
        mailer: Arc<dyn Mailer>,
        settings: MemberSettings,
    ) -> Self {
        Self {
            repository,
            gate,
            mailer,
            settings,
        }
    }

    pub fn registration_open(&self) -> Result<bool, MemberServiceError> {
        Ok(self.gate.is_open()?)
    }

    pub async fn register(
        &self,
        registration: MemberRegistration,
    ) -> Result<MemberRecord, MemberServiceError> {
        if !self.gate.is_open()? {
            return Err(MemberServiceError::RegistrationClosed);
        }

        let (email, profile) = registration.split();
        let member = prepare_member(&email, profile, &self.settings.domain)?;

        let probe = MemberProbe {
            email: Some(&member.email),
            phone_number: &member.profile.phone_number,
            work_email: &member.work_email,
            exclude_email: None,
        };
        if let Some(field) = self.repository.find_conflict(&probe)? {
            return Err(MemberServiceError::DuplicateMember { field });
        }

        let record = self
            .repository
            .insert(member)
            .map_err(MemberServiceError::from_write)?;
        info!(member_id = record.id, work_email = %record.work_email, "member registered");

        self.send_welcome(&record).await;
        Ok(record)
    }

    async fn send_welcome(&self, record: &MemberRecord) {
        let data = json!({
            "name": record.full_name(),
            "workEmail": record.work_email,
        });
        let envelope = EmailEnvelope::new(
            record.email.clone(),
            "Welcome to the Sustainable Green Revolution in Africa (SUGRiA)",
        )
        .reply_to(self.settings.reply_to.clone())
        .tag("email_type", "welcome")
        .tag("user_id", &record.id.to_string());

        if let Err(err) = self
            .mailer
            .send_templated(templates::WELCOME, data, envelope)
            .await
        {
            warn!(member_id = record.id, error = %err, "welcome email failed");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MemberServiceError {
    #[error("Membership registration is currently closed")]
    RegistrationClosed,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Member with this {} already exists", field.label())]
    DuplicateMember { field: MemberField },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MemberServiceError {
    /// Unique-constraint failures on a member column become duplicates.
    pub fn from_write(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::Conflict(column) => match MemberField::from_column(column) {
                Some(field) => MemberServiceError::DuplicateMember { field },
                None => MemberServiceError::Repository(err),
            },
            _ => MemberServiceError::Repository(err),
        }
    }
}

impl Classify for MemberServiceError {
    fn class(&self) -> ErrorClass {
        match self {
            MemberServiceError::RegistrationClosed => ErrorClass::Forbidden,
            MemberServiceError::Invalid(_) => ErrorClass::Validation,
            MemberServiceError::DuplicateMember { .. } => ErrorClass::Conflict,
            MemberServiceError::Repository(_) => ErrorClass::Internal,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            MemberServiceError::Invalid(err) => Some(json!({ "field": err.field })),
            MemberServiceError::DuplicateMember { field } => {
                Some(json!({ "field": field.label() }))
            }
            _ => None,
        }
    }
}
