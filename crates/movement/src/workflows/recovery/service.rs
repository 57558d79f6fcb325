use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::domain::{
    BulkOutcome, InviteReport, RecoveryEntry, RecoveryKind, RecoveryRecord, RecoveryStatus,
    RecoveryToken, RecoveryView, TokenValidation,
};
use super::repository::RecoveryRepository;
use crate::http::{Classify, ErrorClass};
use crate::notify::{templates, EmailEnvelope, Mailer};
use crate::store::RepositoryError;
use crate::validation::{is_email, ValidationError};
use crate::workflows::members::{
    prepare_member, MemberField, MemberProbe, MemberProfile, MemberRecord, MemberRepository,
};

const STALE_INVITE: &str = "Recovery entry is no longer pending";

/// Settings for invite links and completion.
#[derive(Debug, Clone)]
pub struct RecoverySettings {
    /// Page that accepts `?token=`.
    pub link_base: String,
    pub domain: String,
    pub reply_to: String,
    pub concurrency: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            link_base: "https://www.sugria.com/update".to_string(),
            domain: "sugria.com".to_string(),
            reply_to: "support@sugria.com".to_string(),
            concurrency: 5,
        }
    }
}

/// One-time tokenized links that let lost member records be re-submitted.
pub struct RecoveryService<R> {
    repository: Arc<R>,
    mailer: Arc<dyn Mailer>,
    settings: RecoverySettings,
}

impl<R> RecoveryService<R>
where
    R: RecoveryRepository + MemberRepository + 'static,
{
    pub fn new(repository: Arc<R>, mailer: Arc<dyn Mailer>, settings: RecoverySettings) -> Self {
        Self {
            repository,
            mailer,
            settings,
        }
    }

    /// Creates a pending entry per valid email; every rejection is reported, none abort.
    pub fn bulk_create(&self, entries: Vec<RecoveryEntry>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        let mut seen = HashSet::new();

        for entry in entries {
            let email = entry.email.trim().to_lowercase();
            if !is_email(&email) {
                outcome.fail(entry.email, "Invalid email address");
                continue;
            }
            let Some(kind) = RecoveryKind::parse(&entry.kind) else {
                outcome.fail(email, RecoveryError::InvalidRecoveryType.to_string());
                continue;
            };
            if !seen.insert(email.clone()) {
                outcome.fail(email, "Email appears more than once in this batch");
                continue;
            }

            let token = RecoveryToken::generate();
            match self.repository.insert_recovery(&email, kind, &token) {
                Ok(record) => {
                    debug!(recovery_id = record.id, kind = kind.label(), "recovery entry created");
                    outcome.success.push(email);
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!(email = %email, "recovery entry already exists");
                    outcome.fail(email, "A recovery entry already exists for this email");
                }
                Err(err) => {
                    warn!(email = %email, error = %err, "failed to create recovery entry");
                    outcome.fail(email, "Failed to create recovery entry");
                }
            }
        }

        info!(
            created = outcome.success.len(),
            failed = outcome.failed.len(),
            "bulk recovery creation finished"
        );
        outcome
    }

    pub fn pending(&self) -> Result<Vec<RecoveryView>, RecoveryError> {
        let records = self.repository.pending(None)?;
        Ok(records.iter().map(RecoveryRecord::view).collect())
    }

    pub fn count_pending(&self) -> Result<u64, RecoveryError> {
        Ok(self.repository.count_pending()?)
    }

    /// Emails every pending entry, or only the listed ones when `emails` is non-empty.
    /// Only a delivered invite advances the entry.
    pub async fn send_invites(&self, emails: &[String]) -> Result<InviteReport, RecoveryError> {
        let filter: Option<Vec<String>> = (!emails.is_empty()).then(|| {
            emails
                .iter()
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect()
        });
        let pending = self.repository.pending(filter.as_deref())?;
        if pending.is_empty() {
            return Ok(InviteReport {
                success: Vec::new(),
                failed: Vec::new(),
                message: "No pending invites found to process".to_string(),
            });
        }
        info!(count = pending.len(), "sending recovery invites");

        let results: Vec<(String, Result<(), String>)> = stream::iter(pending)
            .map(|record| async move {
                let outcome = self.invite(&record).await;
                (record.email, outcome)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut outcome = BulkOutcome::default();
        for (email, result) in results {
            match result {
                Ok(()) => outcome.success.push(email),
                Err(error) => outcome.fail(email, error),
            }
        }
        let message = format!(
            "Successfully sent {} invites, {} failed",
            outcome.success.len(),
            outcome.failed.len()
        );
        Ok(InviteReport {
            success: outcome.success,
            failed: outcome.failed,
            message,
        })
    }

    async fn invite(&self, record: &RecoveryRecord) -> Result<(), String> {
        if !record.status.can_advance_to(RecoveryStatus::Invited) {
            return Err(STALE_INVITE.to_string());
        }
        let data = json!({ "recoveryLink": self.recovery_link(&record.token) });
        let envelope = EmailEnvelope::new(record.email.clone(), "Complete Your SUGRiA Profile")
            .reply_to(self.settings.reply_to.clone())
            .tag("email_type", "recovery")
            .tag("recovery_type", record.kind.label());

        if let Err(err) = self
            .mailer
            .send_templated(templates::RECOVERY, data, envelope)
            .await
        {
            warn!(recovery_id = record.id, error = %err, "recovery invite failed");
            return Err(err.to_string());
        }
        match self.repository.mark_invited(record.id) {
            Ok(()) => Ok(()),
            Err(RepositoryError::Stale) => Err(STALE_INVITE.to_string()),
            Err(err) => {
                warn!(recovery_id = record.id, error = %err, "failed to mark invite sent");
                Err("Invite sent but status could not be updated".to_string())
            }
        }
    }

    fn recovery_link(&self, token: &RecoveryToken) -> String {
        let separator = if self.settings.link_base.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{separator}token={}", self.settings.link_base, token.as_str())
    }

    fn live_record(&self, token: &str) -> Result<RecoveryRecord, RecoveryError> {
        let record = self
            .repository
            .find_by_token(token)?
            .ok_or(RecoveryError::InvalidToken)?;
        if !record.status.can_advance_to(RecoveryStatus::Recovered) {
            return Err(RecoveryError::TokenAlreadyUsed);
        }
        Ok(record)
    }

    pub fn validate(&self, token: &str) -> Result<TokenValidation, RecoveryError> {
        let record = self.live_record(token)?;
        Ok(TokenValidation {
            email: record.email,
            kind: record.kind,
        })
    }

    /// Upserts the member bound to the token's email and retires the token atomically.
    pub async fn complete(
        &self,
        token: &str,
        profile: MemberProfile,
    ) -> Result<MemberRecord, RecoveryError> {
        let record = self.live_record(token)?;
        if record.kind != RecoveryKind::JoinMovement {
            return Err(RecoveryError::InvalidRecoveryType);
        }

        let member = prepare_member(&record.email, profile, &self.settings.domain)?;
        let probe = MemberProbe {
            email: None,
            phone_number: &member.profile.phone_number,
            work_email: &member.work_email,
            exclude_email: Some(&member.email),
        };
        if let Some(field) = self.repository.find_conflict(&probe)? {
            return Err(RecoveryError::DuplicateMember { field });
        }

        let stored = self.repository.redeem(token, member).map_err(|err| match err {
            RepositoryError::Stale => RecoveryError::TokenAlreadyUsed,
            RepositoryError::NotFound => RecoveryError::InvalidToken,
            RepositoryError::Conflict(column) => match MemberField::from_column(&column) {
                Some(field) => RecoveryError::DuplicateMember { field },
                None => RecoveryError::Repository(RepositoryError::Conflict(column)),
            },
            other => RecoveryError::Repository(other),
        })?;
        info!(recovery_id = record.id, member_id = stored.id, "recovery completed");

        self.send_update_confirmation(&stored).await;
        Ok(stored)
    }

    async fn send_update_confirmation(&self, member: &MemberRecord) {
        let data = json!({
            "firstName": member.first_name,
            "workEmail": member.work_email,
            "phoneNumber": member.phone_number,
            "residentialAddress": member.residential_address,
        });
        let envelope = EmailEnvelope::new(member.email.clone(), "SUGRiA Profile Updated Successfully")
            .reply_to(self.settings.reply_to.clone())
            .tag("email_type", "profile_update")
            .tag("user_id", &member.email);

        if let Err(err) = self
            .mailer
            .send_templated(templates::MEMBER_UPDATE_CONFIRMATION, data, envelope)
            .await
        {
            warn!(member_id = member.id, error = %err, "update confirmation email failed");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("Invalid recovery token")]
    InvalidToken,
    #[error("This recovery link has already been used")]
    TokenAlreadyUsed,
    #[error("Invalid recovery type")]
    InvalidRecoveryType,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Member with this {} already exists", field.label())]
    DuplicateMember { field: MemberField },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl Classify for RecoveryError {
    fn class(&self) -> ErrorClass {
        match self {
            RecoveryError::InvalidToken => ErrorClass::NotFound,
            RecoveryError::TokenAlreadyUsed | RecoveryError::DuplicateMember { .. } => {
                ErrorClass::Conflict
            }
            RecoveryError::InvalidRecoveryType | RecoveryError::Invalid(_) => {
                ErrorClass::Validation
            }
            RecoveryError::Repository(_) => ErrorClass::Internal,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            RecoveryError::Invalid(err) => Some(json!({ "field": err.field })),
            RecoveryError::DuplicateMember { field } => Some(json!({ "field": field.label() })),
            _ => None,
        }
    }
}
