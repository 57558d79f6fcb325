use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, DuplicateMatch, InsertOutcome,
    PersonalSection,
};
use crate::notify::Recipient;
use crate::paging::{Page, Paging};
use crate::store::RepositoryError;

/// Row shown in admin listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub application_id: ApplicationId,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub category: String,
    pub location: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Admin listing filters. `search` matches full name, email, or application id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationQuery {
    pub search: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub category: Option<String>,
}

/// Filters selecting applicants for a cohort email.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantCohort {
    pub status: Option<ApplicationStatus>,
    pub category: Option<String>,
    pub location: Option<String>,
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    /// First prior application sharing the email, phone, or name and address.
    fn find_duplicate(
        &self,
        personal: &PersonalSection,
    ) -> Result<Option<DuplicateMatch>, RepositoryError>;
    fn exists(&self, id: &ApplicationId) -> Result<bool, RepositoryError>;
    /// Writes the parent and every section atomically, re-running the duplicate probe inside
    /// the same transaction.
    fn insert(&self, record: ApplicationRecord) -> Result<InsertOutcome, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn search(
        &self,
        query: &ApplicationQuery,
        paging: Paging,
    ) -> Result<Page<ApplicationSummary>, RepositoryError>;
    fn recipients(&self, cohort: &ApplicantCohort) -> Result<Vec<Recipient>, RepositoryError>;
    fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError>;
    fn count(&self) -> Result<u64, RepositoryError>;
}
