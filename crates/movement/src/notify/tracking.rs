use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::paging::{Page, Paging};
use crate::store::RepositoryError;

/// Addressee selected by a cohort query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackedEmail {
    pub provider_id: String,
    pub recipient: String,
    pub template: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEmail {
    pub id: i64,
    pub provider_id: String,
    pub recipient: String,
    pub template: String,
    pub subject: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub trait EmailTrackingRepository: Send + Sync {
    fn record_sent(&self, email: NewTrackedEmail) -> Result<(), RepositoryError>;
    fn tracked(&self, paging: Paging) -> Result<Page<TrackedEmail>, RepositoryError>;
    /// Entries whose provider status may still change.
    fn unsettled(&self, limit: usize) -> Result<Vec<TrackedEmail>, RepositoryError>;
    fn update_status(&self, provider_id: &str, status: &str) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub name: String,
    pub source: String,
    pub synced_at: DateTime<Utc>,
}

/// Mirror of the templates loaded at startup, for the admin listing.
pub trait EmailTemplateRepository: Send + Sync {
    fn sync_templates(&self, templates: &[(String, String)]) -> Result<(), RepositoryError>;
    fn templates(&self) -> Result<Vec<TemplateRecord>, RepositoryError>;
}
