use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::paging::{Page, Paging};
use crate::store::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
}

pub trait AdminRepository: Send + Sync {
    fn find_admin(&self, email: &str) -> Result<Option<AdminAccount>, RepositoryError>;
    /// Creates the account or replaces the hash and name of an existing one.
    fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: &str,
    ) -> Result<AdminAccount, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    Member,
    Applicant,
    #[default]
    All,
}

/// One person in the combined members and applicants listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub reference: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

pub trait DirectoryRepository: Send + Sync {
    fn directory(
        &self,
        kind: DirectoryKind,
        search: Option<&str>,
        paging: Paging,
    ) -> Result<Page<DirectoryEntry>, RepositoryError>;
}
