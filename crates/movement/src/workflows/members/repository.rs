use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{MemberField, MemberRecord, NewMember};
use crate::notify::Recipient;
use crate::paging::{Page, Paging};
use crate::store::RepositoryError;

/// Uniqueness probe run before a member write.
#[derive(Debug, Clone, Copy)]
pub struct MemberProbe<'a> {
    pub email: Option<&'a str>,
    pub phone_number: &'a str,
    pub work_email: &'a str,
    /// Rows owned by this email are ignored (a recovery updating its own member).
    pub exclude_email: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub work_email: String,
    pub phone_number: String,
    pub nationality: String,
    pub created_at: DateTime<Utc>,
}

/// `search` matches first name, last name, personal email, or work email.
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub search: Option<String>,
}

/// Inclusive age bounds in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    /// Birth dates `(earliest_exclusive, latest_inclusive)` that fall inside the range on `today`.
    pub fn birth_window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let latest = today.checked_sub_months(Months::new(self.min.checked_mul(12)?))?;
        let earliest = today.checked_sub_months(Months::new(self.max.checked_add(1)?.checked_mul(12)?))?;
        Some((earliest, latest))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCohort {
    pub nationality: Option<String>,
    pub gender: Option<String>,
    pub age_range: Option<AgeRange>,
}

pub trait MemberRepository: Send + Sync {
    fn find_conflict(&self, probe: &MemberProbe<'_>) -> Result<Option<MemberField>, RepositoryError>;
    fn insert(&self, member: NewMember) -> Result<MemberRecord, RepositoryError>;
    fn fetch(&self, id: i64) -> Result<Option<MemberRecord>, RepositoryError>;
    fn search(
        &self,
        query: &MemberQuery,
        paging: Paging,
    ) -> Result<Page<MemberSummary>, RepositoryError>;
    fn recipients(
        &self,
        cohort: &MemberCohort,
        today: NaiveDate,
    ) -> Result<Vec<Recipient>, RepositoryError>;
    fn delete(&self, id: i64) -> Result<(), RepositoryError>;
    fn count(&self) -> Result<u64, RepositoryError>;
}
