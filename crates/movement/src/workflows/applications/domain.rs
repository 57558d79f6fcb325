use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::http::de::{calendar_date, empty_string_as_none, flexible_bool, flexible_f64};

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Identifier wrapper for submitted applications (`APP` + six digits + two characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// Last six digits of the millisecond clock followed by two random characters.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let millis = now.timestamp_millis().rem_euclid(1_000_000);
        let mut rng = rand::thread_rng();
        let suffix: String = (0..2)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("APP{millis:06}{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review lifecycle of a program application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "under_review" | "under-review" => Some(Self::UnderReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSection {
    pub category: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub previous_training: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub training_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalSection {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub gender: String,
    #[serde(deserialize_with = "calendar_date")]
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSection {
    pub location: String,
    /// Hectares.
    #[serde(deserialize_with = "flexible_f64")]
    pub size: f64,
    #[serde(rename = "type")]
    pub farm_type: String,
    pub practices: String,
    pub challenges: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantSection {
    pub outcomes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSection {
    pub preference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotivationSection {
    pub statement: String,
    pub implementation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationSection {
    #[serde(deserialize_with = "flexible_bool")]
    pub agreed: bool,
    pub officer_name: String,
}

/// Text portion of a program application as posted by the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub program: ProgramSection,
    pub personal: PersonalSection,
    pub farm: FarmSection,
    pub grant: GrantSection,
    pub training: TrainingSection,
    pub motivation: MotivationSection,
    pub declaration: DeclarationSection,
}

/// Uploaded file as received from the multipart body.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lower-cased extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntakeAttachments {
    pub budget: Option<Attachment>,
    pub identity: Option<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Budget,
    Identity,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::Budget => "budget",
            DocumentKind::Identity => "identity",
        }
    }

    pub const fn field(self) -> &'static str {
        match self {
            DocumentKind::Budget => "grant.budgetFile",
            DocumentKind::Identity => "motivation.identityFile",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "budget" => Some(Self::Budget),
            "identity" => Some(Self::Identity),
            _ => None,
        }
    }
}

/// Stored document reference recorded alongside the owning section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub url: String,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    pub outcomes: String,
    pub budget_file: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotivationRecord {
    pub statement: String,
    pub implementation: String,
    pub identity_file: DocumentMetadata,
}

/// Persisted application aggregate with its seven owned sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub program: ProgramSection,
    pub personal: PersonalSection,
    pub farm: FarmSection,
    pub grant: GrantRecord,
    pub training: TrainingSection,
    pub motivation: MotivationRecord,
    pub declaration: DeclarationSection,
}

impl ApplicationRecord {
    pub fn document(&self, kind: DocumentKind) -> &DocumentMetadata {
        match kind {
            DocumentKind::Budget => &self.grant.budget_file,
            DocumentKind::Identity => &self.motivation.identity_file,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Email,
    PhoneNumber,
    NameAndAddress,
}

impl DuplicateField {
    pub const fn label(self) -> &'static str {
        match self {
            DuplicateField::Email => "email",
            DuplicateField::PhoneNumber => "phone number",
            DuplicateField::NameAndAddress => "name and address",
        }
    }
}

/// Prior application that collides with an incoming submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub field: DuplicateField,
    pub application_id: ApplicationId,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(ApplicationRecord),
    Duplicate(DuplicateMatch),
}
