use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::http::de::{calendar_date, empty_string_as_none};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub highest_level: String,
    pub institution_name: String,
    pub field_of_study: String,
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub other_certifications: Option<String>,
}

/// Payload of a direct "join the movement" registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(deserialize_with = "calendar_date")]
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub nationality: String,
    pub phone_number: String,
    pub residential_address: String,
    pub emergency_contact: EmergencyContact,
    pub education: Education,
}

impl MemberRegistration {
    pub fn split(self) -> (String, MemberProfile) {
        (
            self.email,
            MemberProfile {
                first_name: self.first_name,
                last_name: self.last_name,
                work_email: None,
                date_of_birth: self.date_of_birth,
                gender: self.gender,
                nationality: self.nationality,
                phone_number: self.phone_number,
                residential_address: self.residential_address,
                emergency_contact: self.emergency_contact,
                education: self.education,
            },
        )
    }
}

/// Member details without the personal email, as supplied when completing a recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub work_email: Option<String>,
    #[serde(deserialize_with = "calendar_date")]
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub nationality: String,
    pub phone_number: String,
    pub residential_address: String,
    pub emergency_contact: EmergencyContact,
    pub education: Education,
}

/// Fully resolved member ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub email: String,
    pub work_email: String,
    pub profile: MemberProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub work_email: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub nationality: String,
    pub phone_number: String,
    pub residential_address: String,
    pub emergency_contact: EmergencyContact,
    pub education: Education,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// `firstname.lastname@<domain>`, lower-cased with all whitespace removed.
pub fn work_email_for(first_name: &str, last_name: &str, domain: &str) -> String {
    let squash = |value: &str| -> String {
        value
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };
    format!("{}.{}@{}", squash(first_name), squash(last_name), domain)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberField {
    Email,
    PhoneNumber,
    WorkEmail,
}

impl MemberField {
    pub const fn label(self) -> &'static str {
        match self {
            MemberField::Email => "email",
            MemberField::PhoneNumber => "phone number",
            MemberField::WorkEmail => "work email",
        }
    }

    /// Maps a `members` column name from a unique-constraint failure.
    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "email" => Some(Self::Email),
            "phone_number" => Some(Self::PhoneNumber),
            "work_email" => Some(Self::WorkEmail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_email_squashes_whitespace_and_case() {
        assert_eq!(
            work_email_for("Ada", "Lovelace", "sugria.com"),
            "ada.lovelace@sugria.com"
        );
        assert_eq!(
            work_email_for(" Mary Ann ", "Van Dyke", "sugria.com"),
            "maryann.vandyke@sugria.com"
        );
    }
}
