use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the recovered person originally tried to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryKind {
    #[serde(rename = "application")]
    Application,
    #[serde(rename = "join-movement")]
    JoinMovement,
}

impl RecoveryKind {
    pub const fn label(self) -> &'static str {
        match self {
            RecoveryKind::Application => "application",
            RecoveryKind::JoinMovement => "join-movement",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "application" => Some(Self::Application),
            "join-movement" => Some(Self::JoinMovement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Pending,
    Invited,
    Recovered,
}

impl RecoveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecoveryStatus::Pending => "pending",
            RecoveryStatus::Invited => "invited",
            RecoveryStatus::Recovered => "recovered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "invited" => Some(Self::Invited),
            "recovered" => Some(Self::Recovered),
            _ => None,
        }
    }

    /// Status only moves forward: pending, invited, recovered.
    pub fn can_advance_to(self, next: RecoveryStatus) -> bool {
        matches!(
            (self, next),
            (RecoveryStatus::Pending, RecoveryStatus::Invited)
                | (RecoveryStatus::Pending, RecoveryStatus::Recovered)
                | (RecoveryStatus::Invited, RecoveryStatus::Recovered)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryToken(pub String);

impl RecoveryToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stored recovery entry. The token never leaves the service except inside an invite link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRecord {
    pub id: i64,
    pub token: RecoveryToken,
    pub email: String,
    pub kind: RecoveryKind,
    pub status: RecoveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecoveryRecord {
    pub fn view(&self) -> RecoveryView {
        RecoveryView {
            id: self.id,
            email: self.email.clone(),
            kind: self.kind,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryView {
    pub id: i64,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: RecoveryKind,
    pub status: RecoveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated bulk-create input; `type` is checked per entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecoveryEntry {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub success: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

impl BulkOutcome {
    pub fn fail(&mut self, email: impl Into<String>, error: impl Into<String>) {
        self.failed.push(FailedEntry {
            email: email.into(),
            error: error.into(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteReport {
    pub success: Vec<String>,
    pub failed: Vec<FailedEntry>,
    pub message: String,
}

/// Answer to a token validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenValidation {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: RecoveryKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_moves_backwards() {
        assert!(RecoveryStatus::Pending.can_advance_to(RecoveryStatus::Invited));
        assert!(RecoveryStatus::Invited.can_advance_to(RecoveryStatus::Recovered));
        assert!(RecoveryStatus::Pending.can_advance_to(RecoveryStatus::Recovered));
        assert!(!RecoveryStatus::Recovered.can_advance_to(RecoveryStatus::Pending));
        assert!(!RecoveryStatus::Recovered.can_advance_to(RecoveryStatus::Invited));
        assert!(!RecoveryStatus::Invited.can_advance_to(RecoveryStatus::Pending));
        assert!(!RecoveryStatus::Invited.can_advance_to(RecoveryStatus::Invited));
    }

    #[test]
    fn generated_tokens_are_uuid_v4() {
        let token = RecoveryToken::generate();
        let parsed = Uuid::parse_str(token.as_str()).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(token, RecoveryToken::generate());
    }
}
