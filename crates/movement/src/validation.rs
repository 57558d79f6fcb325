//! Field-level checks shared by the intake, registration, and recovery workflows.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn nigerian_mobile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+234[0-9]{10}$").expect("valid phone regex"))
}

fn member_phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{11,}$").expect("valid phone regex"))
}

pub fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "should not be empty"));
    }
    Ok(())
}

pub fn require_email(field: &str, value: &str) -> Result<(), ValidationError> {
    require_text(field, value)?;
    if !email_pattern().is_match(value.trim()) {
        return Err(ValidationError::new(field, "must be a valid email address"));
    }
    Ok(())
}

pub fn is_email(value: &str) -> bool {
    email_pattern().is_match(value.trim())
}

/// Applicant phones are Nigerian mobiles in international form.
pub fn require_applicant_phone(field: &str, value: &str) -> Result<(), ValidationError> {
    if !nigerian_mobile_pattern().is_match(value.trim()) {
        return Err(ValidationError::new(
            field,
            "must be a valid Nigerian phone number (+234XXXXXXXXXX)",
        ));
    }
    Ok(())
}

pub fn require_member_phone(field: &str, value: &str) -> Result<(), ValidationError> {
    if !member_phone_pattern().is_match(value.trim()) {
        return Err(ValidationError::new(field, "must be at least 11 digits"));
    }
    Ok(())
}
