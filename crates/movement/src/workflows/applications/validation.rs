//! Attachment and field rules applied before any side effect of an intake.

use super::domain::{ApplicationSubmission, Attachment, DocumentKind};
use crate::validation::{
    require_applicant_phone, require_email, require_text, ValidationError,
};

const PDF_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/x-pdf",
    "application/acrobat",
    "application/vnd.pdf",
    "text/pdf",
    "text/x-pdf",
];

const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentViolation {
    #[error("Budget file must be a PDF document")]
    BudgetNotPdf,
    #[error("Identity document must be a PDF, JPG, or PNG file")]
    IdentityFormat,
    #[error("Invalid file extension for {field}. Allowed extensions: {allowed}")]
    Extension {
        field: &'static str,
        allowed: &'static str,
    },
    #[error("{field} is empty")]
    Empty { field: &'static str },
    #[error("{field} exceeds the {limit} byte limit")]
    TooLarge { field: &'static str, limit: usize },
}

fn mime_essence(content_type: &str) -> String {
    content_type
        .parse::<mime::Mime>()
        .map(|parsed| parsed.essence_str().to_ascii_lowercase())
        .unwrap_or_else(|_| content_type.trim().to_ascii_lowercase())
}

/// Clients frequently send `application/octet-stream`; fall back to the file name.
fn effective_mime(attachment: &Attachment) -> String {
    let declared = mime_essence(&attachment.content_type);
    if declared.is_empty() || declared == "application/octet-stream" {
        return mime_guess::from_path(&attachment.file_name)
            .first()
            .map(|guess| guess.essence_str().to_ascii_lowercase())
            .unwrap_or(declared);
    }
    declared
}

pub fn check_attachment(
    kind: DocumentKind,
    attachment: &Attachment,
    max_bytes: usize,
) -> Result<(), AttachmentViolation> {
    let field = kind.field();
    if attachment.size() == 0 {
        return Err(AttachmentViolation::Empty { field });
    }
    if attachment.size() > max_bytes {
        return Err(AttachmentViolation::TooLarge {
            field,
            limit: max_bytes,
        });
    }

    let mime = effective_mime(attachment);
    let extension = attachment.extension();
    match kind {
        DocumentKind::Budget => {
            if !PDF_MIME_TYPES.contains(&mime.as_str()) {
                return Err(AttachmentViolation::BudgetNotPdf);
            }
            if extension != ".pdf" {
                return Err(AttachmentViolation::Extension {
                    field,
                    allowed: ".pdf",
                });
            }
        }
        DocumentKind::Identity => {
            let is_pdf = PDF_MIME_TYPES.contains(&mime.as_str());
            let is_image = IMAGE_MIME_TYPES.contains(&mime.as_str());
            if !is_pdf && !is_image {
                return Err(AttachmentViolation::IdentityFormat);
            }
            if !matches!(extension.as_str(), ".pdf" | ".jpg" | ".jpeg" | ".png") {
                return Err(AttachmentViolation::Extension {
                    field,
                    allowed: ".pdf, .jpg, .jpeg, .png",
                });
            }
        }
    }
    Ok(())
}

/// Trim free-text fields and lower-case the email before validation and storage.
pub fn normalize(mut submission: ApplicationSubmission) -> ApplicationSubmission {
    fn trim(value: &mut String) {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }

    trim(&mut submission.program.category);
    trim(&mut submission.personal.full_name);
    trim(&mut submission.personal.address);
    trim(&mut submission.personal.gender);
    trim(&mut submission.personal.phone_number);
    submission.personal.email = submission.personal.email.trim().to_ascii_lowercase();
    trim(&mut submission.farm.location);
    trim(&mut submission.farm.farm_type);
    trim(&mut submission.declaration.officer_name);
    submission
}

pub fn validate_submission(submission: &ApplicationSubmission) -> Result<(), ValidationError> {
    require_text("program.category", &submission.program.category)?;

    let personal = &submission.personal;
    require_text("personal.fullName", &personal.full_name)?;
    require_email("personal.email", &personal.email)?;
    require_applicant_phone("personal.phoneNumber", &personal.phone_number)?;
    require_text("personal.address", &personal.address)?;
    require_text("personal.gender", &personal.gender)?;

    let farm = &submission.farm;
    require_text("farm.location", &farm.location)?;
    if !(farm.size.is_finite() && farm.size > 0.0) {
        return Err(ValidationError::new("farm.size", "must be a positive number"));
    }
    require_text("farm.type", &farm.farm_type)?;
    require_text("farm.practices", &farm.practices)?;
    require_text("farm.challenges", &farm.challenges)?;

    require_text("grant.outcomes", &submission.grant.outcomes)?;
    require_text("training.preference", &submission.training.preference)?;
    require_text("motivation.statement", &submission.motivation.statement)?;
    require_text("motivation.implementation", &submission.motivation.implementation)?;

    if !submission.declaration.agreed {
        return Err(ValidationError::new("declaration.agreed", "must be accepted"));
    }
    require_text("declaration.officerName", &submission.declaration.officer_name)?;
    Ok(())
}
