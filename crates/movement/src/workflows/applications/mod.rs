//! Program application intake: multipart parsing, validation, duplicate detection,
//! document upload, and atomic persistence of the application and its seven sections.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission, Attachment,
    DeclarationSection, DocumentKind, DocumentMetadata, DuplicateField, DuplicateMatch,
    FarmSection, GrantRecord, GrantSection, InsertOutcome, IntakeAttachments, MotivationRecord,
    MotivationSection, PersonalSection, ProgramSection, TrainingSection,
};
pub use repository::{
    ApplicantCohort, ApplicationQuery, ApplicationRepository, ApplicationSummary,
};
pub use router::application_router;
pub use service::{ApplicationIntakeService, IntakeConfig, IntakeError};
pub use validation::AttachmentViolation;
