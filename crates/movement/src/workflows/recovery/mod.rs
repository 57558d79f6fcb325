//! Recovery tokens: bulk creation, invite dispatch, validation, and profile completion.

pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    BulkOutcome, FailedEntry, InviteReport, RecoveryEntry, RecoveryKind, RecoveryRecord,
    RecoveryStatus, RecoveryToken, RecoveryView, TokenValidation,
};
pub use import::{parse_entries, RecoveryImportError};
pub use repository::RecoveryRepository;
pub use router::recovery_router;
pub use service::{RecoveryError, RecoveryService, RecoverySettings};
