//! Authenticated admin surface: login, record management, cohort email, and settings.

pub mod auth;
pub mod broadcast;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{
    require_admin, AccessToken, AdminAuthenticator, AdminClaims, AuthError, LoginRequest,
    TokenIssuer,
};
pub use broadcast::{Broadcast, BroadcastError, Broadcaster, DispatchReport};
pub use repository::{
    AdminAccount, AdminRepository, DirectoryEntry, DirectoryKind, DirectoryRepository,
};
pub use router::admin_router;
pub use service::{
    Addressees, AdminCollaborators, AdminError, AdminService, AdminStore, BulkEmailRequest,
    CohortEmailRequest, DocumentDownload, RecordCounts,
};
