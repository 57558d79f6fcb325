//! Transactional email: templates, delivery transports, and delivery tracking.

mod service;
pub mod templates;
mod tracking;
mod transport;

pub use service::{EmailService, Mailer, SyncReport};
pub use templates::{TemplateError, TemplateRegistry};
pub use tracking::{
    EmailTemplateRepository, EmailTrackingRepository, NewTrackedEmail, Recipient,
    TemplateRecord, TrackedEmail,
};
pub use transport::{
    EmailEnvelope, EmailReceipt, EmailTag, EmailTransport, LogTransport, MailError,
    RenderedEmail, ResendTransport,
};
