//! Direct member registration ("join the movement") and the member data model shared
//! with the recovery workflow.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    work_email_for, Education, EmergencyContact, MemberField, MemberProfile, MemberRecord,
    MemberRegistration, NewMember,
};
pub use repository::{
    AgeRange, MemberCohort, MemberProbe, MemberQuery, MemberRepository, MemberSummary,
};
pub use router::member_router;
pub use service::{MemberService, MemberServiceError, MemberSettings};
pub use validation::prepare_member;
