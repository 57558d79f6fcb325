use super::domain::{RecoveryKind, RecoveryRecord, RecoveryToken};
use crate::store::RepositoryError;
use crate::workflows::members::{MemberRecord, NewMember};

pub trait RecoveryRepository: Send + Sync {
    /// Fails with `Conflict("email")` when the email already has a recovery entry.
    fn insert_recovery(
        &self,
        email: &str,
        kind: RecoveryKind,
        token: &RecoveryToken,
    ) -> Result<RecoveryRecord, RepositoryError>;
    fn find_by_token(&self, token: &str) -> Result<Option<RecoveryRecord>, RepositoryError>;
    fn email_has_recovery(&self, email: &str) -> Result<bool, RepositoryError>;
    /// Pending entries, newest first. `Some` restricts to the listed emails, so an
    /// empty list matches nothing.
    fn pending(&self, emails: Option<&[String]>) -> Result<Vec<RecoveryRecord>, RepositoryError>;
    /// Advances a pending entry to invited; `Stale` if it is no longer pending.
    fn mark_invited(&self, id: i64) -> Result<(), RepositoryError>;
    /// Flips the entry to recovered and upserts the member bound to its email in one
    /// transaction. `Stale` if the token was already redeemed.
    fn redeem(&self, token: &str, member: NewMember) -> Result<MemberRecord, RepositoryError>;
    fn count_pending(&self) -> Result<u64, RepositoryError>;
}
