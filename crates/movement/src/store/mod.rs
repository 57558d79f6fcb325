//! SQLite persistence for every workflow repository.
//!
//! One connection guarded by a mutex backs all repository traits. Multi-row writes run
//! inside explicit transactions and child tables cascade on delete.
//!
//! ## Tables
//!
//! - `applications` plus seven section tables keyed by `application_id`
//! - `members`, `member_education`
//! - `recoveries`, `admins`, `settings`
//! - `email_templates`, `email_tracking`

mod admin;
mod applications;
mod members;
mod recovery;
pub mod schema;
mod settings;
mod tracking;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, ErrorCode};
use tracing::{debug, info};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write; carries the offending column.
    #[error("record already exists ({0})")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    /// The row changed state underneath the caller.
    #[error("record is no longer in the expected state")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound,
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                let column = message
                    .as_deref()
                    .and_then(unique_column)
                    .unwrap_or("unknown")
                    .to_string();
                RepositoryError::Conflict(column)
            }
            _ => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

/// `UNIQUE constraint failed: members.email` yields `email`.
fn unique_column(message: &str) -> Option<&str> {
    let detail = message.strip_prefix("UNIQUE constraint failed: ")?;
    let first = detail.split(',').next()?.trim();
    Some(first.rsplit('.').next().unwrap_or(first))
}

/// SQLite-backed store implementing every repository trait in the crate.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        info!(path = %path.display(), "opening SQLite database");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        debug!("opening in-memory SQLite database");
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Connection) -> Result<T, RepositoryError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::Unavailable(format!("lock poisoned: {e}")))?;
        f(&conn)
    }

    pub(crate) fn with_conn_mut<F, T>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut Connection) -> Result<T, RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::Unavailable(format!("lock poisoned: {e}")))?;
        f(&mut conn)
    }
}

/// `%term%` for LIKE clauses, with LIKE wildcards in the term escaped by `\`.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub(crate) fn count_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_names_the_column() {
        assert_eq!(unique_column("UNIQUE constraint failed: members.email"), Some("email"));
        assert_eq!(
            unique_column("UNIQUE constraint failed: members.phone_number"),
            Some("phone_number")
        );
        assert_eq!(unique_column("NOT NULL constraint failed: members.email"), None);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" ada "), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn in_memory_store_bootstraps_schema_twice() {
        let store = SqliteStore::open_in_memory().expect("store opens");
        store
            .with_conn(|conn| schema::init_schema(conn))
            .expect("schema init is idempotent");
    }
}
