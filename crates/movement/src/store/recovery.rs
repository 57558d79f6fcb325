use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use super::members::upsert_member;
use super::{count_to_u64, RepositoryError, SqliteStore};
use crate::workflows::members::{MemberRecord, NewMember};
use crate::workflows::recovery::{
    RecoveryKind, RecoveryRecord, RecoveryRepository, RecoveryStatus, RecoveryToken,
};

const RECOVERY_SELECT: &str =
    "SELECT id, token, email, kind, status, created_at, updated_at FROM recoveries";

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, message.into())
}

fn recovery_from_row(row: &Row<'_>) -> Result<RecoveryRecord, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(RecoveryRecord {
        id: row.get(0)?,
        token: RecoveryToken(row.get(1)?),
        email: row.get(2)?,
        kind: RecoveryKind::parse(&kind)
            .ok_or_else(|| conversion_error(3, format!("unknown recovery kind '{kind}'")))?,
        status: RecoveryStatus::parse(&status)
            .ok_or_else(|| conversion_error(4, format!("unknown recovery status '{status}'")))?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn find_by_token_in(conn: &Connection, token: &str) -> Result<Option<RecoveryRecord>, RepositoryError> {
    let sql = format!("{RECOVERY_SELECT} WHERE token = ?1");
    Ok(conn
        .query_row(&sql, params![token], recovery_from_row)
        .optional()?)
}

impl RecoveryRepository for SqliteStore {
    fn insert_recovery(
        &self,
        email: &str,
        kind: RecoveryKind,
        token: &RecoveryToken,
    ) -> Result<RecoveryRecord, RepositoryError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO recoveries (token, email, kind, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
                params![token.as_str(), email, kind.label(), now],
            )?;
            find_by_token_in(conn, token.as_str())?.ok_or(RepositoryError::NotFound)
        })
    }

    fn find_by_token(&self, token: &str) -> Result<Option<RecoveryRecord>, RepositoryError> {
        self.with_conn(|conn| find_by_token_in(conn, token))
    }

    fn email_has_recovery(&self, email: &str) -> Result<bool, RepositoryError> {
        self.with_conn(|conn| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM recoveries WHERE lower(email) = lower(?1)",
                    params![email],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
    }

    fn pending(&self, emails: Option<&[String]>) -> Result<Vec<RecoveryRecord>, RepositoryError> {
        if emails.is_some_and(|emails| emails.is_empty()) {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let mut sql = format!("{RECOVERY_SELECT} WHERE status = 'pending'");
            let values: Vec<Box<dyn ToSql>> = emails
                .unwrap_or_default()
                .iter()
                .map(|email| Box::new(email.trim().to_lowercase()) as Box<dyn ToSql>)
                .collect();
            if emails.is_some() {
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!(" AND lower(email) IN ({placeholders})"));
            }
            sql.push_str(" ORDER BY created_at DESC, id DESC");

            let refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(refs.as_slice(), recovery_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    fn mark_invited(&self, id: i64) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE recoveries SET status = 'invited', updated_at = ?1
                 WHERE id = ?2 AND status = 'pending'",
                params![Utc::now(), id],
            )?;
            if changed == 0 {
                return Err(RepositoryError::Stale);
            }
            Ok(())
        })
    }

    fn redeem(&self, token: &str, member: NewMember) -> Result<MemberRecord, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE recoveries SET status = 'recovered', updated_at = ?1
                 WHERE token = ?2 AND status != 'recovered'",
                params![Utc::now(), token],
            )?;
            if changed == 0 {
                return match find_by_token_in(&tx, token)? {
                    Some(_) => Err(RepositoryError::Stale),
                    None => Err(RepositoryError::NotFound),
                };
            }
            let stored = upsert_member(&tx, &member)?;
            tx.commit()?;
            debug!(member_id = stored.id, "recovery redeemed");
            Ok(stored)
        })
    }

    fn count_pending(&self) -> Result<u64, RepositoryError> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM recoveries WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )?;
            Ok(count_to_u64(total))
        })
    }
}
