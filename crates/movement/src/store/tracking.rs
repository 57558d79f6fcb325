use chrono::Utc;
use rusqlite::{params, Row};

use super::{count_to_u64, RepositoryError, SqliteStore};
use crate::notify::{
    EmailTemplateRepository, EmailTrackingRepository, NewTrackedEmail, TemplateRecord,
    TrackedEmail,
};
use crate::paging::{Page, Paging};

/// Provider events after which a message no longer changes state.
const SETTLED_STATUSES: &str = "('delivered', 'bounced', 'complained', 'failed', 'canceled')";

fn tracked_from_row(row: &Row<'_>) -> Result<TrackedEmail, rusqlite::Error> {
    Ok(TrackedEmail {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        recipient: row.get(2)?,
        template: row.get(3)?,
        subject: row.get(4)?,
        status: row.get(5)?,
        sent_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const TRACKED_SELECT: &str =
    "SELECT id, provider_id, recipient, template, subject, status, sent_at, updated_at FROM email_tracking";

impl EmailTrackingRepository for SqliteStore {
    fn record_sent(&self, email: NewTrackedEmail) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO email_tracking
                    (provider_id, recipient, template, subject, status, sent_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'sent', ?5, ?5)
                 ON CONFLICT(provider_id) DO NOTHING",
                params![
                    email.provider_id,
                    email.recipient,
                    email.template,
                    email.subject,
                    Utc::now()
                ],
            )?;
            Ok(())
        })
    }

    fn tracked(&self, paging: Paging) -> Result<Page<TrackedEmail>, RepositoryError> {
        self.with_conn(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM email_tracking", [], |row| row.get(0))?;
            let sql = format!(
                "{TRACKED_SELECT} ORDER BY sent_at DESC, id DESC LIMIT {} OFFSET {}",
                paging.limit,
                paging.offset()
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map([], tracked_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(paging.wrap(items, count_to_u64(total)))
        })
    }

    fn unsettled(&self, limit: usize) -> Result<Vec<TrackedEmail>, RepositoryError> {
        self.with_conn(|conn| {
            let sql = format!(
                "{TRACKED_SELECT} WHERE status NOT IN {SETTLED_STATUSES}
                 ORDER BY sent_at ASC LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map([], tracked_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }

    fn update_status(&self, provider_id: &str, status: &str) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE email_tracking SET status = ?1, updated_at = ?2 WHERE provider_id = ?3",
                params![status, Utc::now(), provider_id],
            )?;
            if changed == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }
}

impl EmailTemplateRepository for SqliteStore {
    fn sync_templates(&self, templates: &[(String, String)]) -> Result<(), RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            for (name, source) in templates {
                tx.execute(
                    "INSERT INTO email_templates (name, source, synced_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET source = excluded.source, synced_at = excluded.synced_at",
                    params![name, source, now],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn templates(&self) -> Result<Vec<TemplateRecord>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT name, source, synced_at FROM email_templates ORDER BY name")?;
            let items = stmt
                .query_map([], |row| {
                    Ok(TemplateRecord {
                        name: row.get(0)?,
                        source: row.get(1)?,
                        synced_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }
}
