use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{RepositoryError, SqliteStore};
use crate::settings::SettingsRepository;

impl SettingsRepository for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now()],
            )?;
            Ok(())
        })
    }
}
