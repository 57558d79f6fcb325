use chrono::Utc;
use rusqlite::{params, OptionalExtension, ToSql};

use super::{count_to_u64, like_pattern, RepositoryError, SqliteStore};
use crate::paging::{Page, Paging};
use crate::workflows::admin::{
    AdminAccount, AdminRepository, DirectoryEntry, DirectoryKind, DirectoryRepository,
};

impl AdminRepository for SqliteStore {
    fn find_admin(&self, email: &str) -> Result<Option<AdminAccount>, RepositoryError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, email, password_hash, name, role FROM admins
                     WHERE lower(email) = lower(?1)",
                    params![email],
                    |row| {
                        Ok(AdminAccount {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            password_hash: row.get(2)?,
                            name: row.get(3)?,
                            role: row.get(4)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: &str,
    ) -> Result<AdminAccount, RepositoryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admins (email, password_hash, name, role, created_at)
                 VALUES (lower(?1), ?2, ?3, ?4, ?5)
                 ON CONFLICT(email) DO UPDATE SET
                    password_hash = excluded.password_hash,
                    name = excluded.name,
                    role = excluded.role",
                params![email, password_hash, name, role, Utc::now()],
            )?;
            Ok(())
        })?;
        self.find_admin(email)?.ok_or(RepositoryError::NotFound)
    }
}

const MEMBER_ROWS: &str = "SELECT 'member' AS kind, CAST(id AS TEXT) AS reference,
        first_name || ' ' || last_name AS name, email, phone_number, created_at
    FROM members";

const APPLICANT_ROWS: &str = "SELECT 'applicant' AS kind, a.application_id AS reference,
        p.full_name AS name, p.email AS email, p.phone_number AS phone_number,
        a.submitted_at AS created_at
    FROM applications a
    JOIN application_personal p ON p.application_id = a.application_id";

impl DirectoryRepository for SqliteStore {
    fn directory(
        &self,
        kind: DirectoryKind,
        search: Option<&str>,
        paging: Paging,
    ) -> Result<Page<DirectoryEntry>, RepositoryError> {
        let source = match kind {
            DirectoryKind::Member => MEMBER_ROWS.to_string(),
            DirectoryKind::Applicant => APPLICANT_ROWS.to_string(),
            DirectoryKind::All => format!("{MEMBER_ROWS} UNION ALL {APPLICANT_ROWS}"),
        };
        let mut filter = String::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(term) = search.filter(|term| !term.trim().is_empty()) {
            filter.push_str(
                " WHERE name LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\' \
                 OR reference LIKE ?1 ESCAPE '\\'",
            );
            values.push(Box::new(like_pattern(term)));
        }

        self.with_conn(|conn| {
            let refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM ({source}){filter}"),
                refs.as_slice(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT kind, reference, name, email, phone_number, created_at
                 FROM ({source}){filter}
                 ORDER BY created_at DESC
                 LIMIT {} OFFSET {}",
                paging.limit,
                paging.offset()
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(refs.as_slice(), |row| {
                    let kind: String = row.get(0)?;
                    Ok(DirectoryEntry {
                        kind: if kind == "member" { "member" } else { "applicant" },
                        reference: row.get(1)?,
                        name: row.get(2)?,
                        email: row.get(3)?,
                        phone_number: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(paging.wrap(items, count_to_u64(total)))
        })
    }
}
