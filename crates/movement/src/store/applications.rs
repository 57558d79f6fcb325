use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use super::{count_to_u64, like_pattern, RepositoryError, SqliteStore};
use crate::notify::Recipient;
use crate::paging::{Page, Paging};
use crate::workflows::applications::{
    ApplicantCohort, ApplicationId, ApplicationQuery, ApplicationRecord, ApplicationRepository,
    ApplicationStatus, ApplicationSummary, DeclarationSection, DocumentMetadata, DuplicateField,
    DuplicateMatch, FarmSection, GrantRecord, InsertOutcome, MotivationRecord, PersonalSection,
    ProgramSection, TrainingSection,
};

const RECORD_SELECT: &str = "SELECT a.application_id, a.status, a.submitted_at, a.updated_at,
        pr.category, pr.previous_training, pr.training_id,
        p.full_name, p.email, p.phone_number, p.address, p.gender, p.date_of_birth,
        f.location, f.size, f.farm_type, f.practices, f.challenges,
        g.outcomes, g.budget_file_url, g.budget_file_name, g.budget_file_size, g.budget_file_mime,
        t.preference,
        m.statement, m.implementation, m.identity_file_url, m.identity_file_name,
        m.identity_file_size, m.identity_file_mime,
        d.agreed, d.officer_name
    FROM applications a
    JOIN application_programs pr ON pr.application_id = a.application_id
    JOIN application_personal p ON p.application_id = a.application_id
    JOIN application_farms f ON f.application_id = a.application_id
    JOIN application_grants g ON g.application_id = a.application_id
    JOIN application_trainings t ON t.application_id = a.application_id
    JOIN application_motivations m ON m.application_id = a.application_id
    JOIN application_declarations d ON d.application_id = a.application_id";

fn parse_status(raw: String) -> Result<ApplicationStatus, rusqlite::Error> {
    ApplicationStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown application status '{raw}'").into(),
        )
    })
}

fn record_from_row(row: &Row<'_>) -> Result<ApplicationRecord, rusqlite::Error> {
    let budget_size: i64 = row.get(21)?;
    let identity_size: i64 = row.get(28)?;
    Ok(ApplicationRecord {
        application_id: ApplicationId(row.get(0)?),
        status: parse_status(row.get(1)?)?,
        submitted_at: row.get(2)?,
        updated_at: row.get(3)?,
        program: ProgramSection {
            category: row.get(4)?,
            previous_training: row.get(5)?,
            training_id: row.get(6)?,
        },
        personal: PersonalSection {
            full_name: row.get(7)?,
            email: row.get(8)?,
            phone_number: row.get(9)?,
            address: row.get(10)?,
            gender: row.get(11)?,
            date_of_birth: row.get(12)?,
        },
        farm: FarmSection {
            location: row.get(13)?,
            size: row.get(14)?,
            farm_type: row.get(15)?,
            practices: row.get(16)?,
            challenges: row.get(17)?,
        },
        grant: GrantRecord {
            outcomes: row.get(18)?,
            budget_file: DocumentMetadata {
                url: row.get(19)?,
                file_name: row.get(20)?,
                size: count_to_u64(budget_size),
                mime_type: row.get(22)?,
            },
        },
        training: TrainingSection {
            preference: row.get(23)?,
        },
        motivation: MotivationRecord {
            statement: row.get(24)?,
            implementation: row.get(25)?,
            identity_file: DocumentMetadata {
                url: row.get(26)?,
                file_name: row.get(27)?,
                size: count_to_u64(identity_size),
                mime_type: row.get(29)?,
            },
        },
        declaration: DeclarationSection {
            agreed: row.get(30)?,
            officer_name: row.get(31)?,
        },
    })
}

fn fetch_record(
    conn: &Connection,
    id: &ApplicationId,
) -> Result<Option<ApplicationRecord>, RepositoryError> {
    let sql = format!("{RECORD_SELECT} WHERE a.application_id = ?1");
    Ok(conn
        .query_row(&sql, params![id.as_str()], record_from_row)
        .optional()?)
}

/// Oldest application colliding on email, phone, or the name and address pair.
fn find_duplicate_in(
    conn: &Connection,
    personal: &PersonalSection,
) -> Result<Option<DuplicateMatch>, RepositoryError> {
    let found = conn
        .query_row(
            "SELECT a.application_id, pr.category,
                    lower(p.email) = lower(?1), p.phone_number = ?2
             FROM application_personal p
             JOIN applications a ON a.application_id = p.application_id
             JOIN application_programs pr ON pr.application_id = p.application_id
             WHERE lower(p.email) = lower(?1)
                OR p.phone_number = ?2
                OR (lower(p.address) = lower(?3) AND lower(p.full_name) = lower(?4))
             ORDER BY a.submitted_at ASC
             LIMIT 1",
            params![
                personal.email,
                personal.phone_number,
                personal.address,
                personal.full_name
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            },
        )
        .optional()?;

    Ok(found.map(|(application_id, category, email_match, phone_match)| {
        let field = if email_match {
            DuplicateField::Email
        } else if phone_match {
            DuplicateField::PhoneNumber
        } else {
            DuplicateField::NameAndAddress
        };
        DuplicateMatch {
            field,
            application_id: ApplicationId(application_id),
            category,
        }
    }))
}

fn size_to_sql(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

impl ApplicationRepository for SqliteStore {
    fn find_duplicate(
        &self,
        personal: &PersonalSection,
    ) -> Result<Option<DuplicateMatch>, RepositoryError> {
        self.with_conn(|conn| find_duplicate_in(conn, personal))
    }

    fn exists(&self, id: &ApplicationId) -> Result<bool, RepositoryError> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM applications WHERE application_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn insert(&self, record: ApplicationRecord) -> Result<InsertOutcome, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if let Some(duplicate) = find_duplicate_in(&tx, &record.personal)? {
                return Ok(InsertOutcome::Duplicate(duplicate));
            }

            let id = record.application_id.as_str();
            tx.execute(
                "INSERT INTO applications (application_id, status, submitted_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, record.status.label(), record.submitted_at, record.updated_at],
            )?;
            tx.execute(
                "INSERT INTO application_programs (application_id, category, previous_training, training_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id,
                    record.program.category,
                    record.program.previous_training,
                    record.program.training_id
                ],
            )?;
            let personal = &record.personal;
            tx.execute(
                "INSERT INTO application_personal
                    (application_id, full_name, email, phone_number, address, gender, date_of_birth)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    personal.full_name,
                    personal.email,
                    personal.phone_number,
                    personal.address,
                    personal.gender,
                    personal.date_of_birth
                ],
            )?;
            let farm = &record.farm;
            tx.execute(
                "INSERT INTO application_farms
                    (application_id, location, size, farm_type, practices, challenges)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    farm.location,
                    farm.size,
                    farm.farm_type,
                    farm.practices,
                    farm.challenges
                ],
            )?;
            let budget = &record.grant.budget_file;
            tx.execute(
                "INSERT INTO application_grants
                    (application_id, outcomes, budget_file_url, budget_file_name,
                     budget_file_size, budget_file_mime)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    record.grant.outcomes,
                    budget.url,
                    budget.file_name,
                    size_to_sql(budget.size),
                    budget.mime_type
                ],
            )?;
            tx.execute(
                "INSERT INTO application_trainings (application_id, preference) VALUES (?1, ?2)",
                params![id, record.training.preference],
            )?;
            let identity = &record.motivation.identity_file;
            tx.execute(
                "INSERT INTO application_motivations
                    (application_id, statement, implementation, identity_file_url,
                     identity_file_name, identity_file_size, identity_file_mime)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    record.motivation.statement,
                    record.motivation.implementation,
                    identity.url,
                    identity.file_name,
                    size_to_sql(identity.size),
                    identity.mime_type
                ],
            )?;
            tx.execute(
                "INSERT INTO application_declarations (application_id, agreed, officer_name)
                 VALUES (?1, ?2, ?3)",
                params![id, record.declaration.agreed, record.declaration.officer_name],
            )?;

            let stored = fetch_record(&tx, &record.application_id)?.ok_or(RepositoryError::NotFound)?;
            tx.commit()?;
            debug!(application_id = %record.application_id, "application rows written");
            Ok(InsertOutcome::Created(stored))
        })
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.with_conn(|conn| fetch_record(conn, id))
    }

    fn search(
        &self,
        query: &ApplicationQuery,
        paging: Paging,
    ) -> Result<Page<ApplicationSummary>, RepositoryError> {
        self.with_conn(|conn| {
            let mut conditions: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(term) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
                conditions.push(
                    "(p.full_name LIKE ? ESCAPE '\\' OR p.email LIKE ? ESCAPE '\\' \
                     OR a.application_id LIKE ? ESCAPE '\\')",
                );
                let pattern = like_pattern(term);
                values.push(Box::new(pattern.clone()));
                values.push(Box::new(pattern.clone()));
                values.push(Box::new(pattern));
            }
            if let Some(status) = query.status {
                conditions.push("a.status = ?");
                values.push(Box::new(status.label()));
            }
            if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
                conditions.push("lower(pr.category) = lower(?)");
                values.push(Box::new(category.trim().to_string()));
            }

            let filter = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", conditions.join(" AND "))
            };
            let from = "FROM applications a
                JOIN application_personal p ON p.application_id = a.application_id
                JOIN application_programs pr ON pr.application_id = a.application_id
                JOIN application_farms f ON f.application_id = a.application_id";

            let refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) {from}{filter}"),
                refs.as_slice(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT a.application_id, p.full_name, p.email, p.phone_number, pr.category,
                        f.location, a.status, a.submitted_at
                 {from}{filter}
                 ORDER BY a.submitted_at DESC
                 LIMIT {} OFFSET {}",
                paging.limit,
                paging.offset()
            );
            debug!(sql = %sql, "searching applications");
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(refs.as_slice(), |row| {
                    Ok(ApplicationSummary {
                        application_id: ApplicationId(row.get(0)?),
                        full_name: row.get(1)?,
                        email: row.get(2)?,
                        phone_number: row.get(3)?,
                        category: row.get(4)?,
                        location: row.get(5)?,
                        status: parse_status(row.get(6)?)?,
                        submitted_at: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(paging.wrap(items, count_to_u64(total)))
        })
    }

    fn recipients(&self, cohort: &ApplicantCohort) -> Result<Vec<Recipient>, RepositoryError> {
        self.with_conn(|conn| {
            let mut conditions: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();
            if let Some(status) = cohort.status {
                conditions.push("a.status = ?");
                values.push(Box::new(status.label()));
            }
            if let Some(category) = cohort.category.as_deref().filter(|c| !c.trim().is_empty()) {
                conditions.push("lower(pr.category) = lower(?)");
                values.push(Box::new(category.trim().to_string()));
            }
            if let Some(location) = cohort.location.as_deref().filter(|l| !l.trim().is_empty()) {
                conditions.push("f.location LIKE ? ESCAPE '\\'");
                values.push(Box::new(like_pattern(location)));
            }
            let filter = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", conditions.join(" AND "))
            };
            let sql = format!(
                "SELECT lower(p.email), MIN(p.full_name)
                 FROM applications a
                 JOIN application_personal p ON p.application_id = a.application_id
                 JOIN application_programs pr ON pr.application_id = a.application_id
                 JOIN application_farms f ON f.application_id = a.application_id{filter}
                 GROUP BY lower(p.email)
                 ORDER BY MIN(a.submitted_at) ASC"
            );
            let refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
            let mut stmt = conn.prepare(&sql)?;
            let recipients = stmt
                .query_map(refs.as_slice(), |row| {
                    Ok(Recipient {
                        email: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(recipients)
        })
    }

    fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE applications SET status = ?1, updated_at = ?2 WHERE application_id = ?3",
                params![status.label(), Utc::now(), id.as_str()],
            )?;
            if changed == 0 {
                return Err(RepositoryError::NotFound);
            }
            fetch_record(conn, id)?.ok_or(RepositoryError::NotFound)
        })
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM applications WHERE application_id = ?1",
                params![id.as_str()],
            )?;
            if removed == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        self.with_conn(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM applications", [], |row| row.get(0))?;
            Ok(count_to_u64(total))
        })
    }
}
