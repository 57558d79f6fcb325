use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use super::{count_to_u64, like_pattern, RepositoryError, SqliteStore};
use crate::notify::Recipient;
use crate::paging::{Page, Paging};
use crate::workflows::members::{
    Education, EmergencyContact, MemberCohort, MemberField, MemberProbe, MemberQuery,
    MemberRecord, MemberRepository, MemberSummary, NewMember,
};

const MEMBER_SELECT: &str = "SELECT m.id, m.first_name, m.last_name, m.email, m.work_email,
        m.date_of_birth, m.gender, m.nationality, m.phone_number, m.residential_address,
        m.emergency_contact, m.created_at, m.updated_at,
        e.highest_level, e.institution_name, e.field_of_study, e.other_certifications
    FROM members m
    JOIN member_education e ON e.member_id = m.id";

fn member_from_row(row: &Row<'_>) -> Result<MemberRecord, rusqlite::Error> {
    let contact: String = row.get(10)?;
    let emergency_contact: EmergencyContact = serde_json::from_str(&contact).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(MemberRecord {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        work_email: row.get(4)?,
        date_of_birth: row.get(5)?,
        gender: row.get(6)?,
        nationality: row.get(7)?,
        phone_number: row.get(8)?,
        residential_address: row.get(9)?,
        emergency_contact,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        education: Education {
            highest_level: row.get(13)?,
            institution_name: row.get(14)?,
            field_of_study: row.get(15)?,
            other_certifications: row.get(16)?,
        },
    })
}

pub(super) fn fetch_member_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<MemberRecord>, RepositoryError> {
    let sql = format!("{MEMBER_SELECT} WHERE lower(m.email) = lower(?1)");
    Ok(conn
        .query_row(&sql, params![email], member_from_row)
        .optional()?)
}

fn fetch_member(conn: &Connection, id: i64) -> Result<Option<MemberRecord>, RepositoryError> {
    let sql = format!("{MEMBER_SELECT} WHERE m.id = ?1");
    Ok(conn.query_row(&sql, params![id], member_from_row).optional()?)
}

fn contact_json(contact: &EmergencyContact) -> Result<String, RepositoryError> {
    serde_json::to_string(contact)
        .map_err(|err| RepositoryError::Unavailable(format!("encode emergency contact: {err}")))
}

/// Inserts a new member or overwrites the one owning `member.email`, education included.
pub(super) fn upsert_member(
    conn: &Connection,
    member: &NewMember,
) -> Result<MemberRecord, RepositoryError> {
    let profile = &member.profile;
    let contact = contact_json(&profile.emergency_contact)?;
    let now = Utc::now();

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM members WHERE lower(email) = lower(?1)",
            params![member.email],
            |row| row.get(0),
        )
        .optional()?;

    let member_id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE members SET first_name = ?1, last_name = ?2, work_email = ?3,
                    date_of_birth = ?4, gender = ?5, nationality = ?6, phone_number = ?7,
                    residential_address = ?8, emergency_contact = ?9, updated_at = ?10
                 WHERE id = ?11",
                params![
                    profile.first_name,
                    profile.last_name,
                    member.work_email,
                    profile.date_of_birth,
                    profile.gender,
                    profile.nationality,
                    profile.phone_number,
                    profile.residential_address,
                    contact,
                    now,
                    id
                ],
            )?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO members (first_name, last_name, email, work_email, date_of_birth,
                    gender, nationality, phone_number, residential_address, emergency_contact,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    profile.first_name,
                    profile.last_name,
                    member.email,
                    member.work_email,
                    profile.date_of_birth,
                    profile.gender,
                    profile.nationality,
                    profile.phone_number,
                    profile.residential_address,
                    contact,
                    now
                ],
            )?;
            conn.last_insert_rowid()
        }
    };

    let education = &profile.education;
    conn.execute(
        "INSERT INTO member_education
            (member_id, highest_level, institution_name, field_of_study, other_certifications)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(member_id) DO UPDATE SET
            highest_level = excluded.highest_level,
            institution_name = excluded.institution_name,
            field_of_study = excluded.field_of_study,
            other_certifications = excluded.other_certifications",
        params![
            member_id,
            education.highest_level,
            education.institution_name,
            education.field_of_study,
            education.other_certifications
        ],
    )?;

    fetch_member(conn, member_id)?.ok_or(RepositoryError::NotFound)
}

fn find_conflict_in(
    conn: &Connection,
    probe: &MemberProbe<'_>,
) -> Result<Option<MemberField>, RepositoryError> {
    let excluded = probe.exclude_email.unwrap_or("");
    let taken = |column: &str, value: &str| -> Result<bool, RepositoryError> {
        let sql = format!(
            "SELECT 1 FROM members WHERE lower({column}) = lower(?1) AND lower(email) != lower(?2) LIMIT 1"
        );
        let hit: Option<i64> = conn
            .query_row(&sql, params![value, excluded], |row| row.get(0))
            .optional()?;
        Ok(hit.is_some())
    };

    if let Some(email) = probe.email {
        if taken("email", email)? {
            return Ok(Some(MemberField::Email));
        }
    }
    if taken("phone_number", probe.phone_number)? {
        return Ok(Some(MemberField::PhoneNumber));
    }
    if taken("work_email", probe.work_email)? {
        return Ok(Some(MemberField::WorkEmail));
    }
    Ok(None)
}

impl MemberRepository for SqliteStore {
    fn find_conflict(&self, probe: &MemberProbe<'_>) -> Result<Option<MemberField>, RepositoryError> {
        self.with_conn(|conn| find_conflict_in(conn, probe))
    }

    fn insert(&self, member: NewMember) -> Result<MemberRecord, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if fetch_member_by_email(&tx, &member.email)?.is_some() {
                return Err(RepositoryError::Conflict("email".to_string()));
            }
            let stored = upsert_member(&tx, &member)?;
            tx.commit()?;
            Ok(stored)
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<MemberRecord>, RepositoryError> {
        self.with_conn(|conn| fetch_member(conn, id))
    }

    fn search(
        &self,
        query: &MemberQuery,
        paging: Paging,
    ) -> Result<Page<MemberSummary>, RepositoryError> {
        self.with_conn(|conn| {
            let mut filter = String::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();
            if let Some(term) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
                filter.push_str(
                    " WHERE (first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\' \
                     OR email LIKE ?1 ESCAPE '\\' OR work_email LIKE ?1 ESCAPE '\\')",
                );
                values.push(Box::new(like_pattern(term)));
            }
            let refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM members{filter}"),
                refs.as_slice(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT id, first_name, last_name, email, work_email, phone_number, nationality,
                        created_at
                 FROM members{filter}
                 ORDER BY created_at DESC, id DESC
                 LIMIT {} OFFSET {}",
                paging.limit,
                paging.offset()
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(refs.as_slice(), |row| {
                    Ok(MemberSummary {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        email: row.get(3)?,
                        work_email: row.get(4)?,
                        phone_number: row.get(5)?,
                        nationality: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(paging.wrap(items, count_to_u64(total)))
        })
    }

    fn recipients(
        &self,
        cohort: &MemberCohort,
        today: NaiveDate,
    ) -> Result<Vec<Recipient>, RepositoryError> {
        self.with_conn(|conn| {
            let mut conditions: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();
            if let Some(nationality) = cohort.nationality.as_deref().filter(|v| !v.trim().is_empty()) {
                conditions.push("lower(nationality) = lower(?)");
                values.push(Box::new(nationality.trim().to_string()));
            }
            if let Some(gender) = cohort.gender.as_deref().filter(|v| !v.trim().is_empty()) {
                conditions.push("lower(gender) = lower(?)");
                values.push(Box::new(gender.trim().to_string()));
            }
            if let Some(range) = cohort.age_range {
                match range.birth_window(today) {
                    Some((earliest, latest)) if range.min <= range.max => {
                        conditions.push("date_of_birth > ? AND date_of_birth <= ?");
                        values.push(Box::new(earliest));
                        values.push(Box::new(latest));
                    }
                    _ => return Ok(Vec::new()),
                }
            }
            let filter = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", conditions.join(" AND "))
            };
            let refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
            let mut stmt = conn.prepare(&format!(
                "SELECT email, first_name || ' ' || last_name FROM members{filter} ORDER BY id"
            ))?;
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

    fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            if conn.execute("DELETE FROM members WHERE id = ?1", params![id])? == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
            Ok(count_to_u64(total))
        })
    }
}
