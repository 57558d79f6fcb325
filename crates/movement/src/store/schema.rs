//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use super::RepositoryError;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create every table if missing and record the schema version.
pub fn init_schema(conn: &Connection) -> Result<(), RepositoryError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let current: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .ok();

    conn.execute_batch(APPLICATIONS_SCHEMA)?;
    conn.execute_batch(MEMBERS_SCHEMA)?;
    conn.execute_batch(OPERATIONS_SCHEMA)?;
    conn.execute_batch(INDEXES_SCHEMA)?;

    if current != Some(SCHEMA_VERSION) {
        info!(version = SCHEMA_VERSION, "database schema initialised");
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

const APPLICATIONS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    application_id TEXT PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'pending',
    submitted_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS application_programs (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    previous_training INTEGER NOT NULL,
    training_id TEXT
);

CREATE TABLE IF NOT EXISTS application_personal (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    address TEXT NOT NULL,
    gender TEXT NOT NULL,
    date_of_birth TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS application_farms (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    location TEXT NOT NULL,
    size REAL NOT NULL,
    farm_type TEXT NOT NULL,
    practices TEXT NOT NULL,
    challenges TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS application_grants (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    outcomes TEXT NOT NULL,
    budget_file_url TEXT NOT NULL,
    budget_file_name TEXT NOT NULL,
    budget_file_size INTEGER NOT NULL,
    budget_file_mime TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS application_trainings (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    preference TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS application_motivations (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    statement TEXT NOT NULL,
    implementation TEXT NOT NULL,
    identity_file_url TEXT NOT NULL,
    identity_file_name TEXT NOT NULL,
    identity_file_size INTEGER NOT NULL,
    identity_file_mime TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS application_declarations (
    application_id TEXT PRIMARY KEY REFERENCES applications(application_id) ON DELETE CASCADE,
    agreed INTEGER NOT NULL,
    officer_name TEXT NOT NULL
);
"#;

const MEMBERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    work_email TEXT NOT NULL UNIQUE,
    date_of_birth TEXT NOT NULL,
    gender TEXT NOT NULL,
    nationality TEXT NOT NULL,
    phone_number TEXT NOT NULL UNIQUE,
    residential_address TEXT NOT NULL,
    emergency_contact TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS member_education (
    member_id INTEGER PRIMARY KEY REFERENCES members(id) ON DELETE CASCADE,
    highest_level TEXT NOT NULL,
    institution_name TEXT NOT NULL,
    field_of_study TEXT NOT NULL,
    other_certifications TEXT
);
"#;

const OPERATIONS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS recoveries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS admins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'admin',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS email_templates (
    name TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    synced_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS email_tracking (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider_id TEXT NOT NULL UNIQUE,
    recipient TEXT NOT NULL,
    template TEXT NOT NULL,
    subject TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'sent',
    sent_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_personal_email ON application_personal(email);
CREATE INDEX IF NOT EXISTS idx_personal_phone ON application_personal(phone_number);
CREATE INDEX IF NOT EXISTS idx_applications_submitted ON applications(submitted_at);
CREATE INDEX IF NOT EXISTS idx_recoveries_status ON recoveries(status);
CREATE INDEX IF NOT EXISTS idx_tracking_status ON email_tracking(status);
"#;
