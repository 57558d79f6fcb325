//! CSV source for bulk recovery creation (`email,type` header).

use serde::Deserialize;
use std::io::Read;

use super::domain::RecoveryEntry;

#[derive(Debug, thiserror::Error)]
pub enum RecoveryImportError {
    #[error("failed to read recovery csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("recovery csv has no entries")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RecoveryRow {
    #[serde(alias = "Email", alias = "EMAIL")]
    email: String,
    #[serde(rename = "type", alias = "Type", alias = "TYPE", default)]
    kind: String,
}

/// Rows are passed through untouched; per-entry validation happens in the service.
pub fn parse_entries<R: Read>(reader: R) -> Result<Vec<RecoveryEntry>, RecoveryImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for record in csv_reader.deserialize::<RecoveryRow>() {
        let row = record?;
        if row.email.is_empty() {
            continue;
        }
        entries.push(RecoveryEntry {
            email: row.email,
            kind: row.kind,
        });
    }

    if entries.is_empty() {
        return Err(RecoveryImportError::Empty);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_skips_blank_emails() {
        let csv = "Email,Type\n ada@example.com , join-movement\n,application\nbob@example.com,application\n";
        let entries = parse_entries(csv.as_bytes()).expect("parses");
        assert_eq!(
            entries,
            vec![
                RecoveryEntry {
                    email: "ada@example.com".to_string(),
                    kind: "join-movement".to_string(),
                },
                RecoveryEntry {
                    email: "bob@example.com".to_string(),
                    kind: "application".to_string(),
                },
            ]
        );
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = parse_entries("email,type\n".as_bytes()).expect_err("no rows");
        assert!(matches!(err, RecoveryImportError::Empty));
    }
}
