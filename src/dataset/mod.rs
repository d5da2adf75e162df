//! CSV dataset import.
//!
//! A file is read whole, hashed, then parsed row by row. Rows that fail to
//! parse or validate are reported in the run; the rest are applied to the
//! store in a single write. Both the `EventId,EventTitle,...,Venue` export
//! header and the plain `id,title,...,location` header are accepted.

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::store::models::{parse_timestamp, EventCreate, ImportRecord, ImportRowError, ImportRun};
use crate::store::{ImportBatch, Store};

/// Column sets a file must carry, as (export name, plain name).
const REQUIRED_COLUMNS: [(&str, &str); 6] = [
    ("EventId", "id"),
    ("EventTitle", "title"),
    ("Venue", "location"),
    ("StartDate", "start_time"),
    ("EndDate", "end_time"),
    ("Capacity", "capacity"),
];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column {0}")]
    MissingColumn(&'static str),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "EventId", alias = "id")]
    record_id: String,
    #[serde(rename = "EventTitle", alias = "title")]
    title: String,
    #[serde(rename = "Description", alias = "description", default)]
    description: Option<String>,
    #[serde(rename = "Venue", alias = "location")]
    location: String,
    #[serde(rename = "StartDate", alias = "start_time")]
    start_time: String,
    #[serde(rename = "EndDate", alias = "end_time")]
    end_time: String,
    #[serde(rename = "Capacity", alias = "capacity")]
    capacity: String,
}

impl CsvRow {
    fn into_record(self) -> Result<ImportRecord, String> {
        if self.record_id.is_empty() {
            return Err("empty record id".into());
        }
        let start_time = parse_timestamp(&self.start_time)
            .ok_or_else(|| format!("invalid start time: {}", self.start_time))?;
        let end_time = parse_timestamp(&self.end_time)
            .ok_or_else(|| format!("invalid end time: {}", self.end_time))?;
        let capacity = self
            .capacity
            .parse::<u32>()
            .map_err(|_| format!("invalid capacity: {}", self.capacity))?;

        let event = EventCreate {
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            location: self.location,
            start_time,
            end_time,
            capacity,
        };
        event.validate().map_err(|err| err.to_string())?;
        Ok(ImportRecord {
            record_id: self.record_id,
            event,
        })
    }
}

/// Rows of a dataset file, split into importable records and row errors.
#[derive(Debug, Default)]
pub struct ParsedDataset {
    pub rows_read: usize,
    pub records: Vec<ImportRecord>,
    pub errors: Vec<ImportRowError>,
}

pub fn parse_csv(bytes: &[u8]) -> Result<ParsedDataset, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    for (export, plain) in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == export || h == plain) {
            return Err(ImportError::MissingColumn(export));
        }
    }

    let mut parsed = ParsedDataset::default();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = index + 1;
        parsed.rows_read += 1;
        match row.map_err(|err| err.to_string()).and_then(CsvRow::into_record) {
            Ok(record) => parsed.records.push(record),
            Err(error) => parsed.errors.push(ImportRowError {
                row: row_number,
                error,
            }),
        }
    }
    Ok(parsed)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Import `path` into `store` under `source_name`.
///
/// A file that cannot be read or has an unusable header leaves a failed run
/// behind and returns the error.
pub async fn import_file(
    store: &Store,
    source_name: &str,
    path: &Path,
) -> Result<ImportRun, ImportError> {
    let started_at = Utc::now();
    let source_url = format!("file://{}", path.display());

    let outcome = match tokio::fs::read(path).await {
        Ok(bytes) => parse_csv(&bytes).map(|parsed| (sha256_hex(&bytes), parsed)),
        Err(err) => Err(err.into()),
    };

    match outcome {
        Ok((sha256_hash, parsed)) => {
            let run = store.apply_import(ImportBatch {
                source_name: source_name.to_string(),
                source_url,
                sha256_hash,
                rows_read: parsed.rows_read,
                records: parsed.records,
                errors: parsed.errors,
                started_at,
            });
            tracing::info!(
                run_id = run.id,
                status = ?run.status,
                rows_read = run.rows_read,
                rows_inserted = run.rows_inserted,
                rows_updated = run.rows_updated,
                row_errors = run.errors.len(),
                "Dataset import finished"
            );
            Ok(run)
        }
        Err(err) => {
            let run = store.record_failed_import(source_name, &source_url, started_at, err.to_string());
            tracing::warn!(run_id = run.id, error = %err, "Dataset import failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::ImportStatus;

    const EXPORT: &str = "\
EventId,EventTitle,Description,Venue,StartDate,EndDate,Capacity,Category
E1,Harbour Fair,,Quayside,2030-05-10T10:00:00,2030-05-10T16:00:00,50,Festival
E2,Night Market,Food stalls,Old Square,2030-06-01T18:00:00Z,2030-06-01T23:00:00Z,200,Food
";

    #[test]
    fn export_header_parses() {
        let parsed = parse_csv(EXPORT.as_bytes()).unwrap();
        assert_eq!(parsed.rows_read, 2);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.records[0].record_id, "E1");
        assert_eq!(parsed.records[0].event.location, "Quayside");
        assert_eq!(parsed.records[0].event.description, None);
        assert_eq!(parsed.records[1].event.capacity, 200);
    }

    #[test]
    fn plain_header_parses() {
        let csv = "id,title,description,location,start_time,end_time,capacity\n\
                   X1,Workshop,Hands on,Tech Hub,2030-05-10T10:00:00,2030-05-10T12:00:00,30\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].event.title, "Workshop");
    }

    #[test]
    fn bad_rows_are_reported_with_their_number() {
        let csv = "id,title,location,start_time,end_time,capacity\n\
                   A,Fine,Hall,2030-01-01T10:00:00,2030-01-01T11:00:00,5\n\
                   B,Backwards,Hall,2030-01-01T10:00:00,2030-01-01T09:00:00,5\n\
                   C,Crowd,Hall,2030-01-01T10:00:00,2030-01-01T11:00:00,lots\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows_read, 3);
        assert_eq!(parsed.records.len(), 1);
        let rows: Vec<usize> = parsed.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3]);
        assert!(parsed.errors[1].error.contains("capacity"));
    }

    #[test]
    fn missing_column_rejects_the_file() {
        let err = parse_csv(b"id,title\nA,Fair\n").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("Venue")));
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn import_file_is_idempotent_and_records_failures() {
        let dir = std::env::temp_dir().join(format!("event-api-import-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("events.csv");
        std::fs::write(&path, EXPORT).unwrap();

        let store = Store::new();
        let first = import_file(&store, "Harbour feed", &path).await.unwrap();
        assert_eq!(first.status, ImportStatus::Success);
        assert_eq!(first.rows_inserted, 2);
        assert_eq!(first.sha256_hash.as_deref(), Some(sha256_hex(EXPORT.as_bytes()).as_str()));

        let second = import_file(&store, "Harbour feed", &path).await.unwrap();
        assert_eq!((second.rows_inserted, second.rows_updated), (0, 2));

        let missing = dir.join("absent.csv");
        assert!(matches!(
            import_file(&store, "Harbour feed", &missing).await,
            Err(ImportError::Io(_))
        ));
        assert_eq!(store.list_imports(1)[0].status, ImportStatus::Failed);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
