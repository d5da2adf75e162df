//! Dataset sources, import runs and the provenance that makes re-imports
//! idempotent.

use chrono::{DateTime, Utc};

use super::models::{DataSource, ImportRecord, ImportRowError, ImportRun, ImportStatus};
use super::{Store, Tables};

pub const PARSER_VERSION: &str = "v1_csv";
const SOURCE_LICENSE: &str = "CC-BY-4.0";

/// Parsed content of one dataset file, ready to be applied.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub source_name: String,
    pub source_url: String,
    pub sha256_hash: String,
    pub rows_read: usize,
    pub records: Vec<ImportRecord>,
    pub errors: Vec<ImportRowError>,
    pub started_at: DateTime<Utc>,
}

impl Tables {
    /// Source registered under `name`, created on first use. Its
    /// `retrieved_at` moves to now either way.
    fn touch_source(&mut self, name: &str, url: &str) -> u64 {
        let now = Utc::now();
        if let Some(source) = self.sources.rows.values_mut().find(|s| s.name == name) {
            source.url = url.to_string();
            source.retrieved_at = now;
            return source.id;
        }
        let id = self.sources.allocate();
        self.sources.rows.insert(
            id,
            DataSource {
                id,
                name: name.to_string(),
                url: url.to_string(),
                license: SOURCE_LICENSE.to_string(),
                retrieved_at: now,
            },
        );
        id
    }

    fn push_run(&mut self, mut run: ImportRun) -> ImportRun {
        run.id = self.imports.allocate();
        self.imports.rows.insert(run.id, run.clone());
        run
    }
}

impl Store {
    /// Apply a parsed batch in one write. A record already imported from the
    /// same source updates its event's title, location and times; anything
    /// else becomes a new event.
    pub fn apply_import(&self, batch: ImportBatch) -> ImportRun {
        let mut tables = self.tables.write();
        let source_id = tables.touch_source(&batch.source_name, &batch.source_url);

        let (mut inserted, mut updated) = (0, 0);
        for record in batch.records {
            let key = (source_id, record.record_id);
            let existing = tables
                .provenance
                .get(&key)
                .copied()
                .filter(|id| tables.events.rows.contains_key(id));
            match existing {
                Some(event_id) => {
                    if let Some(event) = tables.events.rows.get_mut(&event_id) {
                        event.title = record.event.title;
                        event.location = record.event.location;
                        event.start_time = record.event.start_time;
                        event.end_time = record.event.end_time;
                    }
                    updated += 1;
                }
                None => {
                    let event = tables.insert_event(record.event);
                    tables.provenance.insert(key, event.id);
                    inserted += 1;
                }
            }
        }

        let status = if batch.errors.is_empty() {
            ImportStatus::Success
        } else {
            ImportStatus::PartialSuccess
        };
        tables.push_run(ImportRun {
            id: 0,
            data_source_id: source_id,
            status,
            started_at: batch.started_at,
            finished_at: Utc::now(),
            rows_read: batch.rows_read,
            rows_inserted: inserted,
            rows_updated: updated,
            errors: batch.errors,
            sha256_hash: Some(batch.sha256_hash),
            parser_version: PARSER_VERSION,
        })
    }

    /// Record an import that could not be read at all.
    pub fn record_failed_import(
        &self,
        source_name: &str,
        source_url: &str,
        started_at: DateTime<Utc>,
        error: String,
    ) -> ImportRun {
        let mut tables = self.tables.write();
        let source_id = tables.touch_source(source_name, source_url);
        tables.push_run(ImportRun {
            id: 0,
            data_source_id: source_id,
            status: ImportStatus::Failed,
            started_at,
            finished_at: Utc::now(),
            rows_read: 0,
            rows_inserted: 0,
            rows_updated: 0,
            errors: vec![ImportRowError { row: 0, error }],
            sha256_hash: None,
            parser_version: PARSER_VERSION,
        })
    }

    /// Most recent runs first.
    pub fn list_imports(&self, limit: usize) -> Vec<ImportRun> {
        self.tables
            .read()
            .imports
            .rows
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// The most recently retrieved source and its latest run.
    pub fn dataset_meta(&self) -> Option<(DataSource, Option<ImportRun>)> {
        let tables = self.tables.read();
        let source = tables
            .sources
            .rows
            .values()
            .max_by_key(|s| (s.retrieved_at, s.id))?
            .clone();
        let last_run = tables
            .imports
            .rows
            .values()
            .rev()
            .find(|r| r.data_source_id == source.id)
            .cloned();
        Some((source, last_run))
    }
}
