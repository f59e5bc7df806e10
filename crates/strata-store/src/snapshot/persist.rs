//! Snapshot creation.
//!
//! Version assignment is serialized per data source: the read-latest-
//! version-then-write sequence runs inside that source's named critical
//! section plus one SQLite transaction, so concurrent creates can never
//! produce duplicate or skipped version numbers. A UNIQUE violation on
//! `(data_source_id, version)` is treated as a transient version race
//! and retried a small bounded number of times.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::snapshot::{datetime_from_millis, SnapshotStore};
use chrono::Utc;
use rusqlite::params;
use std::collections::BTreeMap;
use strata_core::digest::compute_records_checksum;
use strata_core::errors::{StrataError, StrataErrorKind};
use strata_core::model::schema::{infer_schema, Schema};
use strata_core::model::snapshot::{Snapshot, SnapshotMetadata, SnapshotStatus};
use strata_core::model::value::Record;

/// Bounded internal retries for version races
const VERSION_ASSIGN_RETRIES: usize = 3;

/// A request to create one snapshot.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub data_source_id: String,
    pub records: Vec<Record>,
    /// Schema override; inferred from the records when absent
    pub schema: Option<Schema>,
    pub file_type: Option<String>,
    pub extra_metadata: BTreeMap<String, serde_json::Value>,
}

impl NewSnapshot {
    pub fn new(data_source_id: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            records,
            schema: None,
            file_type: None,
            extra_metadata: BTreeMap::new(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn with_extra_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_metadata.insert(key.into(), value);
        self
    }
}

impl SnapshotStore {
    /// Create a new immutable snapshot, assigning the next version.
    ///
    /// Infers the schema from the records when none is supplied, computes
    /// the record checksum, and writes the snapshot row, its record
    /// partition, and the pointer-table bump in one transaction.
    ///
    /// # Errors
    ///
    /// - `Validation` — empty data source id
    /// - `SchemaInference` — empty records, or inference failed
    /// - `ConcurrencyConflict` — version race persisted past the bounded
    ///   internal retries
    /// - `Storage` / `Serialization` — SQLite or JSON failure
    pub fn create_snapshot(&self, request: NewSnapshot) -> Result<Snapshot> {
        if request.data_source_id.is_empty() {
            return Err(StrataError::new(StrataErrorKind::Validation)
                .with_op("create_snapshot")
                .with_message("data_source_id must not be empty"));
        }

        // An explicit schema permits an empty snapshot (e.g. a pipeline
        // whose filter kept nothing); without one, inference needs rows.
        let schema = match &request.schema {
            Some(schema) => schema.clone(),
            None => {
                if request.records.is_empty() {
                    return Err(StrataError::new(StrataErrorKind::SchemaInference)
                        .with_op("create_snapshot")
                        .with_data_source_id(request.data_source_id.clone())
                        .with_message("cannot create a snapshot from an empty record set"));
                }
                infer_schema(&request.records).map_err(|e| {
                    e.with_op("create_snapshot")
                        .with_data_source_id(request.data_source_id.clone())
                })?
            }
        };

        let checksum = compute_records_checksum(&request.records)?;
        let metadata = SnapshotMetadata {
            checksum,
            file_type: request.file_type.clone(),
            extra: request.extra_metadata.clone(),
        };

        // Serialize the read-latest → write-new sequence per data source
        let ds_lock = self.version_lock(&request.data_source_id)?;
        let _guard = ds_lock.lock().map_err(|_| {
            StrataError::new(StrataErrorKind::Internal)
                .with_op("create_snapshot")
                .with_message("data source version lock poisoned")
        })?;

        let mut attempt = 0;
        loop {
            match self.insert_versioned(&request, &schema, &metadata) {
                Ok(snapshot) => {
                    tracing::debug!(
                        snapshot_id = %snapshot.snapshot_id,
                        data_source_id = %snapshot.data_source_id,
                        version = snapshot.version,
                        record_count = snapshot.record_count,
                        "Created snapshot"
                    );
                    return Ok(snapshot);
                }
                Err(e)
                    if e.kind() == StrataErrorKind::ConcurrencyConflict
                        && attempt < VERSION_ASSIGN_RETRIES =>
                {
                    attempt += 1;
                    tracing::debug!(
                        data_source_id = %request.data_source_id,
                        attempt,
                        "Version race detected, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One transactional attempt at version assignment and insertion.
    fn insert_versioned(
        &self,
        request: &NewSnapshot,
        schema: &Schema,
        metadata: &SnapshotMetadata,
    ) -> Result<Snapshot> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(from_rusqlite)?;
        let now_ms = Utc::now().timestamp_millis();

        tx.execute(
            "INSERT OR IGNORE INTO data_sources (id, current_version, created_at, updated_at)
             VALUES (?1, 0, ?2, ?2)",
            params![request.data_source_id, now_ms],
        )
        .map_err(from_rusqlite)?;

        let current: i64 = tx
            .query_row(
                "SELECT current_version FROM data_sources WHERE id = ?1",
                [&request.data_source_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        let version = current + 1;

        let snapshot_id = uuid::Uuid::now_v7().to_string();
        let schema_json = serde_json::to_string(schema).map_err(|e| {
            StrataError::new(StrataErrorKind::Serialization)
                .with_op("create_snapshot")
                .with_message(format!("failed to serialize schema: {}", e))
        })?;
        let metadata_json = serde_json::to_string(metadata).map_err(|e| {
            StrataError::new(StrataErrorKind::Serialization)
                .with_op("create_snapshot")
                .with_message(format!("failed to serialize metadata: {}", e))
        })?;

        tx.execute(
            "INSERT INTO snapshots (
                snapshot_id, data_source_id, version, record_count,
                schema_json, checksum, file_type, metadata_json,
                created_at, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                snapshot_id,
                request.data_source_id,
                version,
                request.records.len() as i64,
                schema_json,
                metadata.checksum,
                metadata.file_type,
                metadata_json,
                now_ms,
                SnapshotStatus::Committed.as_str(),
            ],
        )
        .map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StrataError::new(StrataErrorKind::ConcurrencyConflict)
                    .with_op("create_snapshot")
                    .with_data_source_id(request.data_source_id.clone())
                    .with_message(format!("version {} already assigned", version))
            }
            _ => from_rusqlite(e),
        })?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO snapshot_records (snapshot_id, ordinal, record_json)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(from_rusqlite)?;
            for (ordinal, record) in request.records.iter().enumerate() {
                let record_json = serde_json::to_string(record).map_err(|e| {
                    StrataError::new(StrataErrorKind::Serialization)
                        .with_op("create_snapshot")
                        .with_message(format!("failed to serialize record {}: {}", ordinal, e))
                })?;
                stmt.execute(params![snapshot_id, ordinal as i64, record_json])
                    .map_err(from_rusqlite)?;
            }
        }

        tx.execute(
            "UPDATE data_sources SET current_version = ?1, updated_at = ?2 WHERE id = ?3",
            params![version, now_ms, request.data_source_id],
        )
        .map_err(from_rusqlite)?;

        tx.commit().map_err(from_rusqlite)?;

        Ok(Snapshot {
            snapshot_id,
            data_source_id: request.data_source_id.clone(),
            version,
            schema: schema.clone(),
            record_count: request.records.len() as i64,
            metadata: metadata.clone(),
            created_at: datetime_from_millis(now_ms)?,
            status: SnapshotStatus::Committed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::model::value::records_from_json;
    use serde_json::json;

    fn store() -> SnapshotStore {
        SnapshotStore::open_in_memory().unwrap()
    }

    fn sample_records() -> Vec<Record> {
        records_from_json(json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}])).unwrap()
    }

    #[test]
    fn test_first_version_is_one() {
        let store = store();
        let snapshot = store
            .create_snapshot(NewSnapshot::new("ds:orders", sample_records()))
            .unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.record_count, 2);
        assert_eq!(snapshot.status, SnapshotStatus::Committed);
        assert_eq!(snapshot.metadata.checksum.len(), 64);
    }

    #[test]
    fn test_versions_increase_by_one() {
        let store = store();
        for expected in 1..=4 {
            let snapshot = store
                .create_snapshot(NewSnapshot::new("ds:orders", sample_records()))
                .unwrap();
            assert_eq!(snapshot.version, expected);
        }
    }

    #[test]
    fn test_empty_records_rejected() {
        let store = store();
        let err = store
            .create_snapshot(NewSnapshot::new("ds:orders", vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), StrataErrorKind::SchemaInference);
    }

    #[test]
    fn test_empty_records_allowed_with_explicit_schema() {
        let store = store();
        let schema = infer_schema(&sample_records()).unwrap();
        let snapshot = store
            .create_snapshot(NewSnapshot::new("ds:orders", vec![]).with_schema(schema))
            .unwrap();
        assert_eq!(snapshot.record_count, 0);
        assert_eq!(snapshot.version, 1);
    }

    #[test]
    fn test_inconsistent_types_rejected() {
        let store = store();
        let records = records_from_json(json!([{"v": 1}, {"v": "two"}])).unwrap();
        let err = store
            .create_snapshot(NewSnapshot::new("ds:orders", records))
            .unwrap_err();
        assert_eq!(err.kind(), StrataErrorKind::SchemaInference);
    }

    #[test]
    fn test_independent_sources_version_independently() {
        let store = store();
        store
            .create_snapshot(NewSnapshot::new("ds:a", sample_records()))
            .unwrap();
        let b = store
            .create_snapshot(NewSnapshot::new("ds:b", sample_records()))
            .unwrap();
        assert_eq!(b.version, 1);
    }
}
