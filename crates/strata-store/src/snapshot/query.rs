//! Read-only snapshot queries.
//!
//! `get_latest` resolves through the committed history (the pointer
//! table is a high-water mark and may exceed the newest committed row
//! after deletes). Record reads page through the per-snapshot partition
//! ordered by ordinal.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::snapshot::{
    fetch_status, raw_snapshot_from_row, snapshot_from_raw, SnapshotStore, SNAPSHOT_COLUMNS,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::OptionalExtension;
use strata_core::errors::{StrataError, StrataErrorKind};
use strata_core::model::snapshot::Snapshot;
use strata_core::model::value::Record;

/// Optional filters for snapshot listings.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFilters {
    pub min_version: Option<i64>,
    pub max_version: Option<i64>,
    pub limit: Option<usize>,
}

impl SnapshotStore {
    /// The most recent committed snapshot of a data source, if any.
    pub fn get_latest(&self, data_source_id: &str) -> Result<Option<Snapshot>> {
        let conn = self.lock_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM snapshots
                     WHERE data_source_id = ?1 AND status = 'committed'
                     ORDER BY version DESC LIMIT 1",
                    SNAPSHOT_COLUMNS
                ),
                [data_source_id],
                raw_snapshot_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        raw.map(snapshot_from_raw).transpose()
    }

    /// Fetch a committed snapshot by id.
    ///
    /// # Errors
    ///
    /// `NotFound` — no committed row with this id exists (retired rows
    /// are invisible here).
    pub fn get_by_id(&self, snapshot_id: &str) -> Result<Snapshot> {
        let conn = self.lock_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM snapshots
                     WHERE snapshot_id = ?1 AND status = 'committed'",
                    SNAPSHOT_COLUMNS
                ),
                [snapshot_id],
                raw_snapshot_from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        match raw {
            Some(raw) => snapshot_from_raw(raw),
            None => Err(StrataError::new(StrataErrorKind::NotFound)
                .with_op("get_by_id")
                .with_snapshot_id(snapshot_id)
                .with_message("snapshot not found")),
        }
    }

    /// List committed snapshots of a data source, version ascending.
    pub fn list_by_data_source(
        &self,
        data_source_id: &str,
        filters: &SnapshotFilters,
    ) -> Result<Vec<Snapshot>> {
        let mut sql = format!(
            "SELECT {} FROM snapshots
             WHERE data_source_id = ?1 AND status = 'committed'",
            SNAPSHOT_COLUMNS
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(data_source_id.to_string())];

        if let Some(min) = filters.min_version {
            params.push(SqlValue::Integer(min));
            sql.push_str(&format!(" AND version >= ?{}", params.len()));
        }
        if let Some(max) = filters.max_version {
            params.push(SqlValue::Integer(max));
            sql.push_str(&format!(" AND version <= ?{}", params.len()));
        }
        sql.push_str(" ORDER BY version");
        if let Some(limit) = filters.limit {
            params.push(SqlValue::Integer(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows: std::result::Result<Vec<_>, _> = stmt
            .query_map(rusqlite::params_from_iter(params), raw_snapshot_from_row)
            .map_err(from_rusqlite)?
            .collect();
        rows.map_err(from_rusqlite)?
            .into_iter()
            .map(snapshot_from_raw)
            .collect()
    }

    /// Paginated record view over one snapshot's partition.
    ///
    /// Works for committed rows and for retired rows still held by a
    /// pin, so a running diff keeps reading after a concurrent delete
    /// was deferred.
    ///
    /// # Errors
    ///
    /// `NotFound` — the snapshot row no longer exists at all.
    pub fn read_records(
        &self,
        snapshot_id: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Record>> {
        let conn = self.lock_conn()?;
        if fetch_status(&conn, snapshot_id)?.is_none() {
            return Err(StrataError::new(StrataErrorKind::NotFound)
                .with_op("read_records")
                .with_snapshot_id(snapshot_id)
                .with_message("snapshot not found"));
        }

        // SQLite: LIMIT -1 means "no limit"
        let limit_value: i64 = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn
            .prepare(
                "SELECT record_json FROM snapshot_records
                 WHERE snapshot_id = ?1
                 ORDER BY ordinal
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(from_rusqlite)?;
        let rows: std::result::Result<Vec<String>, _> = stmt
            .query_map(
                rusqlite::params![snapshot_id, limit_value, offset as i64],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?
            .collect();

        rows.map_err(from_rusqlite)?
            .into_iter()
            .map(|json| {
                serde_json::from_str::<Record>(&json).map_err(|e| {
                    StrataError::new(StrataErrorKind::Serialization)
                        .with_op("read_records")
                        .with_snapshot_id(snapshot_id)
                        .with_message(format!("invalid record_json: {}", e))
                })
            })
            .collect()
    }

    /// Convenience: the whole record partition of one snapshot.
    pub fn read_all_records(&self, snapshot_id: &str) -> Result<Vec<Record>> {
        self.read_records(snapshot_id, None, 0)
    }

    /// The pointer-table high-water mark for a data source, if the
    /// source exists.
    pub fn current_version(&self, data_source_id: &str) -> Result<Option<i64>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT current_version FROM data_sources WHERE id = ?1",
            [data_source_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::NewSnapshot;
    use serde_json::json;
    use strata_core::model::value::records_from_json;

    fn store_with_snapshot(n_records: usize) -> (SnapshotStore, String) {
        let store = SnapshotStore::open_in_memory().unwrap();
        let records: Vec<serde_json::Value> =
            (0..n_records).map(|i| json!({"id": i, "v": i * 10})).collect();
        let records = records_from_json(serde_json::Value::Array(records)).unwrap();
        let snapshot = store
            .create_snapshot(NewSnapshot::new("ds:test", records))
            .unwrap();
        (store, snapshot.snapshot_id)
    }

    #[test]
    fn test_get_latest_tracks_newest() {
        let (store, _) = store_with_snapshot(2);
        let records = records_from_json(json!([{"id": 9, "v": 9}])).unwrap();
        let second = store
            .create_snapshot(NewSnapshot::new("ds:test", records))
            .unwrap();
        let latest = store.get_latest("ds:test").unwrap().unwrap();
        assert_eq!(latest.snapshot_id, second.snapshot_id);
        assert_eq!(latest.version, 2);
    }

    #[test]
    fn test_get_latest_unknown_source_is_none() {
        let store = SnapshotStore::open_in_memory().unwrap();
        assert!(store.get_latest("ds:nope").unwrap().is_none());
    }

    #[test]
    fn test_get_by_id_not_found() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let err = store.get_by_id("snap:nope").unwrap_err();
        assert_eq!(err.kind(), StrataErrorKind::NotFound);
    }

    #[test]
    fn test_pagination_is_ordinal_ordered() {
        let (store, id) = store_with_snapshot(10);
        let page = store.read_records(&id, Some(3), 4).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(
            page[0]["id"],
            strata_core::model::value::FieldValue::Number(4.0)
        );
        assert_eq!(
            page[2]["id"],
            strata_core::model::value::FieldValue::Number(6.0)
        );
    }

    #[test]
    fn test_pagination_past_end_is_empty() {
        let (store, id) = store_with_snapshot(3);
        assert!(store.read_records(&id, Some(5), 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_by_version_range() {
        let (store, _) = store_with_snapshot(1);
        for _ in 0..4 {
            let records = records_from_json(json!([{"id": 1, "v": 1}])).unwrap();
            store
                .create_snapshot(NewSnapshot::new("ds:test", records))
                .unwrap();
        }
        let filters = SnapshotFilters {
            min_version: Some(2),
            max_version: Some(4),
            limit: None,
        };
        let listed = store.list_by_data_source("ds:test", &filters).unwrap();
        let versions: Vec<i64> = listed.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![2, 3, 4]);
    }

    #[test]
    fn test_list_limit() {
        let (store, _) = store_with_snapshot(1);
        for _ in 0..3 {
            let records = records_from_json(json!([{"id": 1, "v": 1}])).unwrap();
            store
                .create_snapshot(NewSnapshot::new("ds:test", records))
                .unwrap();
        }
        let filters = SnapshotFilters {
            limit: Some(2),
            ..SnapshotFilters::default()
        };
        assert_eq!(store.list_by_data_source("ds:test", &filters).unwrap().len(), 2);
    }
}
