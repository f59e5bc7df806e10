//! The snapshot store.
//!
//! One cloneable handle over a mutex-guarded SQLite connection plus the
//! two pieces of shared mutable state the design allows: the per-data-
//! source version lock registry and the pin table. Everything else is
//! immutable once written.
//!
//! Lock ordering: the pin table is always taken before the connection;
//! the version lock registry is only ever combined with the connection.
//! No path takes the connection first.

#![allow(clippy::result_large_err)]

pub mod delete;
pub mod persist;
pub mod query;

pub use delete::DeleteOutcome;
pub use persist::NewSnapshot;
pub use query::SnapshotFilters;

use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations;
use crate::pins::PinTable;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use strata_core::errors::{StrataError, StrataErrorKind};
use strata_core::model::schema::Schema;
use strata_core::model::snapshot::{Snapshot, SnapshotMetadata, SnapshotStatus};

/// Shared state behind every clone of a [`SnapshotStore`] handle.
pub(crate) struct StoreInner {
    pub(crate) conn: Mutex<Connection>,
    /// Per-data-source critical sections serializing version assignment
    pub(crate) version_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Reference counts pinning snapshots against deletion
    pub(crate) pins: Mutex<PinTable>,
}

/// Cloneable handle to one snapshot store.
#[derive(Clone)]
pub struct SnapshotStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl SnapshotStore {
    /// Open (or create) a store at the given path and apply migrations
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut conn = db::open(path)?;
        db::configure(&conn)?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        db::configure(&conn)?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                version_locks: Mutex::new(HashMap::new()),
                pins: Mutex::new(PinTable::default()),
            }),
        }
    }

    pub(crate) fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.inner.conn.lock().map_err(|_| {
            StrataError::new(StrataErrorKind::Internal)
                .with_op("lock_conn")
                .with_message("connection mutex poisoned")
        })
    }

    pub(crate) fn lock_pins(&self) -> Result<MutexGuard<'_, PinTable>> {
        self.inner.pins.lock().map_err(|_| {
            StrataError::new(StrataErrorKind::Internal)
                .with_op("lock_pins")
                .with_message("pin table mutex poisoned")
        })
    }

    /// The named critical section for one data source
    pub(crate) fn version_lock(&self, data_source_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.inner.version_locks.lock().map_err(|_| {
            StrataError::new(StrataErrorKind::Internal)
                .with_op("version_lock")
                .with_message("version lock registry poisoned")
        })?;
        Ok(locks
            .entry(data_source_id.to_string())
            .or_default()
            .clone())
    }
}

/// Columns of one `snapshots` row, before JSON fields are parsed.
pub(crate) struct RawSnapshotRow {
    pub snapshot_id: String,
    pub data_source_id: String,
    pub version: i64,
    pub record_count: i64,
    pub schema_json: String,
    pub metadata_json: String,
    pub created_at: i64,
    pub status: String,
}

/// Column list matching [`raw_snapshot_from_row`]
pub(crate) const SNAPSHOT_COLUMNS: &str = "snapshot_id, data_source_id, version, record_count, \
     schema_json, metadata_json, created_at, status";

pub(crate) fn raw_snapshot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSnapshotRow> {
    Ok(RawSnapshotRow {
        snapshot_id: row.get(0)?,
        data_source_id: row.get(1)?,
        version: row.get(2)?,
        record_count: row.get(3)?,
        schema_json: row.get(4)?,
        metadata_json: row.get(5)?,
        created_at: row.get(6)?,
        status: row.get(7)?,
    })
}

pub(crate) fn snapshot_from_raw(raw: RawSnapshotRow) -> Result<Snapshot> {
    let schema: Schema = serde_json::from_str(&raw.schema_json).map_err(|e| {
        StrataError::new(StrataErrorKind::Serialization)
            .with_op("snapshot_from_raw")
            .with_snapshot_id(raw.snapshot_id.clone())
            .with_message(format!("invalid schema_json: {}", e))
    })?;
    let metadata: SnapshotMetadata = serde_json::from_str(&raw.metadata_json).map_err(|e| {
        StrataError::new(StrataErrorKind::Serialization)
            .with_op("snapshot_from_raw")
            .with_snapshot_id(raw.snapshot_id.clone())
            .with_message(format!("invalid metadata_json: {}", e))
    })?;
    let status = SnapshotStatus::parse(&raw.status).ok_or_else(|| {
        StrataError::new(StrataErrorKind::Internal)
            .with_op("snapshot_from_raw")
            .with_snapshot_id(raw.snapshot_id.clone())
            .with_message(format!("unknown snapshot status '{}'", raw.status))
    })?;

    Ok(Snapshot {
        created_at: datetime_from_millis(raw.created_at)?,
        snapshot_id: raw.snapshot_id,
        data_source_id: raw.data_source_id,
        version: raw.version,
        schema,
        record_count: raw.record_count,
        metadata,
        status,
    })
}

pub(crate) fn datetime_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        StrataError::new(StrataErrorKind::Internal)
            .with_op("datetime_from_millis")
            .with_message(format!("timestamp out of range: {}", ms))
    })
}

/// Fetch a snapshot's status, `None` when no row exists.
pub(crate) fn fetch_status(conn: &Connection, snapshot_id: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension as _;
    conn.query_row(
        "SELECT status FROM snapshots WHERE snapshot_id = ?1",
        [snapshot_id],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(from_rusqlite)
}
