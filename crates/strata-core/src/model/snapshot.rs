//! Immutable snapshot metadata.
//!
//! A snapshot is a versioned, immutable copy of a data source's records.
//! Once created, its records and schema never change; it is destroyed
//! only by explicit delete or retention cleanup. Version numbers per
//! data source are strictly increasing integers starting at 1.

use crate::model::schema::Schema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// Live and visible to reads
    Committed,
    /// Logically deleted while pinned; invisible to reads, purged when
    /// the last pin drops
    Retired,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Committed => "committed",
            SnapshotStatus::Retired => "retired",
        }
    }

    pub fn parse(s: &str) -> Option<SnapshotStatus> {
        match s {
            "committed" => Some(SnapshotStatus::Committed),
            "retired" => Some(SnapshotStatus::Retired),
            _ => None,
        }
    }
}

/// Auxiliary snapshot metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// SHA-256 over the canonical JSON of the record set
    pub checksum: String,
    /// Source file type hint recorded by the import layer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Free-form metadata supplied by the caller
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One immutable snapshot of a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier (UUIDv7)
    pub snapshot_id: String,
    /// Owning data source
    pub data_source_id: String,
    /// Version within the data source (1-based, strictly increasing)
    pub version: i64,
    /// Schema inferred at creation time
    pub schema: Schema,
    /// Number of records in the partition
    pub record_count: i64,
    /// Checksum, file type, and caller metadata
    pub metadata: SnapshotMetadata,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: SnapshotStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [SnapshotStatus::Committed, SnapshotStatus::Retired] {
            assert_eq!(SnapshotStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SnapshotStatus::parse("bogus"), None);
    }
}
