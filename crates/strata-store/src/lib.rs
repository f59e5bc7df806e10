//! strata-store — persistence layer for the strata engine
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - The snapshot store: serialized version allocation, per-snapshot
//!   record partitions, a latest-version pointer table
//! - Snapshot pinning (reference counts with deferred deletes)
//! - The retention/cleanup engine
//! - Lineage edge persistence with DAG enforcement
//! - The execution ledger

pub mod db;
pub mod errors;
pub mod executions;
pub mod lineage;
pub mod migrations;
pub mod pins;
pub mod retention;
pub mod snapshot;

// Re-export key types
pub use errors::Result;
pub use pins::SnapshotPin;
pub use retention::CleanupReport;
pub use snapshot::{DeleteOutcome, NewSnapshot, SnapshotFilters, SnapshotStore};
