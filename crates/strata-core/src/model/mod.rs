//! Domain model for the strata engine
//!
//! - [`value`]: dynamic field values and records
//! - [`schema`]: column schema and inference
//! - [`snapshot`]: immutable snapshot metadata
//! - [`pipeline`]: pipeline definitions and the closed transform step union
//! - [`execution`]: pipeline run ledger entries and the status machine
//! - [`lineage`]: directed data-flow edges

pub mod execution;
pub mod lineage;
pub mod pipeline;
pub mod schema;
pub mod snapshot;
pub mod value;

pub use execution::{Execution, ExecutionStatus};
pub use lineage::LineageEdge;
pub use pipeline::{Pipeline, TransformStep};
pub use schema::{ColumnDef, ColumnType, Schema};
pub use snapshot::{Snapshot, SnapshotMetadata, SnapshotStatus};
pub use value::{FieldValue, Record};
