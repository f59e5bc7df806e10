//! strata-core — domain logic for the strata snapshot/transform engine
//!
//! This crate is pure computation: no SQLite, no filesystem. It provides:
//!
//! - **model**: the dynamic record/value model, schema inference, snapshot
//!   and pipeline definitions, the execution state machine
//! - **diff**: the snapshot comparison engine
//! - **transform**: the pipeline step executor (closed step union)
//! - **lineage**: the data-flow DAG with cycle detection
//! - **errors**: the structured error facility
//! - **logging_facility**: tracing init + canonical operation macros
//! - **digest**: deterministic SHA-256 checksums over record sets

pub mod diff;
pub mod digest;
pub mod errors;
pub mod lineage;
pub mod logging_facility;
pub mod model;
pub mod transform;
