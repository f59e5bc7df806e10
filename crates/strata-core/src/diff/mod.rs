//! Snapshot comparison.
//!
//! [`engine`] holds the algorithm, [`model`] the output types.

pub mod engine;
pub mod model;

pub use engine::compute_comparison;
pub use model::{Comparison, DiffOptions, DuplicateKeyPolicy};
