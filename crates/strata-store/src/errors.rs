//! Error handling for strata-store
//!
//! Wraps the strata-core error facility with store-specific helpers

use strata_core::errors::{StrataError, StrataErrorKind};

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> StrataError {
    StrataError::new(StrataErrorKind::Storage)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> StrataError {
    StrataError::new(StrataErrorKind::Storage)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> StrataError {
    StrataError::new(StrataErrorKind::Storage)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> StrataError {
    StrataError::new(StrataErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
