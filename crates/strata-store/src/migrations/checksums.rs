//! Migration checksum computation
//!
//! SHA-256 over the raw migration SQL, hex-encoded. A changed checksum
//! for an already-applied migration means the embedded SQL drifted from
//! what the database was built with.

use sha2::{Digest, Sha256};

/// Compute the checksum of a migration's SQL text
pub fn compute_checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hex::encode(hasher.finalize())
}
