//! Digest computation for record sets and schemas.
//!
//! Provides deterministic SHA256 checksums. Records are `BTreeMap`s, so
//! their canonical JSON serialization is stable and the same record set
//! always produces the same checksum.

use crate::errors::{Result, StrataError, StrataErrorKind};
use crate::model::schema::Schema;
use crate::model::value::Record;
use sha2::{Digest, Sha256};

/// Compute the checksum of a record set.
///
/// ## Returns
///
/// Hex-encoded SHA256 digest (64 characters)
///
/// ## Errors
///
/// Returns `Serialization` if JSON serialization fails.
pub fn compute_records_checksum(records: &[Record]) -> Result<String> {
    let canonical = serde_json::to_string(records).map_err(|e| {
        StrataError::new(StrataErrorKind::Serialization)
            .with_op("compute_records_checksum")
            .with_message(e.to_string())
    })?;
    Ok(hash_string(&canonical))
}

/// Compute the digest of a schema (order-sensitive).
///
/// ## Errors
///
/// Returns `Serialization` if JSON serialization fails.
pub fn compute_schema_digest(schema: &Schema) -> Result<String> {
    let canonical = serde_json::to_string(schema).map_err(|e| {
        StrataError::new(StrataErrorKind::Serialization)
            .with_op("compute_schema_digest")
            .with_message(e.to_string())
    })?;
    Ok(hash_string(&canonical))
}

/// Hash a string using SHA256.
fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::records_from_json;
    use serde_json::json;

    #[test]
    fn test_checksum_is_deterministic() {
        let records = records_from_json(json!([{"id": 1, "name": "A"}])).unwrap();
        let a = compute_records_checksum(&records).unwrap();
        let b = compute_records_checksum(&records).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_checksum_differs_for_different_records() {
        let a = records_from_json(json!([{"id": 1}])).unwrap();
        let b = records_from_json(json!([{"id": 2}])).unwrap();
        assert_ne!(
            compute_records_checksum(&a).unwrap(),
            compute_records_checksum(&b).unwrap()
        );
    }

    #[test]
    fn test_checksum_is_order_sensitive() {
        let a = records_from_json(json!([{"id": 1}, {"id": 2}])).unwrap();
        let b = records_from_json(json!([{"id": 2}, {"id": 1}])).unwrap();
        assert_ne!(
            compute_records_checksum(&a).unwrap(),
            compute_records_checksum(&b).unwrap()
        );
    }
}
