//! Canonical JSON form and hash helpers.
//!
//! Canonical form is RFC-8259 with object keys sorted and no
//! insignificant whitespace. Routing a value through `serde_json::Value`
//! gives both: map entries are held in a BTreeMap, and compact output
//! carries no padding. `serde_json` emits the shortest round-trippable
//! representation for floats, which serves as the numeric normalization.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ChainError;

/// Serialize a value to its canonical JSON string.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, ChainError> {
    let tree = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&tree)?)
}

/// Full SHA-256 of a string, hex encoded (64 chars).
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Hash an artifact over its canonical form, excluding named fields.
///
/// `exclude` lists keys to strip before canonicalization: always the
/// artifact's own hash field, sometimes its timestamp when the hash must
/// be stable across re-runs. `len` selects the hex prefix length: 16 for
/// artifact hashes, 12 for bus event ids, 32 for audit entries.
pub fn artifact_hash<T: Serialize>(
    value: &T,
    exclude: &[&str],
    len: usize,
) -> Result<String, ChainError> {
    let mut tree = serde_json::to_value(value)?;
    if let Some(map) = tree.as_object_mut() {
        for key in exclude {
            map.remove(*key);
        }
    }
    let canonical = serde_json::to_string(&tree)?;
    let mut digest = sha256_hex(&canonical);
    digest.truncate(len);
    Ok(digest)
}

/// Current UTC time truncated to microsecond precision.
///
/// All circuit timestamps use this so serialized forms carry exactly
/// six fractional digits.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
