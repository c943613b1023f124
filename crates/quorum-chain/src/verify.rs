//! Chain verification and NDJSON export.

use serde_json::Deserializer;
use tracing::warn;

use crate::entry::{AuditEntry, GENESIS};
use crate::error::ChainError;

/// Per-entry verification outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    Valid,
    /// Recorded fields no longer produce the recorded `entry_hash`.
    ContentMismatch,
    /// `previous_hash` does not match the replayed head of the chain.
    BrokenLink,
}

/// Result of verifying a full chain.
///
/// Verification replays the chain from genesis: the expected head is
/// recomputed entry by entry, so tampering with entry `i` marks `i` and
/// breaks the linkage of every subsequent entry.
#[derive(Clone, Debug)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_entries: usize,
    pub first_invalid_index: Option<usize>,
    pub statuses: Vec<EntryStatus>,
    pub error_message: Option<String>,
}

impl ChainVerification {
    fn clean(total_entries: usize) -> Self {
        Self {
            valid: true,
            total_entries,
            first_invalid_index: None,
            statuses: vec![EntryStatus::Valid; total_entries],
            error_message: None,
        }
    }
}

/// Verify every entry hash and the genesis-rooted linkage of a chain.
///
/// Never mutates. An empty chain is valid.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<ChainVerification, ChainError> {
    let mut result = ChainVerification::clean(entries.len());
    let mut expected_prev = GENESIS.to_string();

    for (i, entry) in entries.iter().enumerate() {
        let link_ok = entry.previous_hash == expected_prev;
        let hash_ok = entry.recompute_hash()? == entry.entry_hash;

        let status = if !hash_ok {
            EntryStatus::ContentMismatch
        } else if !link_ok {
            EntryStatus::BrokenLink
        } else {
            EntryStatus::Valid
        };
        result.statuses[i] = status;

        if status != EntryStatus::Valid {
            result.valid = false;
            if result.first_invalid_index.is_none() {
                result.first_invalid_index = Some(i);
                result.error_message = Some(format!(
                    "entry {} failed verification: {:?} (action {})",
                    i, status, entry.action
                ));
                warn!(index = i, action = %entry.action, ?status, "audit chain verification failed");
            }
        }

        // Replay the chain head from genesis so downstream linkage is
        // judged against the recomputed history, not the recorded one.
        expected_prev = AuditEntry::compute_hash(
            &expected_prev,
            &entry.action,
            &entry.actor,
            &entry.details,
            &entry.timestamp,
        )?;
    }

    Ok(result)
}

/// Export a chain as newline-delimited JSON, one entry per line.
pub fn export_ndjson(entries: &[AuditEntry]) -> Result<String, ChainError> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}

/// Import a newline-delimited JSON chain.
pub fn import_ndjson(input: &str) -> Result<Vec<AuditEntry>, ChainError> {
    let mut entries = Vec::new();
    for (i, value) in Deserializer::from_str(input)
        .into_iter::<AuditEntry>()
        .enumerate()
    {
        match value {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                return Err(ChainError::Import {
                    line: i + 1,
                    reason: err.to_string(),
                })
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditChain;

    fn sample_chain(n: usize) -> Vec<AuditEntry> {
        let mut chain = AuditChain::new();
        chain
            .record("enforcement_start", "intervenor", serde_json::json!({}))
            .unwrap();
        for i in 1..n {
            chain
                .record("gate_check", "intervenor", serde_json::json!({"gate": i}))
                .unwrap();
        }
        chain.into_entries()
    }

    #[test]
    fn clean_chain_verifies() {
        let entries = sample_chain(4);
        let report = verify_chain(&entries).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_entries, 4);
        assert!(report.first_invalid_index.is_none());
    }

    #[test]
    fn empty_chain_is_valid() {
        let report = verify_chain(&[]).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_entries, 0);
    }

    #[test]
    fn tampered_details_invalidate_entry_and_all_successors() {
        let mut entries = sample_chain(4);
        entries[1].details = serde_json::json!({"gate": 99});

        let report = verify_chain(&entries).unwrap();
        assert!(!report.valid);
        assert_eq!(report.first_invalid_index, Some(1));
        assert_eq!(report.statuses[0], EntryStatus::Valid);
        assert_eq!(report.statuses[1], EntryStatus::ContentMismatch);
        assert_eq!(report.statuses[2], EntryStatus::BrokenLink);
        assert_eq!(report.statuses[3], EntryStatus::BrokenLink);
    }

    #[test]
    fn relinked_entry_detected() {
        let mut entries = sample_chain(3);
        entries[2].previous_hash = "0".repeat(32);

        let report = verify_chain(&entries).unwrap();
        assert!(!report.valid);
        // The recorded entry_hash no longer matches either, since it
        // commits to the original previous_hash.
        assert_eq!(report.first_invalid_index, Some(2));
    }

    #[test]
    fn export_import_roundtrip_preserves_verification() {
        let entries = sample_chain(3);
        let ndjson = export_ndjson(&entries).unwrap();
        assert_eq!(ndjson.lines().count(), 3);

        let restored = import_ndjson(&ndjson).unwrap();
        assert_eq!(restored, entries);
        assert!(verify_chain(&restored).unwrap().valid);
    }

    #[test]
    fn import_rejects_garbage() {
        let err = import_ndjson("{\"not\": \"an entry\"}\n").unwrap_err();
        assert!(matches!(err, ChainError::Import { line: 1, .. }));
    }
}
