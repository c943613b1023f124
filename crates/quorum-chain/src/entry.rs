//! Hash-chained audit entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_json, sha256_hex, timestamp_now};
use crate::error::ChainError;

/// Sentinel previous-hash for the first entry of every chain.
pub const GENESIS: &str = "genesis";

/// Hex prefix length of an audit entry hash.
const ENTRY_HASH_LEN: usize = 32;

/// One link in an enforcement audit chain.
///
/// Each entry commits to the hash of its predecessor, so altering any
/// recorded field invalidates the entry and everything after it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub details: serde_json::Value,
    pub previous_hash: String,
    pub entry_hash: String,
}

/// The hashed portion of an entry, in canonical field order.
#[derive(Serialize)]
struct EntryContent<'a> {
    action: &'a str,
    actor: &'a str,
    details: &'a serde_json::Value,
    timestamp: &'a DateTime<Utc>,
}

impl AuditEntry {
    /// Create the first entry of a chain (`previous_hash = "genesis"`).
    pub fn first(
        action: impl Into<String>,
        actor: impl Into<String>,
        details: serde_json::Value,
    ) -> Result<Self, ChainError> {
        Self::finalize(GENESIS.to_string(), action.into(), actor.into(), details)
    }

    /// Create an entry linked to `prev`.
    pub fn append(
        action: impl Into<String>,
        actor: impl Into<String>,
        details: serde_json::Value,
        prev: &AuditEntry,
    ) -> Result<Self, ChainError> {
        Self::finalize(
            prev.entry_hash.clone(),
            action.into(),
            actor.into(),
            details,
        )
    }

    fn finalize(
        previous_hash: String,
        action: String,
        actor: String,
        details: serde_json::Value,
    ) -> Result<Self, ChainError> {
        let timestamp = timestamp_now();
        let entry_hash = Self::compute_hash(&previous_hash, &action, &actor, &details, &timestamp)?;
        Ok(Self {
            timestamp,
            action,
            actor,
            details,
            previous_hash,
            entry_hash,
        })
    }

    /// Recompute this entry's hash from its recorded fields.
    pub fn recompute_hash(&self) -> Result<String, ChainError> {
        Self::compute_hash(
            &self.previous_hash,
            &self.action,
            &self.actor,
            &self.details,
            &self.timestamp,
        )
    }

    /// `entry_hash = sha256(previous_hash ‖ canonical(action, actor, details, timestamp))[..32]`
    pub(crate) fn compute_hash(
        previous_hash: &str,
        action: &str,
        actor: &str,
        details: &serde_json::Value,
        timestamp: &DateTime<Utc>,
    ) -> Result<String, ChainError> {
        let content = canonical_json(&EntryContent {
            action,
            actor,
            details,
            timestamp,
        })?;
        let mut digest = sha256_hex(&format!("{previous_hash}{content}"));
        digest.truncate(ENTRY_HASH_LEN);
        Ok(digest)
    }
}

/// Append-only audit chain with a tracked head hash.
///
/// Exactly one owner builds a chain; readers get entry slices or an
/// exported snapshot. There is no fork or merge.
#[derive(Debug, Default)]
pub struct AuditChain {
    entries: Vec<AuditEntry>,
}

impl AuditChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, linking to the current head (or genesis).
    pub fn record(
        &mut self,
        action: impl Into<String>,
        actor: impl Into<String>,
        details: serde_json::Value,
    ) -> Result<&AuditEntry, ChainError> {
        let entry = match self.entries.last() {
            Some(prev) => AuditEntry::append(action, actor, details, prev)?,
            None => AuditEntry::first(action, actor, details)?,
        };
        self.entries.push(entry);
        Ok(self.entries.last().unwrap_or_else(|| unreachable!()))
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn head_hash(&self) -> Option<&str> {
        self.entries.last().map(|e| e.entry_hash.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_links_to_genesis() {
        let entry = AuditEntry::first(
            "enforcement_start",
            "intervenor",
            serde_json::json!({"gate_count": 2}),
        )
        .unwrap();
        assert_eq!(entry.previous_hash, GENESIS);
        assert_eq!(entry.entry_hash.len(), 32);
        assert_eq!(entry.recompute_hash().unwrap(), entry.entry_hash);
    }

    #[test]
    fn append_links_to_previous() {
        let first =
            AuditEntry::first("enforcement_start", "intervenor", serde_json::json!({})).unwrap();
        let second =
            AuditEntry::append("gate_check", "intervenor", serde_json::json!({}), &first).unwrap();
        assert_eq!(second.previous_hash, first.entry_hash);
    }

    #[test]
    fn chain_records_in_order() {
        let mut chain = AuditChain::new();
        chain
            .record("enforcement_start", "intervenor", serde_json::json!({}))
            .unwrap();
        chain
            .record("gate_start", "intervenor", serde_json::json!({}))
            .unwrap();
        chain
            .record("gate_check", "intervenor", serde_json::json!({}))
            .unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.entries()[0].previous_hash, GENESIS);
        assert_eq!(
            chain.entries()[2].previous_hash,
            chain.entries()[1].entry_hash
        );
        assert_eq!(chain.head_hash(), Some(chain.entries()[2].entry_hash.as_str()));
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let entry = AuditEntry::first(
            "gate_check",
            "HumanApproval(operator)",
            serde_json::json!({"status": "approved"}),
        )
        .unwrap();
        let json = serde_json::to_string(&entry).unwrap();
        let restored: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, restored);
        assert_eq!(restored.recompute_hash().unwrap(), restored.entry_hash);
    }
}
