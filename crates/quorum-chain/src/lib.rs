//! Hash chain primitives for the governance circuit.
//!
//! Every artifact in the circuit is content-addressed over its canonical
//! JSON form, and enforcement produces an append-only chain of
//! [`AuditEntry`] records where each entry commits to the hash of its
//! predecessor. External verifiers can replay an exported chain without
//! any in-memory state.

#![deny(unsafe_code)]

pub mod canonical;
pub mod entry;
pub mod error;
pub mod verify;

pub use canonical::{artifact_hash, canonical_json, sha256_hex, timestamp_now};
pub use entry::{AuditChain, AuditEntry, GENESIS};
pub use error::ChainError;
pub use verify::{ChainVerification, EntryStatus, export_ndjson, import_ndjson, verify_chain};
