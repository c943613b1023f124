//! Enforcement results and gate outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::{artifact_hash, timestamp_now, verify_chain, AuditEntry};

use crate::error::CircuitError;
use crate::event::ARTIFACT_HASH_LEN;

/// Outcome of a single gate check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Approved,
    Rejected,
    Timeout,
    /// The gate sequence halted awaiting an external signal.
    Pending,
    Error,
}

/// Record of one gate evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_name: String,
    pub status: GateStatus,
    pub message: String,
    /// Ids of approvers that contributed to an approval.
    pub approvers: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl GateResult {
    pub fn new(
        gate_name: impl Into<String>,
        status: GateStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            gate_name: gate_name.into(),
            status,
            message: message.into(),
            approvers: Vec::new(),
            timestamp: timestamp_now(),
        }
    }

    pub fn with_approvers(mut self, approvers: Vec<String>) -> Self {
        self.approvers = approvers;
        self
    }
}

/// Complete record of an enforcement attempt with its audit chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnforcementResult {
    /// `audit_hash` of the deliberation being enforced.
    pub decision_hash: String,
    pub applied: bool,
    pub rolled_back: bool,
    pub gate_log: Vec<GateResult>,
    /// Hash chain beginning at `"genesis"`; never empty.
    pub audit_trail: Vec<AuditEntry>,
    pub timestamp: DateTime<Utc>,
    pub result_hash: String,
}

impl EnforcementResult {
    pub fn new(
        decision_hash: impl Into<String>,
        applied: bool,
        rolled_back: bool,
        gate_log: Vec<GateResult>,
        audit_trail: Vec<AuditEntry>,
    ) -> Result<Self, CircuitError> {
        let mut result = Self {
            decision_hash: decision_hash.into(),
            applied,
            rolled_back,
            gate_log,
            audit_trail,
            timestamp: timestamp_now(),
            result_hash: String::new(),
        };
        result.result_hash = artifact_hash(&result, &["result_hash"], ARTIFACT_HASH_LEN)?;
        Ok(result)
    }

    /// Verify the structural invariants: non-empty valid audit chain and,
    /// when applied, an all-Approved gate log.
    pub fn verify(&self) -> Result<(), CircuitError> {
        if self.audit_trail.is_empty() {
            return Err(CircuitError::Integrity("empty audit trail".into()));
        }
        let report = verify_chain(&self.audit_trail)?;
        if !report.valid {
            return Err(CircuitError::Integrity(
                report
                    .error_message
                    .unwrap_or_else(|| "audit chain invalid".into()),
            ));
        }
        if self.applied
            && self
                .gate_log
                .iter()
                .any(|g| g.status != GateStatus::Approved)
        {
            return Err(CircuitError::Integrity(
                "applied enforcement with non-approved gate".into(),
            ));
        }
        Ok(())
    }
}
