//! Deliberation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::{artifact_hash, timestamp_now};

use crate::error::CircuitError;
use crate::event::ARTIFACT_HASH_LEN;
use crate::vote::{Decision, DissentRecord, StakeholderVote};

/// Complete record of one deliberation session: the decision, how it was
/// reached, and who disagreed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliberationResult {
    pub session_id: String,
    pub decision: Decision,
    /// Concatenated rationales of the winning votes.
    pub rationale: String,
    pub votes: Vec<StakeholderVote>,
    /// Always present; empty when the decision was unanimous.
    pub dissenting_views: Vec<DissentRecord>,
    /// Union of conditions from Conditional and Proceed votes.
    pub conditions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub audit_hash: String,
}

impl DeliberationResult {
    pub fn new(
        session_id: impl Into<String>,
        decision: Decision,
        rationale: impl Into<String>,
        votes: Vec<StakeholderVote>,
        dissenting_views: Vec<DissentRecord>,
        conditions: Vec<String>,
    ) -> Result<Self, CircuitError> {
        let mut result = Self {
            session_id: session_id.into(),
            decision,
            rationale: rationale.into(),
            votes,
            dissenting_views,
            conditions,
            timestamp: timestamp_now(),
            audit_hash: String::new(),
        };
        result.audit_hash = artifact_hash(&result, &["audit_hash"], ARTIFACT_HASH_LEN)?;
        Ok(result)
    }

    pub fn verify_hash(&self) -> Result<bool, CircuitError> {
        Ok(artifact_hash(self, &["audit_hash"], ARTIFACT_HASH_LEN)? == self.audit_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::StakeholderKind;

    #[test]
    fn result_hash_verifies_and_roundtrips() {
        let vote = StakeholderVote::new(
            "tech-1",
            StakeholderKind::Technical,
            Decision::Proceed,
            "within limits",
            0.7,
        )
        .unwrap();

        let result = DeliberationResult::new(
            "delib-20260101-000000-abcd1234",
            Decision::Proceed,
            "within limits",
            vec![vote],
            vec![],
            vec![],
        )
        .unwrap();

        assert_eq!(result.audit_hash.len(), 16);
        assert!(result.verify_hash().unwrap());

        let json = serde_json::to_string(&result).unwrap();
        let restored: DeliberationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, restored);
    }
}
