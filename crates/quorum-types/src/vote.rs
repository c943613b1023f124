//! Stakeholder votes and dissent records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::timestamp_now;

use crate::error::CircuitError;

/// Deliberation outcomes a stakeholder can vote for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Proceed,
    Pause,
    Reject,
    Defer,
    Conditional,
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::Pause => "pause",
            Self::Reject => "reject",
            Self::Defer => "defer",
            Self::Conditional => "conditional",
        }
    }
}

/// Stakeholder classification. Human-typed votes carry double weight in
/// tie-breaks; physiological stakeholders hold a universal Pause veto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StakeholderKind {
    Technical,
    Ethical,
    Domain,
    Physiological,
    HumanOperator,
}

impl StakeholderKind {
    /// Vote weight applied during aggregation.
    pub fn weight(&self) -> u32 {
        match self {
            Self::HumanOperator => 2,
            _ => 1,
        }
    }
}

/// One participant's position on a proposed action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakeholderVote {
    pub stakeholder_id: String,
    pub stakeholder_type: StakeholderKind,
    pub decision: Decision,
    pub rationale: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub concerns: Vec<String>,
    /// Non-empty iff `decision` is `Conditional`.
    pub conditions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl StakeholderVote {
    pub fn new(
        stakeholder_id: impl Into<String>,
        stakeholder_type: StakeholderKind,
        decision: Decision,
        rationale: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, CircuitError> {
        let rationale = rationale.into();
        if rationale.is_empty() {
            return Err(CircuitError::InvalidArgument(
                "vote rationale must be non-empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CircuitError::InvalidArgument(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self {
            stakeholder_id: stakeholder_id.into(),
            stakeholder_type,
            decision,
            rationale,
            confidence,
            concerns: Vec::new(),
            conditions: Vec::new(),
            timestamp: timestamp_now(),
        })
    }

    pub fn with_concerns(mut self, concerns: Vec<String>) -> Self {
        self.concerns = concerns;
        self
    }

    /// Attach conditions; only meaningful on `Conditional` votes.
    pub fn with_conditions(mut self, conditions: Vec<String>) -> Result<Self, CircuitError> {
        if self.decision != Decision::Conditional && !conditions.is_empty() {
            return Err(CircuitError::InvalidArgument(format!(
                "conditions attached to a {} vote",
                self.decision.name()
            )));
        }
        self.conditions = conditions;
        Ok(self)
    }
}

/// A preserved minority position. Dissent is signal, not failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DissentRecord {
    pub stakeholder_id: String,
    /// The aggregated decision being dissented from.
    pub dissenting_from: Decision,
    /// What the dissenter voted for instead.
    pub preferred: Decision,
    pub rationale: String,
    pub concerns: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl DissentRecord {
    pub fn from_vote(vote: &StakeholderVote, majority: Decision) -> Self {
        Self {
            stakeholder_id: vote.stakeholder_id.clone(),
            dissenting_from: majority,
            preferred: vote.decision,
            rationale: vote.rationale.clone(),
            concerns: vote.concerns.clone(),
            timestamp: timestamp_now(),
        }
    }
}
