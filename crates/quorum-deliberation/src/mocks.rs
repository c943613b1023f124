//! Scripted vote providers for tests and wiring demos.

use std::time::Duration;

use async_trait::async_trait;

use quorum_types::{
    Decision, Prediction, StakeholderKind, StakeholderVote, ThresholdEvent,
};

use crate::error::DeliberationError;
use crate::provider::VoteProvider;

/// Returns a fixed vote, optionally after a delay.
pub struct ScriptedProvider {
    id: String,
    kind: StakeholderKind,
    decision: Decision,
    confidence: f64,
    rationale: String,
    conditions: Vec<String>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(
        id: impl Into<String>,
        kind: StakeholderKind,
        decision: Decision,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            decision,
            confidence,
            rationale: format!("scripted {} vote", decision.name()),
            conditions: Vec::new(),
            delay: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Delay the response; used to exercise provider deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl VoteProvider for ScriptedProvider {
    fn stakeholder_id(&self) -> &str {
        &self.id
    }

    fn stakeholder_kind(&self) -> StakeholderKind {
        self.kind
    }

    async fn vote(
        &self,
        _event: &ThresholdEvent,
        _prediction: &Prediction,
    ) -> Result<StakeholderVote, DeliberationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        StakeholderVote::new(
            &self.id,
            self.kind,
            self.decision,
            self.rationale.clone(),
            self.confidence,
        )?
        .with_conditions(self.conditions.clone())
        .map_err(Into::into)
    }
}
