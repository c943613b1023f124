//! Vote collection and aggregation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use quorum_types::{
    Decision, DeliberationResult, DissentRecord, Prediction, StakeholderKind, StakeholderVote,
    ThresholdEvent,
};

use crate::error::DeliberationError;
use crate::provider::VoteProvider;
use crate::template::DeliberationTemplate;

/// High-confidence threshold for the Reject short-circuit.
const CONFIDENT_REJECT: f64 = 0.8;

/// The registered stakeholders for a deliberation.
#[derive(Clone, Default)]
pub struct StakeholderRegistry {
    providers: Vec<Arc<dyn VoteProvider>>,
}

impl StakeholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn VoteProvider>) {
        debug!(
            stakeholder = provider.stakeholder_id(),
            kind = ?provider.stakeholder_kind(),
            "stakeholder registered"
        );
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn providers(&self) -> &[Arc<dyn VoteProvider>] {
        &self.providers
    }
}

/// Deliberator configuration.
#[derive(Clone, Debug)]
pub struct DeliberatorConfig {
    /// Per-provider response deadline; a timeout is an abstention.
    pub provider_deadline: Duration,
}

impl Default for DeliberatorConfig {
    fn default() -> Self {
        Self {
            provider_deadline: Duration::from_secs(5),
        }
    }
}

/// Collects stakeholder votes and aggregates them to a decision,
/// preserving every dissenting position.
pub struct Deliberator {
    template: DeliberationTemplate,
    registry: StakeholderRegistry,
    config: DeliberatorConfig,
}

impl Deliberator {
    pub fn new(
        template: DeliberationTemplate,
        registry: StakeholderRegistry,
        config: DeliberatorConfig,
    ) -> Result<Self, DeliberationError> {
        template.validate()?;
        Ok(Self {
            template,
            registry,
            config,
        })
    }

    pub fn template(&self) -> &DeliberationTemplate {
        &self.template
    }

    /// Run one deliberation over an event and its prediction.
    pub async fn deliberate(
        &self,
        event: &ThresholdEvent,
        prediction: &Prediction,
    ) -> Result<DeliberationResult, DeliberationError> {
        let session_id = generate_session_id();
        info!(
            session_id = %session_id,
            template = %self.template.name,
            stakeholders = self.registry.len(),
            "deliberation session opened"
        );

        let mut votes: Vec<StakeholderVote> = Vec::new();
        for provider in self.registry.providers() {
            match tokio::time::timeout(
                self.config.provider_deadline,
                provider.vote(event, prediction),
            )
            .await
            {
                Ok(Ok(vote)) => {
                    debug!(
                        stakeholder = %vote.stakeholder_id,
                        decision = vote.decision.name(),
                        confidence = vote.confidence,
                        "vote recorded"
                    );
                    votes.push(vote);
                }
                Ok(Err(err)) => {
                    warn!(
                        stakeholder = provider.stakeholder_id(),
                        error = %err,
                        "vote provider failed; recording abstention"
                    );
                }
                Err(_) => {
                    warn!(
                        stakeholder = provider.stakeholder_id(),
                        deadline_ms = self.config.provider_deadline.as_millis() as u64,
                        "vote provider timed out; recording abstention"
                    );
                }
            }
        }

        if votes.len() < 2 {
            let dissent = dissent_records(&votes, Decision::Defer);
            let result = DeliberationResult::new(
                session_id,
                Decision::Defer,
                "insufficient participation",
                votes,
                dissent,
                vec![],
            )?;
            return Ok(result);
        }

        let (decision, conditions) = aggregate(&votes);
        let rationale = winning_rationale(&votes, decision);
        let dissent = dissent_records(&votes, decision);

        info!(
            decision = decision.name(),
            votes = votes.len(),
            dissent = dissent.len(),
            "deliberation complete"
        );

        let result =
            DeliberationResult::new(session_id, decision, rationale, votes, dissent, conditions)?;
        Ok(result)
    }
}

/// Aggregation rules, in priority order:
/// 1. any Reject at confidence >= 0.8 wins;
/// 2. a physiological Pause is a universal veto;
/// 3. Pause outweighing Proceed + Conditional wins;
/// 4. any Conditional makes the result Conditional;
/// 5. Proceed strictly outweighing Pause wins;
/// 6. everything else defers.
/// Human-operator votes count double throughout.
fn aggregate(votes: &[StakeholderVote]) -> (Decision, Vec<String>) {
    if votes
        .iter()
        .any(|v| v.decision == Decision::Reject && v.confidence >= CONFIDENT_REJECT)
    {
        return (Decision::Reject, vec![]);
    }

    if votes.iter().any(|v| {
        v.stakeholder_type == StakeholderKind::Physiological && v.decision == Decision::Pause
    }) {
        return (Decision::Pause, vec![]);
    }

    let weight_of = |decision: Decision| -> u32 {
        votes
            .iter()
            .filter(|v| v.decision == decision)
            .map(|v| v.stakeholder_type.weight())
            .sum()
    };
    let pause = weight_of(Decision::Pause);
    let proceed = weight_of(Decision::Proceed);
    let conditional = weight_of(Decision::Conditional);

    if pause > proceed + conditional {
        return (Decision::Pause, vec![]);
    }

    if conditional > 0 {
        let conditions: BTreeSet<String> = votes
            .iter()
            .filter(|v| matches!(v.decision, Decision::Conditional | Decision::Proceed))
            .flat_map(|v| v.conditions.iter().cloned())
            .collect();
        return (Decision::Conditional, conditions.into_iter().collect());
    }

    if proceed > pause {
        return (Decision::Proceed, vec![]);
    }

    (Decision::Defer, vec![])
}

fn winning_rationale(votes: &[StakeholderVote], decision: Decision) -> String {
    let parts: Vec<&str> = votes
        .iter()
        .filter(|v| v.decision == decision)
        .map(|v| v.rationale.as_str())
        .collect();
    if parts.is_empty() {
        "no consensus reached".to_string()
    } else {
        parts.join(" | ")
    }
}

fn dissent_records(votes: &[StakeholderVote], decision: Decision) -> Vec<DissentRecord> {
    votes
        .iter()
        .filter(|v| v.decision != decision)
        .map(|v| DissentRecord::from_vote(v, decision))
        .collect()
}

fn generate_session_id() -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("delib-{stamp}-{}", &suffix[..8])
}
