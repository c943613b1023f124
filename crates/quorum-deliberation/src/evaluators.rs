//! Automated stakeholder evaluators.
//!
//! These derive their position from event severity, predicted
//! reversibility, and side-effect tags, and say so in their rationale.

use async_trait::async_trait;

use quorum_types::{
    Decision, Prediction, Severity, StakeholderKind, StakeholderVote, ThresholdEvent,
};

use crate::error::DeliberationError;
use crate::provider::VoteProvider;

/// Conditions the technical evaluator attaches to a Conditional vote.
pub const TECHNICAL_CONDITIONS: [&str; 2] = ["logging_enabled", "rollback_available"];

/// Reversibility below which the technical evaluator refuses to proceed.
const LOW_REVERSIBILITY: f64 = 0.5;

/// Votes on operational grounds: severity pressure and whether the
/// predicted best path can be undone.
pub struct TechnicalEvaluator {
    id: String,
}

impl Default for TechnicalEvaluator {
    fn default() -> Self {
        Self {
            id: "auto-technical".into(),
        }
    }
}

#[async_trait]
impl VoteProvider for TechnicalEvaluator {
    fn stakeholder_id(&self) -> &str {
        &self.id
    }

    fn stakeholder_kind(&self) -> StakeholderKind {
        StakeholderKind::Technical
    }

    async fn vote(
        &self,
        event: &ThresholdEvent,
        prediction: &Prediction,
    ) -> Result<StakeholderVote, DeliberationError> {
        let safest = prediction
            .most_reversible()
            .map(|o| o.reversibility)
            .unwrap_or(0.0);

        let (decision, rationale, conditions) =
            if event.severity == Severity::Emergency && safest < LOW_REVERSIBILITY {
                (
                    Decision::Pause,
                    format!(
                        "{} severity with best reversibility {safest:.2}; halting is the only safe option",
                        severity_name(event.severity)
                    ),
                    vec![],
                )
            } else if event.severity >= Severity::Critical {
                (
                    Decision::Conditional,
                    format!(
                        "{} threshold crossing on {} ({} at {} against limit {}); proceed only with guardrails",
                        severity_name(event.severity),
                        event.target,
                        event.metric.name(),
                        event.value,
                        event.threshold
                    ),
                    TECHNICAL_CONDITIONS.iter().map(|c| c.to_string()).collect(),
                )
            } else {
                (
                    Decision::Proceed,
                    format!(
                        "{} at {} remains below the critical band; predicted reversibility {safest:.2}",
                        event.metric.name(),
                        event.value
                    ),
                    vec![],
                )
            };

        StakeholderVote::new(&self.id, StakeholderKind::Technical, decision, rationale, 0.7)?
            .with_conditions(conditions)
            .map_err(Into::into)
    }
}

/// Votes on harm grounds: irreversibility and data-loss signals weigh
/// heavier than operational convenience.
pub struct EthicalEvaluator {
    id: String,
}

impl Default for EthicalEvaluator {
    fn default() -> Self {
        Self {
            id: "auto-ethical".into(),
        }
    }
}

#[async_trait]
impl VoteProvider for EthicalEvaluator {
    fn stakeholder_id(&self) -> &str {
        &self.id
    }

    fn stakeholder_kind(&self) -> StakeholderKind {
        StakeholderKind::Ethical
    }

    async fn vote(
        &self,
        event: &ThresholdEvent,
        prediction: &Prediction,
    ) -> Result<StakeholderVote, DeliberationError> {
        let data_loss = prediction
            .best_outcome()
            .map(|o| o.side_effects.contains("data_loss_risk"))
            .unwrap_or(false);

        let vote = if event.severity == Severity::Emergency || data_loss {
            StakeholderVote::new(
                &self.id,
                StakeholderKind::Ethical,
                Decision::Pause,
                format!(
                    "potential for irreversible harm ({} severity{}); recommend pause",
                    severity_name(event.severity),
                    if data_loss { ", data loss predicted" } else { "" }
                ),
                0.6,
            )?
            .with_concerns(vec!["irreversible harm".into()])
        } else {
            StakeholderVote::new(
                &self.id,
                StakeholderKind::Ethical,
                Decision::Proceed,
                format!(
                    "no significant ethical concerns at {} severity; best outcome carries no data-loss tag",
                    severity_name(event.severity)
                ),
                0.6,
            )?
        };
        Ok(vote)
    }
}

/// Severity as a lowercase label for rationales.
fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Critical => "critical",
        Severity::Emergency => "emergency",
    }
}
