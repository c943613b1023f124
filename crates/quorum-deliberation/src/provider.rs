//! Vote provider interface.

use async_trait::async_trait;

use quorum_types::{Prediction, StakeholderKind, StakeholderVote, ThresholdEvent};

use crate::error::DeliberationError;

/// Source of one stakeholder's vote.
///
/// Providers may suspend (a human answering through some surface); the
/// deliberator bounds each call with a per-provider deadline and records
/// a timeout as an abstention.
#[async_trait]
pub trait VoteProvider: Send + Sync {
    fn stakeholder_id(&self) -> &str;

    fn stakeholder_kind(&self) -> StakeholderKind;

    async fn vote(
        &self,
        event: &ThresholdEvent,
        prediction: &Prediction,
    ) -> Result<StakeholderVote, DeliberationError>;
}
