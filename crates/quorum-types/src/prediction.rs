//! Simulation predictions.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::{artifact_hash, timestamp_now};

use crate::error::CircuitError;
use crate::event::ARTIFACT_HASH_LEN;

/// Tolerance for the probability-sum invariant.
pub const PROBABILITY_EPSILON: f64 = 1e-6;

/// Candidate scenarios evaluated by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Reorganize,
    PartialReorganize,
    Defer,
    Rollback,
    Incremental,
}

impl Scenario {
    /// All scenarios in canonical order.
    pub const ALL: [Scenario; 5] = [
        Scenario::Reorganize,
        Scenario::PartialReorganize,
        Scenario::Defer,
        Scenario::Rollback,
        Scenario::Incremental,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reorganize => "reorganize",
            Self::PartialReorganize => "partial-reorganize",
            Self::Defer => "defer",
            Self::Rollback => "rollback",
            Self::Incremental => "incremental",
        }
    }
}

/// One simulated outcome for a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub scenario: Scenario,
    /// Share of Monte-Carlo runs that selected this scenario as best.
    pub probability: f64,
    /// Mean reversibility across runs, in `[0, 1]`.
    pub reversibility: f64,
    pub side_effects: BTreeSet<String>,
    pub state_hash: String,
    /// (5th percentile, 95th percentile) of the reversibility distribution.
    pub confidence_interval: (f64, f64),
    pub variance: f64,
}

/// Complete prediction for one threshold event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Hash of the triggering event; the join key back to detection.
    pub event_hash: String,
    pub model: String,
    pub seed: u64,
    pub monte_carlo_runs: u32,
    /// Sorted descending by probability; ties broken by descending
    /// reversibility, then lexicographic scenario name.
    pub outcomes: Vec<Outcome>,
    pub timestamp: DateTime<Utc>,
    pub prediction_hash: String,
}

impl Prediction {
    pub fn new(
        event_hash: impl Into<String>,
        model: impl Into<String>,
        seed: u64,
        monte_carlo_runs: u32,
        outcomes: Vec<Outcome>,
    ) -> Result<Self, CircuitError> {
        let mut prediction = Self {
            event_hash: event_hash.into(),
            model: model.into(),
            seed,
            monte_carlo_runs,
            outcomes,
            timestamp: timestamp_now(),
            prediction_hash: String::new(),
        };
        prediction.prediction_hash =
            artifact_hash(&prediction, &["prediction_hash", "timestamp"], ARTIFACT_HASH_LEN)?;
        Ok(prediction)
    }

    /// Highest-probability outcome.
    pub fn best_outcome(&self) -> Option<&Outcome> {
        self.outcomes.first()
    }

    /// Most reversible outcome.
    pub fn most_reversible(&self) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .max_by(|a, b| a.reversibility.total_cmp(&b.reversibility))
    }

    /// Check the probability-sum and ordering invariants.
    pub fn validate(&self) -> Result<(), CircuitError> {
        let sum: f64 = self.outcomes.iter().map(|o| o.probability).sum();
        if !self.outcomes.is_empty() && (sum - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(CircuitError::Integrity(format!(
                "outcome probabilities sum to {sum}, expected 1.0"
            )));
        }
        for pair in self.outcomes.windows(2) {
            if outcome_order(&pair[0], &pair[1]) == std::cmp::Ordering::Greater {
                return Err(CircuitError::Integrity(format!(
                    "outcomes out of order: {} before {}",
                    pair[0].scenario.name(),
                    pair[1].scenario.name()
                )));
            }
        }
        Ok(())
    }
}

/// Canonical outcome ordering: probability desc, reversibility desc,
/// scenario name asc.
pub fn outcome_order(a: &Outcome, b: &Outcome) -> std::cmp::Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then(b.reversibility.total_cmp(&a.reversibility))
        .then(a.scenario.name().cmp(b.scenario.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(scenario: Scenario, probability: f64, reversibility: f64) -> Outcome {
        Outcome {
            scenario,
            probability,
            reversibility,
            side_effects: BTreeSet::new(),
            state_hash: "0".repeat(16),
            confidence_interval: (reversibility - 0.1, reversibility + 0.1),
            variance: 0.01,
        }
    }

    #[test]
    fn best_outcome_is_first() {
        let p = Prediction::new(
            "abc",
            "governance",
            42,
            100,
            vec![
                outcome(Scenario::Defer, 0.6, 0.9),
                outcome(Scenario::Reorganize, 0.4, 0.3),
            ],
        )
        .unwrap();
        assert_eq!(p.best_outcome().unwrap().scenario, Scenario::Defer);
        assert_eq!(p.most_reversible().unwrap().scenario, Scenario::Defer);
        p.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_probability_sum() {
        let p = Prediction::new(
            "abc",
            "governance",
            42,
            100,
            vec![outcome(Scenario::Defer, 0.5, 0.9)],
        )
        .unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_order_outcomes() {
        let p = Prediction::new(
            "abc",
            "governance",
            42,
            100,
            vec![
                outcome(Scenario::Defer, 0.3, 0.9),
                outcome(Scenario::Reorganize, 0.7, 0.3),
            ],
        )
        .unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn tie_break_prefers_reversibility_then_name() {
        let a = outcome(Scenario::Rollback, 0.5, 0.8);
        let b = outcome(Scenario::Defer, 0.5, 0.8);
        // Equal probability and reversibility: "defer" sorts before "rollback".
        assert_eq!(outcome_order(&b, &a), std::cmp::Ordering::Less);

        let c = outcome(Scenario::Incremental, 0.5, 0.9);
        assert_eq!(outcome_order(&c, &a), std::cmp::Ordering::Less);
    }

    #[test]
    fn scenario_names_are_kebab_case() {
        let json = serde_json::to_string(&Scenario::PartialReorganize).unwrap();
        assert_eq!(json, "\"partial-reorganize\"");
    }

    #[test]
    fn prediction_roundtrip() {
        let p = Prediction::new(
            "abcdef0123456789",
            "governance",
            42,
            100,
            vec![outcome(Scenario::Incremental, 1.0, 0.95)],
        )
        .unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let restored: Prediction = serde_json::from_str(&json).unwrap();
        assert_eq!(p, restored);
        assert_eq!(restored.prediction_hash.len(), 16);
    }
}
