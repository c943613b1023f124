//! Monte-Carlo engine.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use quorum_types::{outcome_order, Outcome, Prediction, Scenario, ThresholdEvent};

use crate::error::SimulationError;
use crate::graph::StateGraph;
use crate::scenario;

/// Simulation configuration.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub monte_carlo_runs: u32,
    /// Derived deterministically from the event hash when absent.
    pub seed: Option<u64>,
    /// Host-configured stage deadline; exceeding it aborts with
    /// `SimulationInstability`.
    pub deadline: Option<Duration>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            monte_carlo_runs: 100,
            seed: None,
            deadline: None,
        }
    }
}

/// Per-scenario accumulation across runs.
#[derive(Default)]
struct ScenarioStats {
    reversibilities: Vec<f64>,
    side_effects: BTreeSet<String>,
    state_hash: Option<String>,
    best_count: u32,
}

/// Graph-based outcome modeling engine.
///
/// A single seeded generator drives every random draw in a fixed
/// consumption order; run `i` uses a sub-generator derived from
/// `(seed, i)`, so evaluation could be parallelized without changing
/// any result.
pub struct Simulator {
    model: String,
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(model: impl Into<String>, config: SimulationConfig) -> Self {
        let model = model.into();
        debug!(model = %model, runs = config.monte_carlo_runs, "simulator initialized");
        Self { model, config }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Model outcomes for the given scenarios against one event.
    pub fn predict(
        &self,
        event: &ThresholdEvent,
        scenarios: &[Scenario],
    ) -> Result<Prediction, SimulationError> {
        let runs = self.config.monte_carlo_runs;
        if runs < 1 {
            return Err(SimulationError::InvalidArgument(
                "monte_carlo_runs must be at least 1".into(),
            ));
        }
        if scenarios.is_empty() {
            return Err(SimulationError::InvalidArgument(
                "at least one scenario is required".into(),
            ));
        }

        let seed = self
            .config
            .seed
            .unwrap_or_else(|| derive_seed(&event.event_hash));
        let initial = StateGraph::from_event(event);
        let started = Instant::now();

        let mut stats: BTreeMap<Scenario, ScenarioStats> = scenarios
            .iter()
            .map(|s| (*s, ScenarioStats::default()))
            .collect();
        let mut failed_runs = 0u32;

        for run in 0..runs {
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() > deadline {
                    return Err(SimulationError::Instability(format!(
                        "deadline exceeded after {run} of {runs} runs"
                    )));
                }
            }

            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(run as u64));
            let variant = perturb(&initial, &mut rng);
            if variant.node_count() == 0 {
                failed_runs += 1;
                continue;
            }

            let mut best: Option<(Scenario, f64)> = None;
            for scenario_kind in scenarios {
                let (state, effects) =
                    scenario::apply(*scenario_kind, &variant, &initial, run as u64, &mut rng);
                let reversibility = state.reversibility_from(&variant);
                let run_score =
                    scenario::score(*scenario_kind, event.severity, reversibility, &effects);

                let entry = stats
                    .get_mut(scenario_kind)
                    .unwrap_or_else(|| unreachable!());
                entry.reversibilities.push(reversibility);
                entry.side_effects.extend(effects);
                if entry.state_hash.is_none() {
                    entry.state_hash = Some(state.state_hash()?);
                }

                let better = match best {
                    Some((_, incumbent)) => run_score > incumbent,
                    None => true,
                };
                if better {
                    best = Some((*scenario_kind, run_score));
                }
            }

            if let Some((winner, _)) = best {
                stats
                    .get_mut(&winner)
                    .unwrap_or_else(|| unreachable!())
                    .best_count += 1;
            }
        }

        if failed_runs * 2 > runs {
            return Err(SimulationError::Instability(format!(
                "{failed_runs} of {runs} runs failed"
            )));
        }
        let successful = runs - failed_runs;

        let mut outcomes: Vec<Outcome> = Vec::with_capacity(scenarios.len());
        for scenario_kind in scenarios {
            let entry = &stats[scenario_kind];
            outcomes.push(Outcome {
                scenario: *scenario_kind,
                probability: entry.best_count as f64 / successful as f64,
                reversibility: mean(&entry.reversibilities),
                side_effects: entry.side_effects.clone(),
                state_hash: entry.state_hash.clone().unwrap_or_default(),
                confidence_interval: confidence_interval(&entry.reversibilities),
                variance: variance(&entry.reversibilities),
            });
        }

        normalize(&mut outcomes);
        outcomes.sort_by(outcome_order);

        let prediction = Prediction::new(
            event.event_hash.clone(),
            self.model.clone(),
            seed,
            runs,
            outcomes,
        )?;
        prediction.validate()?;

        info!(
            event_hash = %prediction.event_hash,
            seed,
            runs,
            outcomes = prediction.outcomes.len(),
            prediction_hash = %prediction.prediction_hash,
            "prediction complete"
        );
        Ok(prediction)
    }
}

/// Default seed: the event hash interpreted as base-16.
fn derive_seed(event_hash: &str) -> u64 {
    let prefix = &event_hash[..event_hash.len().min(16)];
    u64::from_str_radix(prefix, 16).unwrap_or(0)
}

/// Produce one randomized variant of the input graph: each edge drops
/// with small probability and up to two noise edges appear.
fn perturb(initial: &StateGraph, rng: &mut StdRng) -> StateGraph {
    let mut variant = initial.clone();
    let edges: Vec<(String, String)> = variant.edges().cloned().collect();
    for (from, to) in edges {
        if rng.gen_bool(0.05) {
            variant.remove_edge(&from, &to);
        }
    }

    let node_count = variant.node_count();
    if node_count > 1 {
        for _ in 0..2 {
            if rng.gen_bool(0.5) {
                let src = variant.node_at(rng.gen_range(0..node_count)).cloned();
                let dst = variant.node_at(rng.gen_range(0..node_count)).cloned();
                if let (Some(src), Some(dst)) = (src, dst) {
                    if src != dst {
                        variant.add_edge(src, dst);
                    }
                }
            }
        }
    }
    variant
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// (5th, 95th) percentile of the reversibility distribution.
fn confidence_interval(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let low = sorted[((sorted.len() as f64 * 0.05) as usize).min(sorted.len() - 1)];
    let high = sorted[((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1)];
    (low, high)
}

/// Force probabilities to sum to exactly 1.0 by assigning the rounding
/// residual to the highest-probability outcome.
fn normalize(outcomes: &mut [Outcome]) {
    let sum: f64 = outcomes.iter().map(|o| o.probability).sum();
    if sum <= 0.0 {
        return;
    }
    for outcome in outcomes.iter_mut() {
        outcome.probability /= sum;
    }
    let residual = 1.0 - outcomes.iter().map(|o| o.probability).sum::<f64>();
    if let Some(top) = outcomes
        .iter_mut()
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
    {
        top.probability += residual;
    }
}
