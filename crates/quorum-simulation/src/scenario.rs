//! Scenario transforms and scoring heuristics.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::Rng;

use quorum_types::{Scenario, Severity};

use crate::graph::StateGraph;

/// Base likelihood weight per scenario before adjustments.
pub fn base_weight(scenario: Scenario) -> f64 {
    match scenario {
        Scenario::Reorganize => 0.30,
        Scenario::PartialReorganize => 0.25,
        Scenario::Defer => 0.20,
        Scenario::Rollback => 0.10,
        Scenario::Incremental => 0.15,
    }
}

/// Severity multiplier: higher severity pushes toward action.
pub fn severity_multiplier(severity: Severity) -> f64 {
    match severity {
        Severity::Info => 1.0,
        Severity::Warning => 1.1,
        Severity::Critical => 1.3,
        Severity::Emergency => 1.5,
    }
}

/// Score a scenario evaluation within one run: base weight, severity
/// pressure, a reversibility bias, and a side-effect penalty.
pub fn score(
    scenario: Scenario,
    severity: Severity,
    reversibility: f64,
    side_effects: &BTreeSet<String>,
) -> f64 {
    let penalty = (1.0 - 0.05 * side_effects.len() as f64).max(0.5);
    base_weight(scenario)
        * severity_multiplier(severity)
        * (0.8 + 0.4 * reversibility)
        * penalty
}

/// Apply a scenario transform to a run variant. Returns the final state
/// and the side-effect tags the transform surfaced.
pub fn apply(
    scenario: Scenario,
    variant: &StateGraph,
    initial: &StateGraph,
    run: u64,
    rng: &mut StdRng,
) -> (StateGraph, BTreeSet<String>) {
    let mut state = variant.clone();
    let mut effects = BTreeSet::new();

    match scenario {
        Scenario::Reorganize => {
            // Rewire a third of the structure.
            let doomed: Vec<(String, String)> = state
                .edges()
                .take(state.edge_count() / 3)
                .cloned()
                .collect();
            for (from, to) in &doomed {
                state.remove_edge(from, to);
            }
            let node_count = state.node_count();
            if node_count > 2 {
                for _ in 0..doomed.len() {
                    let src = state.node_at(rng.gen_range(0..node_count)).cloned();
                    let dst = state.node_at(rng.gen_range(0..node_count)).cloned();
                    if let (Some(src), Some(dst)) = (src, dst) {
                        if src != dst {
                            state.add_edge(src, dst);
                        }
                    }
                }
                effects.insert("structure_changed".to_string());
                effects.insert("potential_path_loss".to_string());
            }
        }
        Scenario::PartialReorganize => {
            let node_count = state.node_count();
            let subset = (node_count / 4).max(1);
            for _ in 0..subset {
                let Some(node) = state.node_at(rng.gen_range(0..node_count)).cloned() else {
                    continue;
                };
                let successor = state.successors(&node).next().cloned();
                if let Some(successor) = successor {
                    state.remove_edge(&node, &successor);
                }
            }
            effects.insert("partial_modification".to_string());
        }
        Scenario::Defer => {
            // No change, but model drift risk.
            if rng.gen_bool(0.3) {
                effects.insert("organic_growth_risk".to_string());
            }
            if rng.gen_bool(0.2) {
                effects.insert("threshold_may_increase".to_string());
            }
        }
        Scenario::Rollback => {
            state = initial.clone();
            if state.node_count() > 10 {
                let recent: Vec<String> = state.nodes().rev().take(5).cloned().collect();
                for node in recent {
                    state.remove_node(&node);
                }
            }
            effects.insert("data_loss_risk".to_string());
            effects.insert("requires_backup_verification".to_string());
        }
        Scenario::Incremental => {
            let node_count = state.node_count();
            if node_count > 0 {
                let anchor = state.node_at(rng.gen_range(0..node_count)).cloned();
                if let Some(anchor) = anchor {
                    let staged = format!("staged_{run}");
                    state.add_node(&staged);
                    state.add_edge(anchor, staged);
                }
            }
            effects.insert("minimal_disruption".to_string());
        }
    }

    (state, effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn star(n: usize) -> StateGraph {
        let mut graph = StateGraph::new();
        graph.add_node("root");
        for i in 0..n {
            graph.add_edge("root", format!("file_{i}"));
        }
        graph
    }

    #[test]
    fn base_weights_cover_all_scenarios() {
        let total: f64 = Scenario::ALL.iter().map(|s| base_weight(*s)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn transforms_are_deterministic_per_seed() {
        let initial = star(20);
        for scenario in Scenario::ALL {
            let mut rng_a = StdRng::seed_from_u64(7);
            let mut rng_b = StdRng::seed_from_u64(7);
            let (state_a, effects_a) = apply(scenario, &initial, &initial, 3, &mut rng_a);
            let (state_b, effects_b) = apply(scenario, &initial, &initial, 3, &mut rng_b);
            assert_eq!(state_a, state_b, "{scenario:?}");
            assert_eq!(effects_a, effects_b, "{scenario:?}");
        }
    }

    #[test]
    fn rollback_tags_data_loss() {
        let initial = star(20);
        let mut rng = StdRng::seed_from_u64(1);
        let (_, effects) = apply(Scenario::Rollback, &initial, &initial, 0, &mut rng);
        assert!(effects.contains("data_loss_risk"));
        assert!(effects.contains("requires_backup_verification"));
    }

    #[test]
    fn incremental_adds_one_staged_node() {
        let initial = star(5);
        let mut rng = StdRng::seed_from_u64(1);
        let (state, effects) = apply(Scenario::Incremental, &initial, &initial, 9, &mut rng);
        assert_eq!(state.node_count(), initial.node_count() + 1);
        assert!(state.nodes().any(|n| n == "staged_9"));
        assert!(effects.contains("minimal_disruption"));
    }

    #[test]
    fn defer_leaves_structure_untouched() {
        let initial = star(5);
        let mut rng = StdRng::seed_from_u64(1);
        let (state, _) = apply(Scenario::Defer, &initial, &initial, 0, &mut rng);
        assert_eq!(state, initial);
    }

    #[test]
    fn side_effects_penalize_score() {
        let none = BTreeSet::new();
        let mut many = BTreeSet::new();
        for i in 0..4 {
            many.insert(format!("effect_{i}"));
        }
        let clean = score(Scenario::Reorganize, Severity::Critical, 0.8, &none);
        let noisy = score(Scenario::Reorganize, Severity::Critical, 0.8, &many);
        assert!(clean > noisy);
    }

    #[test]
    fn severity_raises_pressure() {
        let effects = BTreeSet::new();
        let info = score(Scenario::Reorganize, Severity::Info, 0.5, &effects);
        let emergency = score(Scenario::Reorganize, Severity::Emergency, 0.5, &effects);
        assert!(emergency > info);
    }
}
