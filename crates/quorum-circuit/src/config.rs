//! Circuit configuration.
//!
//! Read-only for the duration of an invocation; changes require a new
//! circuit.

use std::time::Duration;

/// Tunables for one circuit instance.
#[derive(Clone, Debug)]
pub struct CircuitConfig {
    /// Simulation model name.
    pub model: String,
    /// Monte-Carlo runs per prediction.
    pub monte_carlo_runs: u32,
    /// Fixed seed; derived from the event hash when absent.
    pub seed: Option<u64>,
    /// Simulation stage deadline.
    pub simulation_deadline: Option<Duration>,
    /// Deliberation template name (built-in).
    pub template: String,
    /// Per-provider vote deadline.
    pub provider_deadline: Duration,
    /// Channel name used for the default human-approval gate.
    pub default_channel: String,
    /// Deadline for human-approval gates.
    pub human_deadline: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            model: "governance".into(),
            monte_carlo_runs: 100,
            seed: None,
            simulation_deadline: None,
            template: "btb_dimensions".into(),
            provider_deadline: Duration::from_secs(5),
            default_channel: "default".into(),
            human_deadline: Duration::from_secs(60),
        }
    }
}
