//! The self-monitor.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use quorum_circuit::{Circuit, CircuitConfig};
use quorum_deliberation::StakeholderRegistry;
use quorum_detection::{DetectorConfig, GrowthObservation, ThresholdDetector};
use quorum_intervention::{ChannelRegistry, PredicateRegistry};
use quorum_types::{CircuitError, CircuitResult};

use crate::repo::{RepoMetricConfig, RepoMetricSource, REPO_METRICS};

/// Default limits for the repository metrics.
const DEFAULT_LIMITS: [(&str, f64); 6] = [
    ("lines_per_module", 500.0),
    ("untested_ratio", 0.5),
    ("doc_drift", 5.0),
    ("dependency_additions", 10.0),
    ("self_modification", 3.0),
    ("gate_bypass", 1.0),
];

/// Self-monitor configuration.
#[derive(Clone, Debug)]
pub struct SelfMonitorConfig {
    pub circuit: CircuitConfig,
    pub repo: RepoMetricConfig,
    /// Named limits; anything omitted falls back to the defaults.
    pub limits: Vec<(String, f64)>,
}

impl Default for SelfMonitorConfig {
    fn default() -> Self {
        Self {
            circuit: CircuitConfig::default(),
            repo: RepoMetricConfig::default(),
            limits: DEFAULT_LIMITS
                .iter()
                .map(|(name, limit)| (name.to_string(), *limit))
                .collect(),
        }
    }
}

/// Outcome of a governed configuration change.
#[derive(Debug)]
pub enum ConfigChangeOutcome {
    /// The circuit approved the change; the host should rebuild the
    /// monitor with this configuration.
    Applied {
        config: DetectorConfig,
        result: CircuitResult,
    },
    /// The circuit blocked, paused, or deferred the change.
    Blocked { result: CircuitResult },
}

/// Applies the circuit to the circuit's own repository.
pub struct SelfMonitor {
    circuit: Circuit,
    repo_root: PathBuf,
}

impl SelfMonitor {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        config: SelfMonitorConfig,
        stakeholders: StakeholderRegistry,
        channels: ChannelRegistry,
        predicates: PredicateRegistry,
    ) -> Result<Self, CircuitError> {
        let detector = build_detector(&config.limits)?;
        let source = Arc::new(RepoMetricSource::new(config.repo.clone()));
        let circuit = Circuit::new(
            config.circuit.clone(),
            detector,
            source,
            stakeholders,
            channels,
            predicates,
        )?;

        Ok(Self {
            circuit,
            repo_root: repo_root.into(),
        })
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Run one inspection of the monitored repository.
    pub async fn inspect(
        &self,
        previous: Option<&GrowthObservation>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<CircuitResult, CircuitError> {
        let target = self.repo_root.to_string_lossy().to_string();
        info!(repo = %target, "self-inspection starting");
        self.circuit.run(&target, previous, cancel).await
    }

    /// Propose a change to the monitor's own threshold configuration.
    ///
    /// The change is itself a governed action: it runs through the full
    /// circuit and only comes back `Applied` when enforcement applied.
    pub async fn propose_config_change(
        &self,
        proposed: DetectorConfig,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<ConfigChangeOutcome, CircuitError> {
        // Reject malformed proposals before spending a circuit run.
        let mut probe = ThresholdDetector::new();
        for name in REPO_METRICS {
            probe.register_custom_metric(name);
        }
        probe
            .apply_config(&proposed)
            .map_err(|err| CircuitError::InvalidArgument(err.to_string()))?;

        let result = self.inspect(None, cancel).await?;
        if result.applied() && !result.cancelled {
            info!("configuration change approved by the circuit");
            Ok(ConfigChangeOutcome::Applied {
                config: proposed,
                result,
            })
        } else {
            info!(
                decision = result.decision.name(),
                "configuration change blocked by the circuit"
            );
            Ok(ConfigChangeOutcome::Blocked { result })
        }
    }
}

fn build_detector(limits: &[(String, f64)]) -> Result<ThresholdDetector, CircuitError> {
    let mut detector = ThresholdDetector::new();
    for name in REPO_METRICS {
        detector.register_custom_metric(name);
    }
    for (name, limit) in DEFAULT_LIMITS {
        detector
            .add_custom_threshold(name, limit)
            .map_err(|err| CircuitError::InvalidArgument(err.to_string()))?;
    }
    for (name, limit) in limits {
        detector
            .add_custom_threshold(name.clone(), *limit)
            .map_err(|err| CircuitError::InvalidArgument(err.to_string()))?;
    }
    Ok(detector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use quorum_deliberation::mocks::ScriptedProvider;
    use quorum_detection::MetricConfig;
    use quorum_intervention::ScriptedChannel;
    use quorum_types::{Decision, StakeholderKind};

    fn healthy_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib.rs"),
            "fn work() {}\n#[cfg(test)]\nmod tests {}\n",
        )
        .unwrap();
        dir
    }

    fn unhealthy_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut big: String = (0..700).map(|i| format!("fn f{i}() {{}}\n")).collect();
        big.push_str("#[cfg(test)]\nmod tests {}\n");
        fs::write(dir.path().join("huge.rs"), big).unwrap();
        dir
    }

    fn stakeholders(decision: Decision) -> StakeholderRegistry {
        let mut registry = StakeholderRegistry::new();
        registry.register(Arc::new(ScriptedProvider::new(
            "p1",
            StakeholderKind::Technical,
            decision,
            0.9,
        )));
        registry.register(Arc::new(ScriptedProvider::new(
            "p2",
            StakeholderKind::Ethical,
            decision,
            0.9,
        )));
        registry
    }

    fn channels() -> ChannelRegistry {
        let mut channels = ChannelRegistry::new();
        channels.register("default", Arc::new(ScriptedChannel::approving("operator")));
        channels
    }

    fn monitor(dir: &tempfile::TempDir, decision: Decision) -> SelfMonitor {
        SelfMonitor::new(
            dir.path(),
            SelfMonitorConfig {
                circuit: CircuitConfig {
                    seed: Some(42),
                    human_deadline: Duration::from_secs(5),
                    ..CircuitConfig::default()
                },
                ..SelfMonitorConfig::default()
            },
            stakeholders(decision),
            channels(),
            PredicateRegistry::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn healthy_repo_passes_trivially() {
        let dir = healthy_repo();
        let monitor = monitor(&dir, Decision::Proceed);
        let result = monitor.inspect(None, None).await.unwrap();

        assert_eq!(result.decision, Decision::Proceed);
        assert!(result.applied());
        assert!(result.event.is_none());
    }

    #[tokio::test]
    async fn oversized_module_triggers_the_circuit() {
        let dir = unhealthy_repo();
        let monitor = monitor(&dir, Decision::Proceed);
        let result = monitor.inspect(None, None).await.unwrap();

        let event = result.event.unwrap();
        assert_eq!(
            event.details.get("metric_name"),
            Some(&serde_json::json!("lines_per_module"))
        );
        assert!(result.prediction.is_some());
        assert!(result.deliberation.is_some());
    }

    #[tokio::test]
    async fn config_change_applies_when_circuit_approves() {
        let dir = healthy_repo();
        let monitor = monitor(&dir, Decision::Proceed);
        let proposed = DetectorConfig {
            metrics: vec![MetricConfig {
                name: "lines_per_module".into(),
                threshold: 800.0,
                enabled: true,
                description: String::new(),
            }],
        };

        match monitor.propose_config_change(proposed, None).await.unwrap() {
            ConfigChangeOutcome::Applied { config, result } => {
                assert_eq!(config.metrics[0].threshold, 800.0);
                assert!(result.applied());
            }
            ConfigChangeOutcome::Blocked { result } => {
                panic!("expected approval, got {}", result.summary)
            }
        }
    }

    #[tokio::test]
    async fn config_change_blocked_when_circuit_rejects() {
        let dir = unhealthy_repo();
        let monitor = monitor(&dir, Decision::Reject);
        let proposed = DetectorConfig {
            metrics: vec![MetricConfig {
                name: "gate_bypass".into(),
                threshold: 100.0,
                enabled: true,
                description: String::new(),
            }],
        };

        match monitor.propose_config_change(proposed, None).await.unwrap() {
            ConfigChangeOutcome::Blocked { result } => {
                assert_eq!(result.decision, Decision::Reject);
            }
            ConfigChangeOutcome::Applied { .. } => panic!("expected the change to be blocked"),
        }
    }

    #[tokio::test]
    async fn malformed_config_change_is_rejected_upfront() {
        let dir = healthy_repo();
        let monitor = monitor(&dir, Decision::Proceed);
        let proposed = DetectorConfig {
            metrics: vec![MetricConfig {
                name: "made_up_metric".into(),
                threshold: 1.0,
                enabled: true,
                description: String::new(),
            }],
        };

        let err = monitor
            .propose_config_change(proposed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CircuitError::InvalidArgument(_)));
    }
}
