//! End-to-end circuit scenarios.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use quorum_bus::topics;
use quorum_chain::{verify_chain, EntryStatus};
use quorum_circuit::{Circuit, CircuitConfig};
use quorum_deliberation::{
    mocks::ScriptedProvider, EthicalEvaluator, StakeholderRegistry, TechnicalEvaluator,
};
use quorum_detection::{DetectionError, MetricSample, MetricSource, ThresholdDetector};
use quorum_intervention::{ChannelRegistry, Gate, PredicateRegistry, ScriptedChannel};
use quorum_simulation::{SimulationConfig, Simulator};
use quorum_types::{
    Decision, GateStatus, MetricKind, Scenario, Severity, StakeholderKind, ThresholdEvent,
};

/// Metric source reporting a fixed file count.
struct FixedFiles(f64);

impl MetricSource for FixedFiles {
    fn collect(&self, _target: &str) -> Result<Vec<MetricSample>, DetectionError> {
        Ok(vec![MetricSample::new(MetricKind::FileCount, self.0)])
    }
}

fn detector() -> ThresholdDetector {
    let mut d = ThresholdDetector::new();
    d.add_threshold(MetricKind::FileCount, 100.0).unwrap();
    d
}

fn auto_stakeholders() -> StakeholderRegistry {
    let mut registry = StakeholderRegistry::new();
    registry.register(Arc::new(TechnicalEvaluator::default()));
    registry.register(Arc::new(EthicalEvaluator::default()));
    registry
}

fn approving_channels() -> ChannelRegistry {
    let mut channels = ChannelRegistry::new();
    channels.register("default", Arc::new(ScriptedChannel::approving("operator")));
    channels
}

fn standard_predicates() -> PredicateRegistry {
    let mut predicates = PredicateRegistry::new();
    predicates.register("logging_enabled", |_| true);
    predicates.register("rollback_available", |_| true);
    predicates
}

fn circuit(file_count: f64, stakeholders: StakeholderRegistry) -> Circuit {
    Circuit::new(
        CircuitConfig {
            seed: Some(42),
            ..CircuitConfig::default()
        },
        detector(),
        Arc::new(FixedFiles(file_count)),
        stakeholders,
        approving_channels(),
        standard_predicates(),
    )
    .unwrap()
}

fn trail_actions(result: &quorum_types::CircuitResult) -> Vec<String> {
    result
        .enforcement
        .as_ref()
        .unwrap()
        .audit_trail
        .iter()
        .map(|e| e.action.clone())
        .collect()
}

// A target well under every limit passes without simulation or votes.
#[tokio::test]
async fn trivial_pass_under_all_limits() {
    let circuit = circuit(10.0, auto_stakeholders());
    let result = circuit.run("/tmp/intake", None, None).await.unwrap();

    assert_eq!(result.decision, Decision::Proceed);
    assert!(result.applied());
    assert!(result.event.is_none());
    assert!(result.prediction.is_none());
    assert!(result.deliberation.is_none());

    let enforcement = result.enforcement.as_ref().unwrap();
    assert!(enforcement.gate_log.is_empty());
    assert_eq!(trail_actions(&result), vec!["no_threshold"]);
    assert!(verify_chain(&enforcement.audit_trail).unwrap().valid);
    assert_eq!(result.exit_code(), 0);
}

// A critical crossing routed through a single human-approval gate.
#[tokio::test]
async fn critical_crossing_with_human_approval() {
    let circuit = circuit(120.0, auto_stakeholders());
    let gates = vec![Gate::HumanApproval {
        channel: "default".into(),
        deadline: Duration::from_secs(5),
    }];
    let result = circuit
        .run_with_gates("/tmp/intake", None, None, Some(gates))
        .await
        .unwrap();

    assert_eq!(result.decision, Decision::Conditional);

    let deliberation = result.deliberation.as_ref().unwrap();
    for condition in ["logging_enabled", "rollback_available"] {
        assert!(
            deliberation.conditions.contains(&condition.to_string()),
            "missing condition {condition}"
        );
    }

    assert!(result.applied());
    assert_eq!(
        trail_actions(&result),
        vec!["enforcement_start", "gate_start", "gate_check", "enforcement_applied"]
    );
    let enforcement = result.enforcement.as_ref().unwrap();
    assert!(verify_chain(&enforcement.audit_trail).unwrap().valid);
    assert_eq!(enforcement.gate_log[0].approvers, vec!["operator".to_string()]);
    assert_eq!(result.exit_code(), 0);
}

// A confident ethical rejection blocks enforcement before any gate runs.
#[tokio::test]
async fn confident_ethical_reject_blocks_enforcement() {
    let mut stakeholders = StakeholderRegistry::new();
    stakeholders.register(Arc::new(TechnicalEvaluator::default()));
    stakeholders.register(Arc::new(
        ScriptedProvider::new("ethics-board", StakeholderKind::Ethical, Decision::Reject, 0.9)
            .with_rationale("emergency-scale growth indicates runaway automation"),
    ));

    let circuit = circuit(300.0, stakeholders);
    let result = circuit.run("/tmp/intake", None, None).await.unwrap();

    assert_eq!(result.event.as_ref().unwrap().severity, Severity::Emergency);
    assert_eq!(result.decision, Decision::Reject);
    assert!(!result.applied());

    let enforcement = result.enforcement.as_ref().unwrap();
    assert!(enforcement.gate_log.is_empty());
    assert_eq!(
        trail_actions(&result),
        vec!["enforcement_start", "enforcement_blocked_by_deliberation"]
    );
    assert!(verify_chain(&enforcement.audit_trail).unwrap().valid);
    assert_eq!(result.exit_code(), 1);
}

// Flipping one recorded field invalidates that entry and all of its successors.
#[tokio::test]
async fn tampered_audit_trail_is_detected() {
    let circuit = circuit(120.0, auto_stakeholders());
    let gates = vec![Gate::HumanApproval {
        channel: "default".into(),
        deadline: Duration::from_secs(5),
    }];
    let result = circuit
        .run_with_gates("/tmp/intake", None, None, Some(gates))
        .await
        .unwrap();

    let mut trail = result.enforcement.unwrap().audit_trail;
    assert!(verify_chain(&trail).unwrap().valid);

    trail[1].details = serde_json::json!({ "gate": "HumanApproval(intruder)" });

    let report = verify_chain(&trail).unwrap();
    assert!(!report.valid);
    assert_eq!(report.first_invalid_index, Some(1));
    assert_eq!(report.statuses[1], EntryStatus::ContentMismatch);
    for status in &report.statuses[2..] {
        assert_eq!(*status, EntryStatus::BrokenLink);
    }
}

// The same event, seed, and run count reproduce an identical prediction.
#[tokio::test]
async fn prediction_reproducibility_across_runs() {
    let event = ThresholdEvent::new(
        MetricKind::FileCount,
        120.0,
        100.0,
        Severity::Critical,
        "/tmp/intake",
        BTreeMap::new(),
    )
    .unwrap();

    let simulator = || {
        Simulator::new(
            "governance",
            SimulationConfig {
                monte_carlo_runs: 100,
                seed: Some(42),
                deadline: None,
            },
        )
    };

    let first = simulator().predict(&event, &Scenario::ALL).unwrap();
    let second = simulator().predict(&event, &Scenario::ALL).unwrap();

    assert_eq!(first.prediction_hash, second.prediction_hash);
    assert_eq!(
        serde_json::to_value(&first.outcomes).unwrap(),
        serde_json::to_value(&second.outcomes).unwrap()
    );

    // Strip the timestamps: everything else must be byte-identical.
    let mut a = serde_json::to_value(&first).unwrap();
    let mut b = serde_json::to_value(&second).unwrap();
    a.as_object_mut().unwrap().remove("timestamp");
    b.as_object_mut().unwrap().remove("timestamp");
    assert_eq!(a, b);
}

// A 3-of-5 quorum with only two responders times out at the deadline.
#[tokio::test]
async fn multi_approve_quorum_times_out() {
    let mut channels = approving_channels();
    channels.register("a", Arc::new(ScriptedChannel::approving("alice")));
    channels.register("b", Arc::new(ScriptedChannel::approving("bob")));
    channels.register("c", Arc::new(ScriptedChannel::silent("carol")));
    channels.register("d", Arc::new(ScriptedChannel::silent("dan")));
    channels.register("e", Arc::new(ScriptedChannel::silent("eve")));

    let circuit = Circuit::new(
        CircuitConfig {
            seed: Some(42),
            ..CircuitConfig::default()
        },
        detector(),
        Arc::new(FixedFiles(120.0)),
        auto_stakeholders(),
        channels,
        standard_predicates(),
    )
    .unwrap();

    let gates = vec![
        Gate::MultiApprove {
            required: 3,
            channels: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            deadline: Duration::from_millis(200),
        },
        Gate::HumanApproval {
            channel: "default".into(),
            deadline: Duration::from_secs(5),
        },
    ];
    let result = circuit
        .run_with_gates("/tmp/intake", None, None, Some(gates))
        .await
        .unwrap();

    assert!(!result.applied());
    let enforcement = result.enforcement.as_ref().unwrap();
    assert_eq!(enforcement.gate_log.len(), 1);
    assert_eq!(enforcement.gate_log[0].status, GateStatus::Timeout);
    assert_eq!(enforcement.gate_log[0].approvers.len(), 2);
    assert_eq!(
        trail_actions(&result).last().map(String::as_str),
        Some("enforcement_blocked")
    );
}

// Pause decisions halt at a pending pause gate.
#[tokio::test]
async fn pause_decision_pauses_enforcement() {
    let mut stakeholders = StakeholderRegistry::new();
    stakeholders.register(Arc::new(ScriptedProvider::new(
        "p1",
        StakeholderKind::Technical,
        Decision::Pause,
        0.8,
    )));
    stakeholders.register(Arc::new(ScriptedProvider::new(
        "p2",
        StakeholderKind::Ethical,
        Decision::Pause,
        0.8,
    )));

    let circuit = circuit(120.0, stakeholders);
    let result = circuit.run("/tmp/intake", None, None).await.unwrap();

    assert_eq!(result.decision, Decision::Pause);
    assert!(!result.applied());
    let enforcement = result.enforcement.as_ref().unwrap();
    assert_eq!(enforcement.gate_log[0].status, GateStatus::Pending);
    assert_eq!(
        trail_actions(&result).last().map(String::as_str),
        Some("enforcement_paused")
    );
    assert_eq!(result.exit_code(), 1);
}

// A missing default channel cannot silently approve a human gate.
#[tokio::test]
async fn missing_channel_is_policy_violation_end_to_end() {
    let circuit = Circuit::new(
        CircuitConfig {
            seed: Some(42),
            ..CircuitConfig::default()
        },
        detector(),
        Arc::new(FixedFiles(120.0)),
        auto_stakeholders(),
        ChannelRegistry::new(),
        standard_predicates(),
    )
    .unwrap();

    let result = circuit.run("/tmp/intake", None, None).await.unwrap();

    let failure = result.failure.unwrap();
    assert_eq!(failure.kind, quorum_types::FailureKind::PolicyViolation);
    assert_eq!(failure.stage, quorum_types::Stage::Intervention);
    assert_eq!(
        trail_actions(&result).last().map(String::as_str),
        Some("policy_violation")
    );
    assert_eq!(result.exit_code(), 4);
}

// Cancellation between stages truncates the result.
#[tokio::test]
async fn cancellation_between_stages_truncates() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let circuit = circuit(120.0, auto_stakeholders());
    let result = circuit.run("/tmp/intake", None, Some(rx)).await.unwrap();

    assert!(result.cancelled);
    assert!(result.prediction.is_none());
    assert!(result.deliberation.is_none());
    assert_eq!(
        trail_actions(&result).last().map(String::as_str),
        Some("circuit_cancelled")
    );
}

// Every stage hand-off is published on the bus in order.
#[tokio::test]
async fn bus_receives_stage_publications() {
    let circuit = circuit(120.0, auto_stakeholders());
    let result = circuit.run("/tmp/intake", None, None).await.unwrap();
    assert!(result.applied());

    let log = circuit.bus().log_snapshot();
    let topics_seen: Vec<&str> = log.iter().map(|e| e.topic.as_str()).collect();
    assert_eq!(
        topics_seen,
        vec![
            topics::THRESHOLD_DETECTED,
            topics::SIMULATION_COMPLETE,
            topics::DELIBERATION_COMPLETE,
            topics::INTERVENTION_COMPLETE,
            topics::CIRCUIT_COMPLETE,
        ]
    );

    let ndjson = circuit.bus().export_ndjson().unwrap();
    assert_eq!(ndjson.lines().count(), log.len());
}
