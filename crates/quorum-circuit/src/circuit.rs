//! Circuit orchestration.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use quorum_bus::{topics, EventBus};
use quorum_chain::AuditChain;
use quorum_deliberation::{
    DeliberationTemplate, Deliberator, DeliberatorConfig, StakeholderRegistry,
};
use quorum_detection::{GrowthObservation, MetricSource, ThresholdDetector};
use quorum_intervention::{
    ChannelRegistry, Gate, Intervenor, InterventionError, PredicateRegistry, ResumeSignal,
};
use quorum_simulation::{SimulationConfig, SimulationError, Simulator};
use quorum_types::{
    CircuitError, CircuitFailure, CircuitResult, Decision, DeliberationResult, EnforcementResult,
    GateStatus, Prediction, Scenario, Severity, Stage, ThresholdEvent,
};

use crate::config::CircuitConfig;

const ACTOR: &str = "circuit";

/// Orchestrates the four stages for one proposed action.
pub struct Circuit {
    config: CircuitConfig,
    bus: Arc<EventBus>,
    detector: ThresholdDetector,
    source: Arc<dyn MetricSource + Send + Sync>,
    simulator: Simulator,
    deliberator: Deliberator,
    intervenor: Intervenor,
    resume: Option<ResumeSignal>,
}

impl Circuit {
    pub fn new(
        config: CircuitConfig,
        detector: ThresholdDetector,
        source: Arc<dyn MetricSource + Send + Sync>,
        stakeholders: StakeholderRegistry,
        channels: ChannelRegistry,
        predicates: PredicateRegistry,
    ) -> Result<Self, CircuitError> {
        let template = DeliberationTemplate::builtin(&config.template).ok_or_else(|| {
            CircuitError::InvalidArgument(format!("unknown template: {}", config.template))
        })?;
        let deliberator = Deliberator::new(
            template,
            stakeholders,
            DeliberatorConfig {
                provider_deadline: config.provider_deadline,
            },
        )
        .map_err(|err| CircuitError::InvalidArgument(err.to_string()))?;

        let simulator = Simulator::new(
            config.model.clone(),
            SimulationConfig {
                monte_carlo_runs: config.monte_carlo_runs,
                seed: config.seed,
                deadline: config.simulation_deadline,
            },
        );

        Ok(Self {
            config,
            bus: Arc::new(EventBus::new()),
            detector,
            source,
            simulator,
            deliberator,
            intervenor: Intervenor::new(channels, predicates),
            resume: None,
        })
    }

    /// Attach a resume signal for Pause gates.
    pub fn with_resume_signal(mut self, signal: ResumeSignal) -> Self {
        self.resume = Some(signal);
        self
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Run the full circuit against a target.
    ///
    /// `previous` is the host-carried growth observation; `cancel` is
    /// observed at every stage boundary and inside suspension points.
    pub async fn run(
        &self,
        target: &str,
        previous: Option<&GrowthObservation>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<CircuitResult, CircuitError> {
        self.run_with_gates(target, previous, cancel, None).await
    }

    /// Run the circuit with a host-supplied gate composition instead of
    /// the default decision mapping. Reject and Defer still bypass the
    /// gates entirely.
    pub async fn run_with_gates(
        &self,
        target: &str,
        previous: Option<&GrowthObservation>,
        cancel: Option<watch::Receiver<bool>>,
        gates_override: Option<Vec<Gate>>,
    ) -> Result<CircuitResult, CircuitError> {
        let started = Instant::now();
        info!(target, "circuit run starting");

        // Phase 1: Detection.
        let outcome = self
            .detector
            .scan(self.source.as_ref(), target, previous)
            .map_err(|err| CircuitError::InvalidArgument(err.to_string()))?;

        for event in &outcome.events {
            self.publish(topics::THRESHOLD_DETECTED, event, "detection");
        }

        let Some(primary) = select_primary(&outcome.events) else {
            let enforcement = no_threshold_enforcement(target)?;
            let result = self.finish(
                CircuitResult {
                    target: target.to_string(),
                    event: None,
                    prediction: None,
                    deliberation: None,
                    enforcement: Some(enforcement),
                    decision: Decision::Proceed,
                    cancelled: false,
                    failure: None,
                    summary: "no thresholds crossed; system within limits".into(),
                    duration_ms: 0,
                },
                started,
            );
            return Ok(result);
        };
        let primary = primary.clone();

        if is_cancelled(&cancel) {
            return self.cancelled_result(
                target,
                Stage::Simulation,
                Some(primary),
                None,
                None,
                started,
            );
        }

        // Phase 2: Simulation.
        let prediction = match self.simulator.predict(&primary, &Scenario::ALL) {
            Ok(prediction) => prediction,
            Err(SimulationError::InvalidArgument(message)) => {
                return Err(CircuitError::InvalidArgument(message));
            }
            Err(err) => {
                warn!(error = %err, "simulation failed");
                return Ok(self.failure_result(
                    target,
                    primary,
                    CircuitFailure {
                        kind: quorum_types::FailureKind::SimulationInstability,
                        stage: Stage::Simulation,
                    },
                    "simulation_failed",
                    serde_json::json!({ "reason": err.to_string() }),
                    started,
                )?);
            }
        };
        self.publish(topics::SIMULATION_COMPLETE, &prediction, "simulation");

        if is_cancelled(&cancel) {
            return Ok(self.cancelled_result(
                target,
                Stage::Deliberation,
                Some(primary),
                Some(prediction),
                None,
                started,
            )?);
        }

        // Phase 3: Deliberation.
        let deliberation = self
            .deliberator
            .deliberate(&primary, &prediction)
            .await
            .map_err(|err| CircuitError::Integrity(err.to_string()))?;
        self.publish(topics::DELIBERATION_COMPLETE, &deliberation, "deliberation");

        if is_cancelled(&cancel) {
            return Ok(self.cancelled_result(
                target,
                Stage::Intervention,
                Some(primary),
                Some(prediction),
                Some(deliberation),
                started,
            )?);
        }

        // Phase 4: Intervention.
        let decision = deliberation.decision;
        let enforcement = match decision {
            Decision::Reject => blocked_enforcement(
                &deliberation,
                target,
                "enforcement_blocked_by_deliberation",
            )?,
            Decision::Defer => {
                blocked_enforcement(&deliberation, target, "enforcement_deferred")?
            }
            _ => {
                let gates = gates_override.unwrap_or_else(|| self.gates_for(&deliberation));
                match self
                    .intervenor
                    .enforce(&deliberation, target, &gates, cancel.clone())
                    .await
                {
                    Ok(result) => result,
                    Err(InterventionError::PolicyViolation { message, trail }) => {
                        warn!(message = %message, "policy violation during enforcement");
                        let enforcement = EnforcementResult::new(
                            deliberation.audit_hash.clone(),
                            false,
                            false,
                            vec![],
                            trail,
                        )?;
                        let mut result = CircuitResult {
                            target: target.to_string(),
                            event: Some(primary),
                            prediction: Some(prediction),
                            deliberation: Some(deliberation),
                            enforcement: Some(enforcement),
                            decision,
                            cancelled: false,
                            failure: Some(CircuitFailure {
                                kind: quorum_types::FailureKind::PolicyViolation,
                                stage: Stage::Intervention,
                            }),
                            summary: format!("policy violation: {message}"),
                            duration_ms: 0,
                        };
                        result = self.finish(result, started);
                        return Ok(result);
                    }
                    Err(err) => {
                        return Err(CircuitError::Integrity(err.to_string()));
                    }
                }
            }
        };
        self.publish(topics::INTERVENTION_COMPLETE, &enforcement, "intervention");

        let cancelled = is_cancelled(&cancel)
            || enforcement
                .audit_trail
                .last()
                .map(|e| e.action == "enforcement_cancelled")
                .unwrap_or(false);

        let summary = build_summary(&outcome.events, &prediction, &deliberation, &enforcement);
        let result = self.finish(
            CircuitResult {
                target: target.to_string(),
                event: Some(primary),
                prediction: Some(prediction),
                deliberation: Some(deliberation),
                enforcement: Some(enforcement),
                decision,
                cancelled,
                failure: None,
                summary,
                duration_ms: 0,
            },
            started,
        );
        Ok(result)
    }

    /// Map the deliberation decision onto a gate composition.
    fn gates_for(&self, deliberation: &DeliberationResult) -> Vec<Gate> {
        match deliberation.decision {
            Decision::Proceed => vec![],
            Decision::Conditional => vec![
                Gate::ConditionCheck {
                    conditions: deliberation.conditions.clone(),
                },
                Gate::HumanApproval {
                    channel: self.config.default_channel.clone(),
                    deadline: self.config.human_deadline,
                },
            ],
            Decision::Pause => vec![Gate::Pause {
                condition: "manual-resume".into(),
                signal: self.resume.clone(),
            }],
            // Reject and Defer never reach the intervenor.
            Decision::Reject | Decision::Defer => vec![],
        }
    }

    fn failure_result(
        &self,
        target: &str,
        event: ThresholdEvent,
        failure: CircuitFailure,
        action: &str,
        details: serde_json::Value,
        started: Instant,
    ) -> Result<CircuitResult, CircuitError> {
        let mut chain = AuditChain::new();
        chain.record(action, ACTOR, details)?;
        let enforcement = EnforcementResult::new("", false, false, vec![], chain.into_entries())?;

        let result = CircuitResult {
            target: target.to_string(),
            event: Some(event),
            prediction: None,
            deliberation: None,
            enforcement: Some(enforcement),
            decision: Decision::Defer,
            cancelled: false,
            failure: Some(failure),
            summary: format!("circuit failed during {:?}: {action}", failure.stage),
            duration_ms: 0,
        };
        Ok(self.finish(result, started))
    }

    fn cancelled_result(
        &self,
        target: &str,
        stage: Stage,
        event: Option<ThresholdEvent>,
        prediction: Option<Prediction>,
        deliberation: Option<DeliberationResult>,
        started: Instant,
    ) -> Result<CircuitResult, CircuitError> {
        debug!(?stage, "circuit cancelled at stage boundary");
        let mut chain = AuditChain::new();
        chain.record(
            "circuit_cancelled",
            ACTOR,
            serde_json::json!({ "stage": stage }),
        )?;
        let enforcement = EnforcementResult::new("", false, false, vec![], chain.into_entries())?;

        let decision = deliberation
            .as_ref()
            .map(|d| d.decision)
            .unwrap_or(Decision::Defer);
        let result = CircuitResult {
            target: target.to_string(),
            event,
            prediction,
            deliberation,
            enforcement: Some(enforcement),
            decision,
            cancelled: true,
            failure: None,
            summary: format!("cancelled before {stage:?}"),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.publish(topics::CIRCUIT_CANCELLED, &result, ACTOR);
        Ok(result)
    }

    fn finish(&self, mut result: CircuitResult, started: Instant) -> CircuitResult {
        result.duration_ms = started.elapsed().as_millis() as u64;
        let topic = if result.cancelled {
            topics::CIRCUIT_CANCELLED
        } else {
            topics::CIRCUIT_COMPLETE
        };
        self.publish(topic, &result, ACTOR);
        info!(
            decision = result.decision.name(),
            applied = result.applied(),
            cancelled = result.cancelled,
            duration_ms = result.duration_ms,
            "circuit run finished"
        );
        result
    }

    fn publish<T: serde::Serialize>(&self, topic: &str, artifact: &T, source: &str) {
        match serde_json::to_value(artifact) {
            Ok(payload) => {
                if let Err(err) = self.bus.publish(topic, payload, source) {
                    warn!(topic, error = %err, "bus publication failed");
                }
            }
            Err(err) => warn!(topic, error = %err, "artifact serialization failed"),
        }
    }
}

/// Highest-severity event wins; ties break toward the most recent.
fn select_primary(events: &[ThresholdEvent]) -> Option<&ThresholdEvent> {
    events
        .iter()
        .filter(|e| e.severity >= Severity::Warning)
        .max_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then(a.timestamp.cmp(&b.timestamp))
        })
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

fn no_threshold_enforcement(target: &str) -> Result<EnforcementResult, CircuitError> {
    let mut chain = AuditChain::new();
    chain.record(
        "no_threshold",
        ACTOR,
        serde_json::json!({ "target": target }),
    )?;
    Ok(EnforcementResult::new(
        "",
        true,
        false,
        vec![],
        chain.into_entries(),
    )?)
}

/// Enforcement record for decisions that never reach the gates.
fn blocked_enforcement(
    deliberation: &DeliberationResult,
    target: &str,
    action: &str,
) -> Result<EnforcementResult, CircuitError> {
    let mut chain = AuditChain::new();
    chain.record(
        "enforcement_start",
        ACTOR,
        serde_json::json!({
            "decision_hash": deliberation.audit_hash,
            "target": target,
            "gate_count": 0,
        }),
    )?;
    chain.record(
        action,
        ACTOR,
        serde_json::json!({ "decision": deliberation.decision }),
    )?;
    Ok(EnforcementResult::new(
        deliberation.audit_hash.clone(),
        false,
        false,
        vec![],
        chain.into_entries(),
    )?)
}

fn build_summary(
    events: &[ThresholdEvent],
    prediction: &Prediction,
    deliberation: &DeliberationResult,
    enforcement: &EnforcementResult,
) -> String {
    let critical = events
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .count();
    let emergency = events
        .iter()
        .filter(|e| e.severity == Severity::Emergency)
        .count();

    let mut parts = vec![format!(
        "detection: {} events ({critical} critical, {emergency} emergency)",
        events.len()
    )];

    if let Some(best) = prediction.best_outcome() {
        parts.push(format!(
            "simulation: best outcome {} (p={:.0}%, reversibility={:.0}%)",
            best.scenario.name(),
            best.probability * 100.0,
            best.reversibility * 100.0
        ));
    }

    parts.push(format!(
        "deliberation: {} ({} votes, {} dissents)",
        deliberation.decision.name(),
        deliberation.votes.len(),
        deliberation.dissenting_views.len()
    ));

    let enforcement_part = if enforcement.applied {
        "enforcement: applied".to_string()
    } else if enforcement.rolled_back {
        "enforcement: rolled back".to_string()
    } else {
        let passed = enforcement
            .gate_log
            .iter()
            .filter(|g| g.status == GateStatus::Approved)
            .count();
        format!(
            "enforcement: blocked ({passed}/{} gates passed)",
            enforcement.gate_log.len()
        )
    };
    parts.push(enforcement_part);

    parts.join(" | ")
}
