//! The Intervenor: walks ordered gates and records every step.

use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use quorum_chain::{AuditChain, AuditEntry};
use quorum_types::{DeliberationResult, EnforcementResult, GateResult, GateStatus};

use crate::channel::{ApprovalRequest, ChannelRegistry};
use crate::error::InterventionError;
use crate::gate::Gate;
use crate::predicate::{EnforcementContext, PredicateRegistry};

const ACTOR: &str = "intervenor";

/// Host hook that reverts a partially applied action.
#[async_trait]
pub trait RollbackHandler: Send + Sync {
    async fn rollback(&self, context: &EnforcementContext) -> Result<(), String>;
}

/// Internal gate evaluation outcome.
enum GateEval {
    Done(GateResult),
    Cancelled,
}

/// Enforces deliberation decisions through gates, producing a
/// tamper-evident audit trail. The intervenor is the sole owner of the
/// chain it builds; artifacts leave it immutable.
pub struct Intervenor {
    channels: ChannelRegistry,
    predicates: PredicateRegistry,
}

impl Intervenor {
    pub fn new(channels: ChannelRegistry, predicates: PredicateRegistry) -> Self {
        Self {
            channels,
            predicates,
        }
    }

    /// Apply a deliberation decision through the given gates.
    ///
    /// Gates run strictly in order; the first non-Approved result skips
    /// the rest. A cancel signal observed at a gate boundary or inside a
    /// suspension point ends enforcement with a final
    /// `enforcement_cancelled` entry.
    pub async fn enforce(
        &self,
        decision: &DeliberationResult,
        target: &str,
        gates: &[Gate],
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<EnforcementResult, InterventionError> {
        // No code path may bypass a human gate: every named channel must
        // exist before anything runs.
        self.require_channels(decision, target, gates)?;

        let mut chain = AuditChain::new();
        chain.record(
            "enforcement_start",
            ACTOR,
            serde_json::json!({
                "decision_hash": decision.audit_hash,
                "target": target,
                "gate_count": gates.len(),
            }),
        )?;

        info!(
            decision_hash = %decision.audit_hash,
            target,
            gates = gates.len(),
            "enforcement started"
        );

        let started = Instant::now();
        let context = EnforcementContext {
            target: target.to_string(),
            decision: decision.clone(),
        };

        let mut gate_log: Vec<GateResult> = Vec::new();
        let mut halted: Option<GateStatus> = None;
        let mut was_cancelled = false;

        for gate in gates {
            if cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false) {
                was_cancelled = true;
                break;
            }

            chain.record(
                "gate_start",
                ACTOR,
                serde_json::json!({ "gate": gate.name() }),
            )?;

            let eval = self
                .check_gate(gate, &context, started, cancel.as_mut())
                .await;

            let result = match eval {
                GateEval::Done(result) => result,
                GateEval::Cancelled => {
                    was_cancelled = true;
                    break;
                }
            };

            chain.record(
                "gate_check",
                gate.name(),
                serde_json::json!({
                    "status": result.status,
                    "message": result.message,
                    "approvers": result.approvers,
                }),
            )?;

            let status = result.status;
            debug!(gate = %gate.name(), ?status, "gate checked");
            gate_log.push(result);

            if status != GateStatus::Approved {
                halted = Some(status);
                break;
            }
        }

        let applied = if was_cancelled {
            chain.record(
                "enforcement_cancelled",
                ACTOR,
                serde_json::json!({ "gates_completed": gate_log.len() }),
            )?;
            false
        } else {
            match halted {
                None => {
                    chain.record(
                        "enforcement_applied",
                        ACTOR,
                        serde_json::json!({
                            "target": target,
                            "decision": decision.decision,
                        }),
                    )?;
                    true
                }
                Some(GateStatus::Pending) => {
                    chain.record(
                        "enforcement_paused",
                        ACTOR,
                        serde_json::json!({
                            "gate": gate_log.last().map(|g| g.gate_name.clone()),
                        }),
                    )?;
                    false
                }
                Some(status) => {
                    chain.record(
                        "enforcement_blocked",
                        ACTOR,
                        serde_json::json!({
                            "gate": gate_log.last().map(|g| g.gate_name.clone()),
                            "status": status,
                        }),
                    )?;
                    false
                }
            }
        };

        info!(applied, cancelled = was_cancelled, "enforcement finished");

        Ok(EnforcementResult::new(
            decision.audit_hash.clone(),
            applied,
            false,
            gate_log,
            chain.into_entries(),
        )?)
    }

    /// Revert an applied enforcement after the host reports that the
    /// application itself failed. Extends the audit chain with the
    /// rollback lifecycle and returns the updated result.
    pub async fn rollback(
        &self,
        applied: &EnforcementResult,
        context: &EnforcementContext,
        handler: &dyn RollbackHandler,
    ) -> Result<EnforcementResult, InterventionError> {
        if !applied.applied {
            return Err(InterventionError::Rollback(
                "enforcement was never applied".into(),
            ));
        }
        let Some(last) = applied.audit_trail.last() else {
            return Err(InterventionError::Rollback("empty audit trail".into()));
        };

        let mut entries = applied.audit_trail.clone();
        entries.push(AuditEntry::append(
            "rollback_start",
            ACTOR,
            serde_json::json!({ "target": context.target }),
            last,
        )?);

        let outcome = handler.rollback(context).await;
        let succeeded = outcome.is_ok();
        let (action, details) = match outcome {
            Ok(()) => ("rollback_complete", serde_json::json!({})),
            Err(reason) => {
                warn!(reason = %reason, "rollback failed");
                ("rollback_failed", serde_json::json!({ "reason": reason }))
            }
        };
        let last = entries.last().unwrap_or_else(|| unreachable!());
        let entry = AuditEntry::append(action, ACTOR, details, last)?;
        entries.push(entry);

        Ok(EnforcementResult::new(
            applied.decision_hash.clone(),
            applied.applied,
            succeeded,
            applied.gate_log.clone(),
            entries,
        )?)
    }

    fn require_channels(
        &self,
        decision: &DeliberationResult,
        target: &str,
        gates: &[Gate],
    ) -> Result<(), InterventionError> {
        for gate in gates {
            for name in gate.required_channels() {
                if !self.channels.contains(name) {
                    let message = format!(
                        "gate {} requires channel {name} but none is registered; human approval cannot be auto-granted",
                        gate.name()
                    );
                    warn!(gate = %gate.name(), channel = name, "policy violation");

                    let mut chain = AuditChain::new();
                    chain.record(
                        "enforcement_start",
                        ACTOR,
                        serde_json::json!({
                            "decision_hash": decision.audit_hash,
                            "target": target,
                            "gate_count": gates.len(),
                        }),
                    )?;
                    chain.record(
                        "policy_violation",
                        ACTOR,
                        serde_json::json!({ "gate": gate.name(), "channel": name }),
                    )?;

                    return Err(InterventionError::PolicyViolation {
                        message,
                        trail: chain.into_entries(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn check_gate(
        &self,
        gate: &Gate,
        context: &EnforcementContext,
        started: Instant,
        cancel: Option<&mut watch::Receiver<bool>>,
    ) -> GateEval {
        let name = gate.name();
        match gate {
            Gate::HumanApproval { channel, deadline } => {
                let Some(channel_impl) = self.channels.get(channel) else {
                    return GateEval::Done(GateResult::new(
                        name,
                        GateStatus::Error,
                        format!("channel {channel} disappeared after validation"),
                    ));
                };
                let request = approval_request(&name, context);
                tokio::select! {
                    _ = wait_cancel(cancel) => GateEval::Cancelled,
                    outcome = tokio::time::timeout(*deadline, channel_impl.request_approval(request)) => {
                        GateEval::Done(match outcome {
                            Err(_) => GateResult::new(
                                name,
                                GateStatus::Timeout,
                                format!("no response within {}s", deadline.as_secs()),
                            ),
                            Ok(Ok(response)) if response.approved => {
                                GateResult::new(name, GateStatus::Approved, "approved")
                                    .with_approvers(vec![response.approver])
                            }
                            Ok(Ok(response)) => GateResult::new(
                                name,
                                GateStatus::Rejected,
                                format!("rejected by {}", response.approver),
                            ),
                            Ok(Err(err)) => {
                                GateResult::new(name, GateStatus::Error, err.to_string())
                            }
                        })
                    }
                }
            }

            Gate::Timeout { duration } => {
                let result = if started.elapsed() >= *duration {
                    GateResult::new(
                        name,
                        GateStatus::Rejected,
                        format!("still pending after {}s", duration.as_secs()),
                    )
                } else {
                    GateResult::new(name, GateStatus::Approved, "within the enforcement deadline")
                };
                GateEval::Done(result)
            }

            Gate::MultiApprove {
                required,
                channels,
                deadline,
            } => {
                self.check_multi_approve(&name, *required, channels, *deadline, context, cancel)
                    .await
            }

            Gate::ConditionCheck { conditions } => {
                let failed: Vec<&String> = conditions
                    .iter()
                    .filter(|c| !self.predicates.evaluate(c, context))
                    .collect();
                let result = if failed.is_empty() {
                    GateResult::new(name, GateStatus::Approved, "all conditions satisfied")
                } else {
                    GateResult::new(
                        name,
                        GateStatus::Rejected,
                        format!(
                            "conditions not met: {}",
                            failed
                                .iter()
                                .map(|s| s.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    )
                };
                GateEval::Done(result)
            }

            Gate::Pause { signal, .. } => match signal {
                None => GateEval::Done(GateResult::new(
                    name,
                    GateStatus::Pending,
                    "paused; manual intervention required",
                )),
                Some(signal) => {
                    if signal.is_resumed() {
                        return GateEval::Done(GateResult::new(
                            name,
                            GateStatus::Approved,
                            "pause already lifted",
                        ));
                    }
                    let mut signal = signal.clone();
                    tokio::select! {
                        _ = wait_cancel(cancel) => GateEval::Cancelled,
                        resumed = signal.wait() => {
                            GateEval::Done(if resumed {
                                GateResult::new(name, GateStatus::Approved, "pause lifted")
                            } else {
                                GateResult::new(
                                    name,
                                    GateStatus::Pending,
                                    "resume controller dropped; still paused",
                                )
                            })
                        }
                    }
                }
            },
        }
    }

    async fn check_multi_approve(
        &self,
        name: &str,
        required: usize,
        channels: &[String],
        deadline: std::time::Duration,
        context: &EnforcementContext,
        cancel: Option<&mut watch::Receiver<bool>>,
    ) -> GateEval {
        if required == 0 || required > channels.len() {
            return GateEval::Done(GateResult::new(
                name,
                GateStatus::Error,
                format!("quorum {required} of {} is not satisfiable", channels.len()),
            ));
        }

        let mut join_set = JoinSet::new();
        for channel_name in channels {
            let Some(channel_impl) = self.channels.get(channel_name) else {
                return GateEval::Done(GateResult::new(
                    name,
                    GateStatus::Error,
                    format!("channel {channel_name} disappeared after validation"),
                ));
            };
            let request = approval_request(name, context);
            let channel_name = channel_name.clone();
            join_set
                .spawn(async move { (channel_name, channel_impl.request_approval(request).await) });
        }

        let deadline_sleep = tokio::time::sleep(deadline);
        tokio::pin!(deadline_sleep);
        let mut cancel = cancel;

        let mut approvers: Vec<String> = Vec::new();
        let mut remaining = channels.len();

        loop {
            tokio::select! {
                _ = wait_cancel(cancel.as_mut().map(|rx| &mut **rx)) => return GateEval::Cancelled,
                _ = &mut deadline_sleep => {
                    return GateEval::Done(GateResult::new(
                        name,
                        GateStatus::Timeout,
                        format!(
                            "{} of {required} approvals before the {}s deadline",
                            approvers.len(),
                            deadline.as_secs()
                        ),
                    ).with_approvers(approvers));
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else {
                        return GateEval::Done(GateResult::new(
                            name,
                            GateStatus::Rejected,
                            format!("insufficient approvals: {} of {required}", approvers.len()),
                        ).with_approvers(approvers));
                    };
                    remaining -= 1;

                    match joined {
                        Ok((_, Ok(response))) if response.approved => {
                            approvers.push(response.approver);
                            if approvers.len() >= required {
                                return GateEval::Done(
                                    GateResult::new(
                                        name,
                                        GateStatus::Approved,
                                        format!("{} of {required} approvals received", approvers.len()),
                                    )
                                    .with_approvers(approvers),
                                );
                            }
                        }
                        Ok((channel_name, Ok(response))) => {
                            return GateEval::Done(GateResult::new(
                                name,
                                GateStatus::Rejected,
                                format!("rejected by {} via {channel_name}", response.approver),
                            ).with_approvers(approvers));
                        }
                        Ok((channel_name, Err(err))) => {
                            warn!(channel = %channel_name, error = %err, "approver channel failed");
                        }
                        Err(join_err) => {
                            warn!(error = %join_err, "approver task failed");
                        }
                    }

                    if approvers.len() + remaining < required {
                        return GateEval::Done(GateResult::new(
                            name,
                            GateStatus::Rejected,
                            format!(
                                "quorum unreachable: {} approvals with {remaining} responders left",
                                approvers.len()
                            ),
                        ).with_approvers(approvers));
                    }
                }
            }
        }
    }
}

fn approval_request(gate_name: &str, context: &EnforcementContext) -> ApprovalRequest {
    ApprovalRequest {
        decision_hash: context.decision.audit_hash.clone(),
        decision: context.decision.decision.name().to_string(),
        rationale: context.decision.rationale.clone(),
        gate_name: gate_name.to_string(),
        target: context.target.clone(),
    }
}

/// Resolves when the cancel flag flips to true; pends forever otherwise.
async fn wait_cancel(cancel: Option<&mut watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending().await,
    }
}
