//! Top-level circuit result.

use serde::{Deserialize, Serialize};

use crate::deliberation::DeliberationResult;
use crate::enforcement::EnforcementResult;
use crate::error::FailureKind;
use crate::event::ThresholdEvent;
use crate::prediction::Prediction;
use crate::vote::Decision;

/// Circuit stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Detection,
    Simulation,
    Deliberation,
    Intervention,
}

/// Failure tag on a circuit result: what went wrong, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitFailure {
    pub kind: FailureKind,
    pub stage: Stage,
}

/// Top-level artifact for one proposed action.
///
/// Stages completed before a failure or cancellation keep their
/// artifacts; downstream stages are never synthesized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircuitResult {
    pub target: String,
    pub event: Option<ThresholdEvent>,
    pub prediction: Option<Prediction>,
    pub deliberation: Option<DeliberationResult>,
    pub enforcement: Option<EnforcementResult>,
    pub decision: Decision,
    pub cancelled: bool,
    pub failure: Option<CircuitFailure>,
    pub summary: String,
    pub duration_ms: u64,
}

impl CircuitResult {
    pub fn applied(&self) -> bool {
        self.enforcement.as_ref().map(|e| e.applied).unwrap_or(false)
    }

    /// Process exit code when the circuit drives a process.
    pub fn exit_code(&self) -> i32 {
        if self.failure.is_some() {
            return 4;
        }
        match self.decision {
            Decision::Proceed => {
                if self.applied() {
                    0
                } else {
                    1
                }
            }
            Decision::Conditional => {
                if self.applied() {
                    0
                } else {
                    3
                }
            }
            Decision::Reject | Decision::Pause => 1,
            Decision::Defer => 2,
        }
    }
}
