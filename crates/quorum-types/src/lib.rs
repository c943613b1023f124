//! Shared artifact types for the governance circuit.
//!
//! Every stage of the circuit produces exactly one immutable artifact;
//! these types are the contract between stages. Artifacts bind to their
//! predecessors by hash reference (the `event_hash` is the join key),
//! never by pointer, so no object graph cycles form across stages.

#![deny(unsafe_code)]

pub mod circuit;
pub mod deliberation;
pub mod enforcement;
pub mod error;
pub mod event;
pub mod prediction;
pub mod vote;

pub use circuit::{CircuitFailure, CircuitResult, Stage};
pub use deliberation::DeliberationResult;
pub use enforcement::{EnforcementResult, GateResult, GateStatus};
pub use error::{CircuitError, FailureKind};
pub use event::{MetricKind, Severity, ThresholdEvent};
pub use prediction::{outcome_order, Outcome, Prediction, Scenario};
pub use vote::{Decision, DissentRecord, StakeholderKind, StakeholderVote};
