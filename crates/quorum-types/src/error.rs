//! Circuit error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quorum_chain::ChainError;

use crate::circuit::Stage;

/// Errors surfaced at component boundaries.
///
/// Timeouts are absorbed inside their stage (abstention in deliberation,
/// a `Timeout` gate result in intervention) and only reach this type when
/// a whole stage exceeds its host-configured deadline.
#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("simulation unstable: {0}")]
    SimulationInstability(String),

    #[error("{stage:?} stage exceeded its deadline")]
    Timeout { stage: Stage },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("cancelled during {stage:?}")]
    Cancelled { stage: Stage },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Serializable tag for a failure, carried on `CircuitResult`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidArgument,
    SimulationInstability,
    Timeout,
    PolicyViolation,
    IntegrityError,
    Cancelled,
    Canonicalization,
}

impl CircuitError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidArgument(_) => FailureKind::InvalidArgument,
            Self::SimulationInstability(_) => FailureKind::SimulationInstability,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::PolicyViolation(_) => FailureKind::PolicyViolation,
            Self::Integrity(_) => FailureKind::IntegrityError,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::Chain(_) => FailureKind::Canonicalization,
        }
    }
}
