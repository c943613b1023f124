use thiserror::Error;

use quorum_chain::AuditEntry;

#[derive(Error, Debug)]
pub enum InterventionError {
    /// An attempt to bypass human approval or mutate an immutable
    /// artifact. Fatal to the circuit; the partial audit trail, ending
    /// in a `policy_violation` entry, is preserved for the host.
    #[error("policy violation: {message}")]
    PolicyViolation {
        message: String,
        trail: Vec<AuditEntry>,
    },

    #[error("approval channel {0} failed: {1}")]
    Channel(String, String),

    #[error("invalid rollback request: {0}")]
    Rollback(String),

    #[error(transparent)]
    Artifact(#[from] quorum_types::CircuitError),

    #[error(transparent)]
    Chain(#[from] quorum_chain::ChainError),
}
