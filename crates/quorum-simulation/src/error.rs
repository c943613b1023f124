use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// More than half of the Monte-Carlo runs failed, or the stage
    /// exceeded its deadline; no prediction is emitted.
    #[error("simulation unstable: {0}")]
    Instability(String),

    #[error(transparent)]
    Artifact(#[from] quorum_types::CircuitError),

    #[error(transparent)]
    Chain(#[from] quorum_chain::ChainError),
}
