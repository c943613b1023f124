use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown metric name: {0}")]
    UnknownMetric(String),

    #[error("metric source failed: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Artifact(#[from] quorum_types::CircuitError),
}
