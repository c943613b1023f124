use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliberationError {
    #[error("template error: {0}")]
    Template(String),

    #[error("vote provider {0} failed: {1}")]
    Provider(String, String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Artifact(#[from] quorum_types::CircuitError),
}
