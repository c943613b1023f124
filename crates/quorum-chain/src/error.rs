use thiserror::Error;

/// Errors from canonicalization, hashing, or chain maintenance.
///
/// Canonicalization failure is fatal to the enclosing operation; a chain
/// is never left partially extended.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("canonicalization failed: {0}")]
    Canonicalize(#[from] serde_json::Error),

    #[error("integrity violation at entry {index}: {reason}")]
    Integrity { index: usize, reason: String },

    #[error("chain import failed at line {line}: {reason}")]
    Import { line: usize, reason: String },
}
