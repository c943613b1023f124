//! Monte-Carlo outcome prediction.
//!
//! The simulator models "what-if" scenarios over a graph representation
//! of the observed state. Reproducibility comes first: a single seed
//! determines every random draw, each run derives its own sub-generator
//! from `(seed, run)`, and all collections iterate in a fixed order, so
//! identical inputs produce byte-identical predictions.

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod graph;
pub mod scenario;

pub use engine::{SimulationConfig, Simulator};
pub use error::SimulationError;
pub use graph::StateGraph;
