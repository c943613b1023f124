//! The governance circuit.
//!
//! One [`Circuit`] invocation runs a proposed action through Detection →
//! Simulation → Deliberation → Intervention, wiring each stage's artifact
//! into the next by hash reference and publishing every hand-off on the
//! event bus. The circuit is single-threaded and cooperative within one
//! invocation; the host may run several circuits in parallel as long as
//! they share only the bus.

#![deny(unsafe_code)]

pub mod circuit;
pub mod config;

pub use circuit::Circuit;
pub use config::CircuitConfig;
