//! Self-monitoring: the circuit governing itself.
//!
//! The same Detection → Simulation → Deliberation → Intervention pipeline
//! that gates an external agent's actions is pointed at the circuit's own
//! source tree. Changing the monitor's configuration is itself a proposed
//! action: it only takes effect after a full circuit run approves it.

#![deny(unsafe_code)]

pub mod monitor;
pub mod repo;

pub use monitor::{ConfigChangeOutcome, SelfMonitor, SelfMonitorConfig};
pub use repo::{RepoMetricConfig, RepoMetricSource};
