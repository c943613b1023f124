//! Growth-rate momentum.
//!
//! Momentum is `d(files)/dt` between two observations. The prior
//! observation is host-managed and passed in explicitly; the detector
//! keeps no state file of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::timestamp_now;

/// A point-in-time file-count observation for a target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthObservation {
    pub file_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl GrowthObservation {
    pub fn now(file_count: u64) -> Self {
        Self {
            file_count,
            timestamp: timestamp_now(),
        }
    }
}

/// Files per second between `previous` and `current`.
///
/// Returns 0 without a prior observation, for non-positive elapsed time,
/// and for shrinkage (deletions are not momentum).
pub fn growth_rate(current: &GrowthObservation, previous: Option<&GrowthObservation>) -> f64 {
    let Some(prev) = previous else {
        return 0.0;
    };
    let elapsed = (current.timestamp - prev.timestamp).num_microseconds();
    let Some(micros) = elapsed else {
        return 0.0;
    };
    if micros <= 0 {
        return 0.0;
    }
    if current.file_count <= prev.file_count {
        return 0.0;
    }
    let delta = (current.file_count - prev.file_count) as f64;
    delta / (micros as f64 / 1_000_000.0)
}
