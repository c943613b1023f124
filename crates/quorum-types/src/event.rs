//! Threshold events emitted by detection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorum_chain::{artifact_hash, timestamp_now};

use crate::error::CircuitError;

/// Hex prefix length of artifact hashes (events, predictions, decisions).
pub const ARTIFACT_HASH_LEN: usize = 16;

/// Metrics the detector evaluates against configured limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    FileCount,
    DirectoryDepth,
    FilenameEntropy,
    SelfReference,
    GrowthRate,
    ReflexPattern,
    /// Host-registered metric; the concrete name travels in event details.
    Custom,
}

impl MetricKind {
    /// Parse a configured metric name. Unknown names are rejected so a
    /// typo in configuration fails loading instead of silently never
    /// firing.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "file_count" => Some(Self::FileCount),
            "directory_depth" => Some(Self::DirectoryDepth),
            "filename_entropy" => Some(Self::FilenameEntropy),
            "self_reference" => Some(Self::SelfReference),
            "growth_rate" => Some(Self::GrowthRate),
            "reflex_pattern" => Some(Self::ReflexPattern),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FileCount => "file_count",
            Self::DirectoryDepth => "directory_depth",
            Self::FilenameEntropy => "filename_entropy",
            Self::SelfReference => "self_reference",
            Self::GrowthRate => "growth_rate",
            Self::ReflexPattern => "reflex_pattern",
            Self::Custom => "custom",
        }
    }
}

/// Severity bands relative to the configured limit.
///
/// With ratio `r = value / threshold`: Info in `[0.64, 0.80)`, Warning in
/// `[0.80, 1.00)`, Critical in `[1.00, 1.50)`, Emergency at `>= 1.50`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl Severity {
    pub const INFO_RATIO: f64 = 0.64;
    pub const WARNING_RATIO: f64 = 0.80;
    pub const CRITICAL_RATIO: f64 = 1.00;
    pub const EMERGENCY_RATIO: f64 = 1.50;

    /// Band a measured value against its limit. `None` below the Info
    /// band (no event is emitted). A non-positive threshold never bands.
    pub fn from_ratio(value: f64, threshold: f64) -> Option<Self> {
        if threshold <= 0.0 {
            return None;
        }
        let ratio = value / threshold;
        if ratio >= Self::EMERGENCY_RATIO {
            Some(Self::Emergency)
        } else if ratio >= Self::CRITICAL_RATIO {
            Some(Self::Critical)
        } else if ratio >= Self::WARNING_RATIO {
            Some(Self::Warning)
        } else if ratio >= Self::INFO_RATIO {
            Some(Self::Info)
        } else {
            None
        }
    }
}

/// A detected threshold crossing, the primary output of detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEvent {
    pub metric: MetricKind,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Opaque identifier for the observed subject.
    pub target: String,
    pub details: BTreeMap<String, serde_json::Value>,
    /// 16-hex prefix of SHA-256 over the canonical form of all other fields.
    pub event_hash: String,
}

impl ThresholdEvent {
    pub fn new(
        metric: MetricKind,
        value: f64,
        threshold: f64,
        severity: Severity,
        target: impl Into<String>,
        details: BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, CircuitError> {
        let mut event = Self {
            metric,
            value,
            threshold,
            severity,
            timestamp: timestamp_now(),
            target: target.into(),
            details,
            event_hash: String::new(),
        };
        event.event_hash = artifact_hash(&event, &["event_hash"], ARTIFACT_HASH_LEN)?;
        Ok(event)
    }

    /// Recompute the hash from the event's other fields.
    pub fn recompute_hash(&self) -> Result<String, CircuitError> {
        Ok(artifact_hash(self, &["event_hash"], ARTIFACT_HASH_LEN)?)
    }

    pub fn verify_hash(&self) -> Result<bool, CircuitError> {
        Ok(self.recompute_hash()? == self.event_hash)
    }
}
