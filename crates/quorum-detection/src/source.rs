//! Metric source abstraction.

use std::collections::BTreeMap;

use quorum_types::MetricKind;

use crate::error::DetectionError;

/// One measured value, produced by a [`MetricSource`].
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    pub metric: MetricKind,
    /// Concrete metric name; equals `metric.name()` for built-ins, or
    /// the registered name for `MetricKind::Custom`.
    pub name: String,
    pub value: f64,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl MetricSample {
    pub fn new(metric: MetricKind, value: f64) -> Self {
        Self {
            metric,
            name: metric.name().to_string(),
            value,
            details: BTreeMap::new(),
        }
    }

    /// A host-registered custom metric sample.
    pub fn custom(name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        let mut details = BTreeMap::new();
        details.insert(
            "metric_name".to_string(),
            serde_json::Value::String(name.clone()),
        );
        Self {
            metric: MetricKind::Custom,
            name,
            value,
            details,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Supplies metric samples for a target. The detector never scans
/// anything itself; hosts plug in sources.
pub trait MetricSource {
    fn collect(&self, target: &str) -> Result<Vec<MetricSample>, DetectionError>;
}
