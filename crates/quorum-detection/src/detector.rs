//! Threshold evaluation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use quorum_types::{MetricKind, Severity, ThresholdEvent};

use crate::config::DetectorConfig;
use crate::error::DetectionError;
use crate::growth::{growth_rate, GrowthObservation};
use crate::source::{MetricSample, MetricSource};

/// A configured limit for one metric name.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdSpec {
    pub metric: MetricKind,
    pub limit: f64,
    pub enabled: bool,
    pub description: String,
}

/// Result of one scan: the emitted events plus the observation the host
/// should carry into the next scan for momentum.
#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub events: Vec<ThresholdEvent>,
    pub observation: Option<GrowthObservation>,
}

/// Evaluates metric samples against configured limits and emits events
/// for anything at or above the Info band.
#[derive(Debug, Default)]
pub struct ThresholdDetector {
    thresholds: BTreeMap<String, ThresholdSpec>,
    custom_names: BTreeSet<String>,
}

impl ThresholdDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host-defined metric name so configuration and samples
    /// referring to it are accepted.
    pub fn register_custom_metric(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(metric = %name, "custom metric registered");
        self.custom_names.insert(name);
    }

    /// Add or replace a built-in metric threshold.
    pub fn add_threshold(&mut self, metric: MetricKind, limit: f64) -> Result<(), DetectionError> {
        if metric == MetricKind::Custom {
            return Err(DetectionError::Config(
                "custom thresholds need a name; use add_custom_threshold".into(),
            ));
        }
        self.insert_spec(metric.name().to_string(), metric, limit, String::new())
    }

    /// Add a threshold for a registered custom metric name.
    pub fn add_custom_threshold(
        &mut self,
        name: impl Into<String>,
        limit: f64,
    ) -> Result<(), DetectionError> {
        let name = name.into();
        if !self.custom_names.contains(&name) {
            return Err(DetectionError::UnknownMetric(name));
        }
        self.insert_spec(name, MetricKind::Custom, limit, String::new())
    }

    fn insert_spec(
        &mut self,
        name: String,
        metric: MetricKind,
        limit: f64,
        description: String,
    ) -> Result<(), DetectionError> {
        if limit <= 0.0 {
            return Err(DetectionError::Config(format!(
                "metric {name} has non-positive threshold {limit}"
            )));
        }
        self.thresholds.insert(
            name,
            ThresholdSpec {
                metric,
                limit,
                enabled: true,
                description,
            },
        );
        Ok(())
    }

    /// Apply a parsed configuration. Unknown metric names fail loading.
    pub fn apply_config(&mut self, config: &DetectorConfig) -> Result<(), DetectionError> {
        for entry in &config.metrics {
            let metric = match MetricKind::parse(&entry.name) {
                Some(kind) => kind,
                None if self.custom_names.contains(&entry.name) => MetricKind::Custom,
                None => return Err(DetectionError::UnknownMetric(entry.name.clone())),
            };
            self.insert_spec(
                entry.name.clone(),
                metric,
                entry.threshold,
                entry.description.clone(),
            )?;
            if !entry.enabled {
                if let Some(spec) = self.thresholds.get_mut(&entry.name) {
                    spec.enabled = false;
                }
            }
        }
        info!(thresholds = self.thresholds.len(), "detector configured");
        Ok(())
    }

    pub fn thresholds(&self) -> &BTreeMap<String, ThresholdSpec> {
        &self.thresholds
    }

    /// Band one batch of samples against the configured limits.
    pub fn evaluate(
        &self,
        samples: &[MetricSample],
        target: &str,
    ) -> Result<Vec<ThresholdEvent>, DetectionError> {
        let mut events = Vec::new();
        for sample in samples {
            let Some(spec) = self.thresholds.get(&sample.name) else {
                continue;
            };
            if !spec.enabled {
                continue;
            }
            let Some(severity) = Severity::from_ratio(sample.value, spec.limit) else {
                continue;
            };

            let event = ThresholdEvent::new(
                sample.metric,
                sample.value,
                spec.limit,
                severity,
                target,
                sample.details.clone(),
            )?;
            info!(
                metric = %sample.name,
                value = sample.value,
                limit = spec.limit,
                severity = ?severity,
                "threshold event"
            );
            events.push(event);
        }
        Ok(events)
    }

    /// Collect from a source, fold in growth momentum from the prior
    /// observation, and evaluate everything.
    pub fn scan(
        &self,
        source: &dyn MetricSource,
        target: &str,
        previous: Option<&GrowthObservation>,
    ) -> Result<ScanOutcome, DetectionError> {
        let mut samples = source.collect(target)?;

        let observation = samples
            .iter()
            .find(|s| s.metric == MetricKind::FileCount)
            .map(|s| GrowthObservation::now(s.value as u64));

        if let Some(current) = &observation {
            let rate = growth_rate(current, previous);
            let previous_count = previous.map(|p| p.file_count).unwrap_or(0);
            samples.push(
                MetricSample::new(MetricKind::GrowthRate, rate)
                    .with_detail("current_count", serde_json::json!(current.file_count))
                    .with_detail("previous_count", serde_json::json!(previous_count))
                    .with_detail("files_per_second", serde_json::json!(rate)),
            );
        }

        let events = self.evaluate(&samples, target)?;
        Ok(ScanOutcome {
            events,
            observation,
        })
    }
}
