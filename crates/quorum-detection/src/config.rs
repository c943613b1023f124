//! Threshold configuration.

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;

/// One configured metric limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    pub threshold: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

fn default_enabled() -> bool {
    true
}

/// Detector configuration, loaded from YAML:
///
/// ```yaml
/// metrics:
///   - name: file_count
///     threshold: 100
///     enabled: true
///   - name: filename_entropy
///     threshold: 0.85
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub metrics: Vec<MetricConfig>,
}

impl DetectorConfig {
    pub fn from_yaml(input: &str) -> Result<Self, DetectionError> {
        let config: Self = serde_yaml::from_str(input)?;
        for metric in &config.metrics {
            if metric.threshold <= 0.0 {
                return Err(DetectionError::Config(format!(
                    "metric {} has non-positive threshold {}",
                    metric.name, metric.threshold
                )));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_grammar() {
        let config = DetectorConfig::from_yaml(
            "metrics:\n  - name: file_count\n    threshold: 100\n    enabled: true\n  - name: filename_entropy\n    threshold: 0.85\n",
        )
        .unwrap();
        assert_eq!(config.metrics.len(), 2);
        assert!(config.metrics[1].enabled);
        assert_eq!(config.metrics[1].threshold, 0.85);
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let err = DetectorConfig::from_yaml("metrics:\n  - name: file_count\n    threshold: 0\n")
            .unwrap_err();
        assert!(matches!(err, DetectionError::Config(_)));
    }
}
