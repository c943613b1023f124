//! Repository metric source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;
use walkdir::WalkDir;

use quorum_detection::{DetectionError, MetricSample, MetricSource};

/// Metric names this source produces, registered as custom metrics.
pub const REPO_METRICS: [&str; 6] = [
    "lines_per_module",
    "untested_ratio",
    "doc_drift",
    "dependency_additions",
    "self_modification",
    "gate_bypass",
];

/// Source patterns suggesting the tree modifies itself.
const SELF_MOD_PATTERNS: &[&str] = &["current_exe", "self_update", "auto_apply"];

/// Version-control log markers for gate-bypass attempts.
const BYPASS_MARKERS: &[&str] = &["--no-verify", "skip-gate", "bypass-gate", "force-push"];

/// Configuration for the repository scan.
#[derive(Clone, Debug)]
pub struct RepoMetricConfig {
    /// How much newer a source file may be than its doc counterpart
    /// before it counts as drifted.
    pub doc_drift_threshold: Duration,
    /// Dependency-line count recorded when the baseline was set;
    /// anything above it counts as an addition.
    pub dependency_baseline: usize,
    /// Host-supplied version-control log text to scan for bypass
    /// markers (the monitor does not shell out to a VCS itself).
    pub vcs_log: Option<String>,
}

impl Default for RepoMetricConfig {
    fn default() -> Self {
        Self {
            doc_drift_threshold: Duration::from_secs(7 * 24 * 3600),
            dependency_baseline: 0,
            vcs_log: None,
        }
    }
}

/// Measures the health metrics of a Rust source tree.
#[derive(Clone, Debug, Default)]
pub struct RepoMetricSource {
    config: RepoMetricConfig,
}

impl RepoMetricSource {
    pub fn new(config: RepoMetricConfig) -> Self {
        Self { config }
    }
}

impl MetricSource for RepoMetricSource {
    fn collect(&self, target: &str) -> Result<Vec<MetricSample>, DetectionError> {
        let root = Path::new(target);
        if !root.is_dir() {
            return Err(DetectionError::Source(format!(
                "repository root is not a directory: {target}"
            )));
        }

        let mut modules: Vec<(PathBuf, String, SystemTime)> = Vec::new();
        let mut docs: BTreeMap<String, SystemTime> = BTreeMap::new();
        let mut dependency_lines = 0usize;

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|err| DetectionError::Source(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            match path.extension().and_then(|e| e.to_str()) {
                Some("rs") => {
                    let content = std::fs::read_to_string(path)?;
                    modules.push((path.to_path_buf(), content, mtime));
                }
                Some("md") => {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        docs.insert(stem.to_string(), mtime);
                    }
                }
                Some("toml") if path.file_name().is_some_and(|n| n == "Cargo.toml") => {
                    let content = std::fs::read_to_string(path)?;
                    dependency_lines += count_dependency_lines(&content);
                }
                _ => {}
            }
        }

        let max_lines = modules
            .iter()
            .map(|(_, content, _)| content.lines().count())
            .max()
            .unwrap_or(0);

        let with_fns = modules
            .iter()
            .filter(|(_, content, _)| content.contains("fn "))
            .count();
        let untested = modules
            .iter()
            .filter(|(_, content, _)| {
                content.contains("fn ")
                    && !content.contains("#[cfg(test)]")
                    && !content.contains("#[test]")
            })
            .count();
        let untested_ratio = if with_fns > 0 {
            untested as f64 / with_fns as f64
        } else {
            0.0
        };

        let drifted = modules
            .iter()
            .filter(|(path, _, mtime)| {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    return false;
                };
                let Some(doc_mtime) = docs.get(stem) else {
                    return false;
                };
                mtime
                    .duration_since(*doc_mtime)
                    .map(|lag| lag > self.config.doc_drift_threshold)
                    .unwrap_or(false)
            })
            .count();

        let self_modifying = modules
            .iter()
            .filter(|(_, content, _)| SELF_MOD_PATTERNS.iter().any(|p| content.contains(p)))
            .count();

        let additions = dependency_lines.saturating_sub(self.config.dependency_baseline);

        let bypass_attempts = self
            .config
            .vcs_log
            .as_deref()
            .map(|log| {
                BYPASS_MARKERS
                    .iter()
                    .map(|marker| log.matches(marker).count())
                    .sum::<usize>()
            })
            .unwrap_or(0);

        debug!(
            target,
            modules = modules.len(),
            max_lines,
            untested_ratio,
            drifted,
            "repository metrics collected"
        );

        Ok(vec![
            MetricSample::custom("lines_per_module", max_lines as f64)
                .with_detail("modules", serde_json::json!(modules.len())),
            MetricSample::custom("untested_ratio", untested_ratio)
                .with_detail("untested", serde_json::json!(untested))
                .with_detail("with_functions", serde_json::json!(with_fns)),
            MetricSample::custom("doc_drift", drifted as f64),
            MetricSample::custom("dependency_additions", additions as f64)
                .with_detail("dependency_lines", serde_json::json!(dependency_lines)),
            MetricSample::custom("self_modification", self_modifying as f64),
            MetricSample::custom("gate_bypass", bypass_attempts as f64),
        ])
    }
}

/// Count entries under `[dependencies]`-style sections.
fn count_dependency_lines(manifest: &str) -> usize {
    let mut in_deps = false;
    let mut count = 0;
    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_deps = line.contains("dependencies");
            continue;
        }
        if in_deps && !line.is_empty() && !line.starts_with('#') {
            count += 1;
        }
    }
    count
}
