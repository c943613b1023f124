//! Filesystem metric source.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use quorum_types::MetricKind;

use crate::error::DetectionError;
use crate::source::{MetricSample, MetricSource};

/// Content patterns suggesting a file participates in modifying its own
/// tree.
const SELF_REFERENCE_PATTERNS: &[&str] = &[
    "self.modify",
    "self.reorganize",
    "self.update",
    "current_dir",
    "current_exe",
];

/// Filename fragments suggesting automated-response machinery.
const REFLEX_INDICATORS: &[&str] = &[
    "reflex", "trigger", "auto_", "_hook", "on_change", "watch", "observer",
];

/// Largest file size read when scanning for self-reference patterns.
const MAX_CONTENT_SCAN_BYTES: u64 = 1 << 20;

/// Measures a directory tree: file count, maximum directory depth,
/// normalized filename entropy, self-referencing files, and
/// reflex-pattern files.
#[derive(Debug, Clone)]
pub struct FilesystemMetricSource {
    recursive: bool,
}

impl Default for FilesystemMetricSource {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl FilesystemMetricSource {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    fn walker(&self, root: &Path) -> WalkDir {
        let walker = WalkDir::new(root);
        if self.recursive {
            walker
        } else {
            walker.max_depth(1)
        }
    }
}

impl MetricSource for FilesystemMetricSource {
    fn collect(&self, target: &str) -> Result<Vec<MetricSample>, DetectionError> {
        let root = Path::new(target);
        if !root.is_dir() {
            return Err(DetectionError::Source(format!(
                "target is not a directory: {target}"
            )));
        }

        let mut file_names: Vec<String> = Vec::new();
        let mut max_depth = 0usize;
        let mut self_refs: Vec<String> = Vec::new();
        let mut reflex_files: Vec<String> = Vec::new();

        for entry in self.walker(root) {
            let entry = entry.map_err(|err| DetectionError::Source(err.to_string()))?;
            let depth = entry.depth();
            if entry.file_type().is_dir() {
                max_depth = max_depth.max(depth);
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            let lower = name.to_lowercase();
            if REFLEX_INDICATORS.iter().any(|ind| lower.contains(ind)) {
                reflex_files.push(relative.clone());
            }

            if entry
                .metadata()
                .map(|m| m.len() <= MAX_CONTENT_SCAN_BYTES)
                .unwrap_or(false)
            {
                if let Ok(content) = std::fs::read_to_string(entry.path()) {
                    if SELF_REFERENCE_PATTERNS.iter().any(|p| content.contains(p)) {
                        self_refs.push(relative);
                    }
                }
            }

            file_names.push(name);
        }

        file_names.sort();
        self_refs.sort();
        reflex_files.sort();

        let entropy = filename_entropy(&file_names);
        debug!(
            target,
            files = file_names.len(),
            max_depth,
            entropy,
            "filesystem metrics collected"
        );

        Ok(vec![
            MetricSample::new(MetricKind::FileCount, file_names.len() as f64)
                .with_detail("recursive", serde_json::json!(self.recursive)),
            MetricSample::new(MetricKind::DirectoryDepth, max_depth as f64),
            MetricSample::new(MetricKind::FilenameEntropy, entropy)
                .with_detail("sample_size", serde_json::json!(file_names.len())),
            MetricSample::new(MetricKind::SelfReference, self_refs.len() as f64)
                .with_detail("files", sample_list(&self_refs)),
            MetricSample::new(MetricKind::ReflexPattern, reflex_files.len() as f64)
                .with_detail("files", sample_list(&reflex_files)),
        ])
    }
}

/// Detail lists are capped so events stay small.
fn sample_list(files: &[String]) -> serde_json::Value {
    serde_json::json!(files.iter().take(10).collect::<Vec<_>>())
}

/// Normalized Shannon entropy of the character distribution across all
/// filenames. High entropy suggests generated naming; low entropy
/// suggests human-organized structure. Normalized by `log2(distinct
/// characters)`, so a single repeated character yields 0.
pub fn filename_entropy(names: &[String]) -> f64 {
    let mut freq: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for name in names {
        for c in name.chars() {
            *freq.entry(c).or_insert(0) += 1;
            total += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }

    let mut entropy = 0.0;
    for count in freq.values() {
        let p = *count as f64 / total as f64;
        entropy -= p * p.log2();
    }

    let max_entropy = if freq.len() > 1 {
        (freq.len() as f64).log2()
    } else {
        1.0
    };
    if max_entropy > 0.0 {
        entropy / max_entropy
    } else {
        0.0
    }
}
