//! Analysis settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which real coverage tool to try before estimating.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageToolKind {
    /// Use the backend registered for the detected language, if any.
    #[default]
    Auto,
    /// Always estimate.
    None,
}

impl CoverageToolKind {
    /// Parse `auto` or `none`, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "none" | "off" => Some(Self::None),
            _ => None,
        }
    }
}

/// Overall-coverage grade boundaries, in percent.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageThresholds {
    /// Lowest `excellent` value.
    pub excellent: f64,
    /// Lowest `good` value.
    pub good: f64,
    /// Lowest `fair` value.
    pub fair: f64,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 75.0,
            fair: 50.0,
        }
    }
}

/// Settings shared by every stage of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Coverage backend selection.
    pub coverage_tool: CoverageToolKind,
    /// Wall-clock cap on the coverage test run.
    pub coverage_timeout_secs: u64,
    /// Files larger than this are treated as unreadable.
    pub max_file_bytes: u64,
    /// Run the regex issue scanner.
    pub scan_issues: bool,
    /// Functions longer than this are reported.
    pub long_function_lines: usize,
    /// Grade boundaries.
    pub coverage_thresholds: CoverageThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            coverage_tool: CoverageToolKind::Auto,
            coverage_timeout_secs: 60,
            max_file_bytes: 2 * 1024 * 1024,
            scan_issues: true,
            long_function_lines: 50,
            coverage_thresholds: CoverageThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Timeout for the version probe of a coverage tool.
    pub fn probe_timeout_secs(&self) -> u64 {
        self.coverage_timeout_secs.min(10)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisConfig, CoverageToolKind};

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("codepulse.json");
        std::fs::write(
            &path,
            r#"{"coverage_tool": "none", "coverage_thresholds": {"fair": 40}, "extra": 1}"#,
        )
        .expect("write config");

        let config = AnalysisConfig::from_json_file(&path).expect("load config");
        assert_eq!(config.coverage_tool, CoverageToolKind::None);
        assert_eq!(config.coverage_thresholds.fair, 40.0);
        assert_eq!(config.coverage_thresholds.good, 75.0);
        assert_eq!(config.coverage_timeout_secs, 60);
        assert!(config.scan_issues);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").expect("write config");

        assert!(matches!(
            AnalysisConfig::from_json_file(&path),
            Err(crate::CodePulseError::Json(_))
        ));
    }

    #[test]
    fn probe_timeout_is_capped() {
        let mut config = AnalysisConfig::default();
        assert_eq!(config.probe_timeout_secs(), 10);
        config.coverage_timeout_secs = 3;
        assert_eq!(config.probe_timeout_secs(), 3);
    }

    #[test]
    fn tool_kind_parses_aliases() {
        assert_eq!(CoverageToolKind::parse("AUTO"), Some(CoverageToolKind::Auto));
        assert_eq!(CoverageToolKind::parse("off"), Some(CoverageToolKind::None));
        assert_eq!(CoverageToolKind::parse("jacoco"), None);
    }
}
