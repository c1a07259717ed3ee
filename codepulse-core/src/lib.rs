#![deny(missing_docs)]
//! CodePulse core library.
//!
//! Locates and classifies test files, estimates or measures coverage, scans
//! for common issues and aggregates everything into a health report.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod coverage;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod fs;
pub mod functions;
pub mod insight;
pub mod issues;
pub mod language;
pub mod locator;
pub mod profile;
pub mod recommend;
pub mod report;
pub mod scoring;
pub mod signals;

pub use analysis::{CoverageAnalysis, analyze_coverage, analyze_coverage_with, analyze_repository};
pub use classifier::{
    ContentScores, classify, classify_by_content, classify_by_path, classify_loaded,
};
pub use config::{AnalysisConfig, CoverageThresholds, CoverageToolKind};
pub use coverage::{
    CoverageGrade, CoverageTool, NoCoverageTool, PythonCoverageTool, coverage_tool_for,
    estimate_coverage,
};
pub use distribution::analyze_distribution;
pub use domain::{
    CoverageMetrics, LanguageDistribution, Priority, Recommendation, RecommendationKind,
    RepoMetadata, RepoStats, TestCharacteristic, TestDistribution, TestFileRecord, TestStructure,
    TestType, UncoveredArea,
};
pub use error::{CodePulseError, Result};
pub use fs::{FileSystem, RepositorySnapshot, StdFileSystem};
pub use insight::{Insights, build_insight_prompt, parse_insight_response};
pub use issues::{
    ActionItem, Finding, IssueCategory, IssueReport, IssueScanner, SecurityScanner, Severity,
    merge_security_findings,
};
pub use language::{TokeiInspector, detect_primary_language};
pub use locator::{find_source_files, find_test_files, identify_uncovered_areas};
pub use profile::{Language, LanguageProfile};
pub use recommend::generate_recommendations;
pub use report::{AnalysisStatus, HealthReport, format_language_stats, render_json, render_markdown};
pub use scoring::{Scores, health_label};
pub use signals::{analyze_characteristics, detect_frameworks};
