//! The locate, classify and aggregate pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::classify_loaded;
use crate::config::AnalysisConfig;
use crate::coverage::{CoverageTool, calculate_coverage_metrics, coverage_tool_for};
use crate::distribution::analyze_distribution;
use crate::domain::{
    CoverageMetrics, Recommendation, RepoMetadata, TestFileRecord, TestStructure, TestType,
    UncoveredArea,
};
use crate::error::Result;
use crate::fs::{FileSystem, RepositorySnapshot};
use crate::issues::{IssueReport, IssueScanner};
use crate::language::{TokeiInspector, detect_primary_language};
use crate::locator::{find_source_files, find_test_files, identify_uncovered_areas};
use crate::profile::Language;
use crate::recommend::generate_recommendations;
use crate::report::{AnalysisStatus, HealthReport};
use crate::scoring::Scores;
use crate::signals::{analyze_characteristics, detect_frameworks};

/// Outcome of one coverage analysis. `error` is set instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAnalysis {
    /// Dominant language of the checkout.
    pub primary_language: Language,
    /// Number of discovered test files.
    pub test_files_count: usize,
    /// Root-relative test paths.
    pub test_files: Vec<String>,
    /// Aggregated suite shape.
    pub test_structure: TestStructure,
    /// Measured or estimated coverage.
    pub coverage_metrics: CoverageMetrics,
    /// Source files without a matching test.
    pub uncovered_areas: Vec<UncoveredArea>,
    /// Ordered recommendations.
    pub recommendations: Vec<Recommendation>,
    /// Set when the pipeline could not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CoverageAnalysis {
    /// Zeroed result carrying an error message.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            primary_language: Language::Unknown,
            test_files_count: 0,
            test_files: Vec::new(),
            test_structure: summarize_test_files(Vec::new()),
            coverage_metrics: CoverageMetrics::zeroed(),
            uncovered_areas: Vec::new(),
            recommendations: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Languages, coverage, issues and scores for one checkout.
///
/// `now` anchors the maintenance checks against `metadata`. Insights and
/// external security findings are left for the caller to fill in.
pub fn analyze_repository(
    fs: &dyn FileSystem,
    root: &Path,
    source: impl Into<String>,
    metadata: Option<&RepoMetadata>,
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> HealthReport {
    let source = source.into();
    let snapshot = RepositorySnapshot::capture(fs, root);
    if snapshot.walk().is_empty() {
        warn!("{} is missing or unreadable", root.display());
        return HealthReport::failed(
            source,
            root.to_path_buf(),
            format!("{} is missing or unreadable", root.display()),
        );
    }

    let mut report = HealthReport::new(source, root.to_path_buf());
    report.language_stats = Some(TokeiInspector::new(config.max_file_bytes).inspect(&snapshot));

    let coverage = analyze_coverage(&snapshot, config);
    if let Some(error) = &coverage.error {
        report.errors.push(error.clone());
    }
    report.coverage_grade = Some(coverage.coverage_metrics.grade(&config.coverage_thresholds));

    let issues = if config.scan_issues {
        match IssueScanner::new(config) {
            Ok(scanner) => Some(scanner.scan(&snapshot, metadata, now)),
            Err(err) => {
                warn!("issue scanner unavailable: {err}");
                report.errors.push(format!("Issue scan failed: {err}"));
                None
            }
        }
    } else {
        None
    };

    let unscanned = IssueReport::from_findings(BTreeMap::new());
    report.scores = Some(Scores::compute(
        &coverage.coverage_metrics,
        issues.as_ref().unwrap_or(&unscanned),
    ));
    report.coverage = Some(coverage);
    report.issues = issues;
    report.status = AnalysisStatus::Analyzed;
    info!("{} analysed", report.source);
    report
}

/// Analyse coverage with the backend selected by `config`.
pub fn analyze_coverage(
    snapshot: &RepositorySnapshot<'_>,
    config: &AnalysisConfig,
) -> CoverageAnalysis {
    let language = detect_primary_language(snapshot);
    let tool = coverage_tool_for(language, config);
    analyze_detected(snapshot, config, language, tool.as_ref())
}

/// Analyse coverage with an explicit backend.
pub fn analyze_coverage_with(
    snapshot: &RepositorySnapshot<'_>,
    config: &AnalysisConfig,
    tool: &dyn CoverageTool,
) -> CoverageAnalysis {
    analyze_detected(snapshot, config, detect_primary_language(snapshot), tool)
}

fn analyze_detected(
    snapshot: &RepositorySnapshot<'_>,
    config: &AnalysisConfig,
    primary_language: Language,
    tool: &dyn CoverageTool,
) -> CoverageAnalysis {
    match run_pipeline(snapshot, config, primary_language, tool) {
        Ok(analysis) => analysis,
        Err(err) => {
            warn!(
                "coverage analysis of {} failed: {err}",
                snapshot.root().display()
            );
            CoverageAnalysis::degraded(format!("Coverage analysis failed: {err}"))
        }
    }
}

fn run_pipeline(
    snapshot: &RepositorySnapshot<'_>,
    config: &AnalysisConfig,
    primary_language: Language,
    tool: &dyn CoverageTool,
) -> Result<CoverageAnalysis> {
    let test_files = find_test_files(snapshot, primary_language)?;
    info!(
        "{}: {} {} test files",
        snapshot.root().display(),
        test_files.len(),
        primary_language
    );

    let test_structure = analyze_test_structure(snapshot, &test_files, config.max_file_bytes);
    let source_files = find_source_files(snapshot, primary_language, &test_files);
    let coverage_metrics =
        calculate_coverage_metrics(snapshot.root(), tool, test_files.len(), source_files.len());
    let uncovered_areas = identify_uncovered_areas(&source_files, &test_files);
    let recommendations = generate_recommendations(&test_structure, &coverage_metrics);

    Ok(CoverageAnalysis {
        primary_language,
        test_files_count: test_files.len(),
        test_files,
        test_structure,
        coverage_metrics,
        uncovered_areas,
        recommendations,
        error: None,
    })
}

/// Classify and measure every test file, then summarise the suite.
pub fn analyze_test_structure(
    snapshot: &RepositorySnapshot<'_>,
    test_files: &[String],
    max_file_bytes: u64,
) -> TestStructure {
    let records = test_files
        .iter()
        .map(|relative| inspect_test_file(snapshot, relative, max_file_bytes))
        .collect();
    summarize_test_files(records)
}

/// Build one record, reading the file at most once.
pub fn inspect_test_file(
    snapshot: &RepositorySnapshot<'_>,
    relative: &str,
    max_file_bytes: u64,
) -> TestFileRecord {
    let content = match snapshot.read_bounded(relative, max_file_bytes) {
        Ok(content) => Some(content),
        Err(err) => {
            debug!("cannot read {relative}: {err}");
            None
        }
    };

    let test_type = classify_loaded(relative, content.as_deref());
    debug!("{relative} classified as {test_type}");

    let (frameworks, characteristics) = content
        .as_deref()
        .map(|content| (detect_frameworks(content), analyze_characteristics(content)))
        .unwrap_or_default();

    TestFileRecord {
        relative_path: relative.to_string(),
        absolute_path: snapshot.absolute(relative),
        test_type,
        characteristics,
        frameworks,
        size: snapshot.file_size(relative).ok(),
    }
}

/// Fold records into a [`TestStructure`]. Every type appears in the counts.
pub fn summarize_test_files(records: Vec<TestFileRecord>) -> TestStructure {
    let mut test_types: BTreeMap<TestType, usize> =
        TestType::ALL.iter().map(|test_type| (*test_type, 0)).collect();
    let mut test_files_by_type: BTreeMap<TestType, Vec<String>> = BTreeMap::new();
    let mut test_type_details: BTreeMap<TestType, Vec<TestFileRecord>> = BTreeMap::new();
    let mut test_directories = BTreeSet::new();
    let mut test_frameworks = BTreeSet::new();
    let mut test_file_sizes = Vec::new();

    let total_test_files = records.len();
    for record in records {
        test_directories.insert(parent_dir(&record.relative_path));
        test_frameworks.extend(record.frameworks.iter().cloned());
        if let Some(size) = record.size {
            test_file_sizes.push(size);
        }
        *test_types.entry(record.test_type).or_insert(0) += 1;
        test_files_by_type
            .entry(record.test_type)
            .or_default()
            .push(record.relative_path.clone());
        test_type_details
            .entry(record.test_type)
            .or_default()
            .push(record);
    }

    let average_test_size = if test_file_sizes.is_empty() {
        0.0
    } else {
        test_file_sizes.iter().sum::<u64>() as f64 / test_file_sizes.len() as f64
    };

    TestStructure {
        total_test_files,
        test_directories,
        test_distribution: analyze_distribution(&test_types),
        test_types,
        test_files_by_type,
        test_type_details,
        test_frameworks,
        test_file_sizes,
        average_test_size,
    }
}

fn parent_dir(relative: &str) -> String {
    match Path::new(relative).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => crate::fs::to_forward_slashes(parent),
        _ => ".".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        analyze_coverage_with, analyze_repository, analyze_test_structure, inspect_test_file,
        summarize_test_files,
    };
    use crate::config::{AnalysisConfig, CoverageToolKind};
    use crate::coverage::{CoverageTool, MockCoverageTool, NoCoverageTool};
    use crate::domain::{CoverageMetrics, TestCharacteristic, TestType};
    use crate::error::CodePulseError;
    use crate::fs::{DirListing, MockFileSystem, RepositorySnapshot};
    use crate::profile::Language;
    use std::path::Path;

    fn python_repo() -> MockFileSystem {
        let mut fs = MockFileSystem::new();
        fs.expect_walk().returning(|_| {
            vec![
                DirListing::new("").with_files(["main.py", "utils.py", "README.md"]),
                DirListing::new("src").with_files(["api.py", "models.py"]),
                DirListing::new("testing").with_files(["helper_checks.py"]),
                DirListing::new("tests").with_files(["test_main.py", "__init__.py"]),
                DirListing::new("tests/integration").with_files(["test_api.py"]),
            ]
        });
        fs.expect_file_size().returning(|_| Ok(64));
        fs.expect_read_to_string().returning(|path| {
            if path.ends_with("helper_checks.py") {
                Err(CodePulseError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "denied",
                )))
            } else {
                Ok("import pytest\nfrom unittest.mock import patch\n".to_string())
            }
        });
        fs
    }

    #[test]
    fn pipeline_counts_every_test_file_once() {
        let fs = python_repo();
        let snapshot = RepositorySnapshot::capture(&fs, Path::new("/repo"));
        let analysis =
            analyze_coverage_with(&snapshot, &AnalysisConfig::default(), &NoCoverageTool);

        assert!(analysis.error.is_none());
        assert_eq!(analysis.primary_language, Language::Python);
        assert_eq!(analysis.test_files_count, 3);

        let structure = &analysis.test_structure;
        let counted: usize = structure.test_types.values().sum();
        assert_eq!(counted, structure.total_test_files);
        assert_eq!(structure.test_types[&TestType::Unit], 1);
        assert_eq!(structure.test_types[&TestType::Integration], 1);
        assert_eq!(structure.test_types[&TestType::Unknown], 1);
        assert!(structure.test_frameworks.contains("pytest"));
        assert!(structure.test_directories.contains("tests/integration"));
        assert_eq!(structure.average_test_size, 64.0);

        // 3 tests over 5 sources, the package marker counting as a source.
        assert!(analysis.coverage_metrics.estimated);
        assert_eq!(analysis.coverage_metrics.overall, 64.0);

        let uncovered: Vec<&str> = analysis
            .uncovered_areas
            .iter()
            .map(|area| area.file.as_str())
            .collect();
        assert_eq!(uncovered, vec!["utils.py", "src/models.py", "tests/__init__.py"]);
    }

    #[test]
    fn silent_tool_falls_back_to_estimate() {
        let fs = python_repo();
        let snapshot = RepositorySnapshot::capture(&fs, Path::new("/repo"));
        let mut tool = MockCoverageTool::new();
        tool.expect_run().returning(|_| None);
        tool.expect_name().return_const("mock".to_string());

        let analysis = analyze_coverage_with(&snapshot, &AnalysisConfig::default(), &tool);
        assert!(analysis.coverage_metrics.estimated);
        assert!((0.0..=100.0).contains(&analysis.coverage_metrics.overall));
    }

    struct CrashingTool;

    impl CoverageTool for CrashingTool {
        fn name(&self) -> &str {
            "crashing"
        }

        fn run(&self, _root: &Path) -> Option<CoverageMetrics> {
            panic!("coverage backend crashed")
        }
    }

    #[test]
    fn panicking_tool_falls_back_to_estimate() {
        let fs = python_repo();
        let snapshot = RepositorySnapshot::capture(&fs, Path::new("/repo"));
        let analysis =
            analyze_coverage_with(&snapshot, &AnalysisConfig::default(), &CrashingTool);
        assert!(analysis.error.is_none());
        assert!(analysis.coverage_metrics.estimated);
        assert!((0.0..=100.0).contains(&analysis.coverage_metrics.overall));
        assert_eq!(analysis.coverage_metrics.overall, 64.0);
    }

    #[test]
    fn unreadable_test_file_is_unknown_but_counted() {
        let fs = python_repo();
        let snapshot = RepositorySnapshot::capture(&fs, Path::new("/repo"));
        let record = inspect_test_file(&snapshot, "testing/helper_checks.py", 1024);
        assert_eq!(record.test_type, TestType::Unknown);
        assert!(record.frameworks.is_empty());
        assert!(record.characteristics.is_empty());
    }

    #[test]
    fn empty_repository_reports_no_tests() {
        let mut fs = MockFileSystem::new();
        fs.expect_walk().returning(|_| Vec::new());
        let snapshot = RepositorySnapshot::capture(&fs, Path::new("/missing"));

        let analysis =
            analyze_coverage_with(&snapshot, &AnalysisConfig::default(), &NoCoverageTool);
        assert_eq!(analysis.primary_language, Language::Unknown);
        assert_eq!(analysis.test_structure.test_distribution.total, 0);
        assert_eq!(
            analysis.test_structure.test_distribution.recommendations,
            vec!["No tests found"]
        );
        assert_eq!(analysis.coverage_metrics.overall, 0.0);
    }

    #[test]
    fn records_carry_characteristics() {
        let fs = python_repo();
        let snapshot = RepositorySnapshot::capture(&fs, Path::new("/repo"));
        let structure =
            analyze_test_structure(&snapshot, &["tests/test_main.py".to_string()], 1024);

        let record = &structure.test_type_details[&TestType::Unit][0];
        assert_eq!(record.absolute_path, Path::new("/repo/tests/test_main.py"));
        assert!(record.characteristics.contains(&TestCharacteristic::UsesMocking));
        assert_eq!(record.size, Some(64));
    }

    #[test]
    fn empty_summary_has_zeroed_counts() {
        let structure = summarize_test_files(Vec::new());
        assert_eq!(structure.total_test_files, 0);
        assert_eq!(structure.test_types.len(), TestType::ALL.len());
        assert!(structure.test_types.values().all(|count| *count == 0));
        assert_eq!(structure.average_test_size, 0.0);
    }

    #[test]
    fn degraded_result_carries_error() {
        let analysis = super::CoverageAnalysis::degraded("Coverage analysis failed: boom");
        assert_eq!(analysis.error.as_deref(), Some("Coverage analysis failed: boom"));
        assert_eq!(analysis.primary_language, Language::Unknown);
        assert!(analysis.coverage_metrics.estimated);
        let json = serde_json::to_value(&analysis).expect("serialize");
        assert_eq!(json["coverage_metrics"]["overall"], 0.0);
    }

    #[test]
    fn missing_root_fails_the_report() {
        let mut fs = MockFileSystem::new();
        fs.expect_walk().returning(|_| Vec::new());
        let report = analyze_repository(
            &fs,
            Path::new("/missing"),
            "missing",
            None,
            &AnalysisConfig::default(),
            chrono::Utc::now(),
        );
        assert!(matches!(report.status, crate::report::AnalysisStatus::Failed(_)));
        assert!(report.coverage.is_none());
        assert!(report.scores.is_none());
    }

    #[test]
    fn repository_report_without_issue_scan() {
        let fs = python_repo();
        let config = AnalysisConfig {
            coverage_tool: CoverageToolKind::None,
            scan_issues: false,
            ..AnalysisConfig::default()
        };
        let report = analyze_repository(
            &fs,
            Path::new("/repo"),
            "demo",
            None,
            &config,
            chrono::Utc::now(),
        );

        assert_eq!(report.status, crate::report::AnalysisStatus::Analyzed);
        assert!(report.issues.is_none());
        assert!(report.errors.is_empty());
        let scores = report.scores.expect("scores");
        assert_eq!(scores.coverage_score, 70.4);
        assert_eq!(scores.security_score, 100.0);
        assert_eq!(
            report.coverage_grade,
            Some(crate::coverage::CoverageGrade::Fair)
        );
    }
}
