//! Domain entities for CodePulse.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A mapping of language names to their percentage of total lines.
pub type LanguageDistribution = BTreeMap<String, f64>;

/// Kind of test a file most likely contains.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// Isolated tests of a single unit.
    Unit,
    /// Tests exercising several components or real services together.
    Integration,
    /// Browser or full-system journeys.
    E2e,
    /// Load, timing and resource tests.
    Performance,
    /// The file could not be read.
    Unknown,
}

impl TestType {
    /// Every test type, in reporting order.
    pub const ALL: [TestType; 5] = [
        TestType::Unit,
        TestType::Integration,
        TestType::E2e,
        TestType::Performance,
        TestType::Unknown,
    ];

    /// Lower-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Integration => "integration",
            Self::E2e => "e2e",
            Self::Performance => "performance",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observed behavioural trait of a test file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCharacteristic {
    /// Mocks, patches or stubs collaborators.
    UsesMocking,
    /// Talks to an HTTP API.
    ApiInteraction,
    /// Touches a database or ORM session.
    DatabaseInteraction,
    /// Contains async tests.
    AsyncTesting,
    /// Uses table-driven or parameterised cases.
    ParameterizedTests,
    /// Declares fixtures or setup hooks.
    UsesFixtures,
    /// Reads or writes files.
    FileIo,
    /// Sleeps or measures wall-clock time.
    TimingSensitive,
}

impl TestCharacteristic {
    /// Snake-case tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UsesMocking => "uses_mocking",
            Self::ApiInteraction => "api_interaction",
            Self::DatabaseInteraction => "database_interaction",
            Self::AsyncTesting => "async_testing",
            Self::ParameterizedTests => "parameterized_tests",
            Self::UsesFixtures => "uses_fixtures",
            Self::FileIo => "file_io",
            Self::TimingSensitive => "timing_sensitive",
        }
    }
}

/// One discovered and classified test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFileRecord {
    /// Root-relative path with forward slashes.
    pub relative_path: String,
    /// Absolute path used for content reads.
    pub absolute_path: PathBuf,
    /// Inferred test type.
    pub test_type: TestType,
    /// Behavioural tags observed in the content.
    pub characteristics: BTreeSet<TestCharacteristic>,
    /// Frameworks referenced by the content.
    pub frameworks: BTreeSet<String>,
    /// File size in bytes, when it could be read.
    pub size: Option<u64>,
}

/// Test-type distribution measured against the target pyramid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDistribution {
    /// Number of classified files.
    pub total: usize,
    /// Percentage of files per type.
    pub percentages: BTreeMap<TestType, f64>,
    /// Closeness to the 70/20/10 pyramid, 0-100.
    pub balance_score: f64,
    /// Human-readable rebalancing advice.
    pub recommendations: Vec<String>,
}

/// Aggregate view of a repository's test suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStructure {
    /// Number of test files.
    pub total_test_files: usize,
    /// Directories that contain test files.
    pub test_directories: BTreeSet<String>,
    /// File count per type.
    pub test_types: BTreeMap<TestType, usize>,
    /// Relative paths per type.
    pub test_files_by_type: BTreeMap<TestType, Vec<String>>,
    /// Full records per type.
    pub test_type_details: BTreeMap<TestType, Vec<TestFileRecord>>,
    /// Frameworks detected across all files.
    pub test_frameworks: BTreeSet<String>,
    /// Sizes of the files whose metadata could be read.
    pub test_file_sizes: Vec<u64>,
    /// Mean of `test_file_sizes`, 0 when empty.
    pub average_test_size: f64,
    /// Distribution statistics.
    pub test_distribution: TestDistribution,
}

/// Coverage percentages, either measured or estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    /// Overall coverage, 0-100.
    pub overall: f64,
    /// Line coverage, when known.
    pub line_coverage: Option<f64>,
    /// Branch coverage, when known.
    pub branch_coverage: Option<f64>,
    /// Function coverage, when known.
    pub function_coverage: Option<f64>,
    /// True when no real coverage tool produced the numbers.
    pub estimated: bool,
    /// Name of the tool, `analysis` when estimated.
    pub tool_used: String,
}

impl CoverageMetrics {
    /// Zeroed estimate used for degraded results.
    pub fn zeroed() -> Self {
        Self {
            overall: 0.0,
            line_coverage: Some(0.0),
            branch_coverage: Some(0.0),
            function_coverage: Some(0.0),
            estimated: true,
            tool_used: "analysis".to_string(),
        }
    }
}

/// Priority of an uncovered source file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Entry points and core modules.
    High,
    /// Everything else.
    Medium,
}

impl Priority {
    /// Lower-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

/// A source file that appears to have no matching test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncoveredArea {
    /// Always `missing_test_file`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Root-relative source path.
    pub file: String,
    /// Human-readable summary.
    pub description: String,
    /// How urgently a test is needed.
    pub priority: Priority,
}

/// Severity-like tag of a recommendation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    /// Must be addressed.
    Critical,
    /// Should be addressed.
    Warning,
    /// Worth knowing.
    Info,
    /// Optional improvement.
    Suggestion,
}

impl RecommendationKind {
    /// Lower-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Suggestion => "suggestion",
        }
    }
}

/// An actionable testing recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Severity-like tag.
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    /// Short title.
    pub title: String,
    /// What was observed.
    pub description: String,
    /// What to do about it.
    pub action: String,
}

/// Activity counters reported by the repository host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoStats {
    /// Star count.
    pub stars: u64,
    /// Fork count.
    pub forks: u64,
    /// Open issue count.
    pub open_issues: u64,
    /// ISO-8601 timestamp of the last update.
    pub updated_at: Option<String>,
}

/// Metadata supplied by the repository provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoMetadata {
    /// Short repository name.
    pub name: String,
    /// Owner-qualified name.
    pub full_name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Web URL.
    pub url: Option<String>,
    /// Bytes per language as reported by the host.
    pub languages: BTreeMap<String, u64>,
    /// Activity counters.
    pub stats: RepoStats,
    /// SPDX identifier or license name.
    pub license: Option<String>,
}
