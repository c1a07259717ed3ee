//! Health report types and rendering.

use std::fmt::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::CoverageAnalysis;
use crate::coverage::CoverageGrade;
use crate::domain::{LanguageDistribution, TestType};
use crate::insight::Insights;
use crate::issues::{IssueCategory, IssueReport, Severity};
use crate::scoring::{Scores, health_label};

/// Status of a repository analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Analysis has not started.
    Pending,
    /// The checkout was analysed.
    Analyzed,
    /// Analysis could not run.
    Failed(String),
}

/// Everything known about one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Repository source (name, URL or path).
    pub source: String,
    /// Local checkout that was analysed.
    pub path: PathBuf,
    /// Analysis status.
    pub status: AnalysisStatus,
    /// Language distribution by line count.
    pub language_stats: Option<LanguageDistribution>,
    /// Test coverage analysis.
    pub coverage: Option<CoverageAnalysis>,
    /// Coverage grade against the configured thresholds.
    pub coverage_grade: Option<CoverageGrade>,
    /// Issue findings.
    pub issues: Option<IssueReport>,
    /// Aggregated scores.
    pub scores: Option<Scores>,
    /// AI insights, or the static fallback.
    pub insights: Option<Insights>,
    /// Errors encountered along the way.
    pub errors: Vec<String>,
}

impl HealthReport {
    /// Create an empty report for a repository.
    pub fn new(source: String, path: PathBuf) -> Self {
        Self {
            source,
            path,
            status: AnalysisStatus::Pending,
            language_stats: None,
            coverage: None,
            coverage_grade: None,
            issues: None,
            scores: None,
            insights: None,
            errors: Vec::new(),
        }
    }

    /// Create a report for a repository that could not be analysed.
    pub fn failed(source: String, path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Failed(error.into()),
            ..Self::new(source, path)
        }
    }
}

/// Render a list of health reports as Markdown.
pub fn render_markdown(reports: &[HealthReport]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# CodePulse Health Report\n");
    for report in reports {
        let _ = writeln!(output, "## {}\n", report.source);
        append_status(&mut output, &report.status, &report.path);
        append_scores(&mut output, report.scores.as_ref());
        append_language_stats(&mut output, report.language_stats.as_ref());
        append_coverage(&mut output, report.coverage.as_ref(), report.coverage_grade);
        append_issues(&mut output, report.issues.as_ref());
        append_insights(&mut output, report.insights.as_ref());
        append_list(&mut output, "Errors", &report.errors, "No errors reported.");
        let _ = writeln!(output);
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

/// Format language stats sorted by percentage.
pub fn format_language_stats(stats: &LanguageDistribution) -> Vec<(String, f64)> {
    let mut items: Vec<(String, f64)> = stats.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    items
}

fn append_status(output: &mut String, status: &AnalysisStatus, path: &std::path::Path) {
    let _ = writeln!(output, "- Path: `{}`", path.display());
    match status {
        AnalysisStatus::Pending => {
            let _ = writeln!(output, "- Status: pending");
        }
        AnalysisStatus::Analyzed => {
            let _ = writeln!(output, "- Status: analyzed");
        }
        AnalysisStatus::Failed(error) => {
            let _ = writeln!(output, "- Status: failed ({error})");
        }
    }
    let _ = writeln!(output);
}

fn append_scores(output: &mut String, scores: Option<&Scores>) {
    let Some(scores) = scores else {
        return;
    };
    let _ = writeln!(
        output,
        "### Health: {:.1} ({})\n",
        scores.health_score,
        health_label(scores.health_score)
    );
    let _ = writeln!(output, "| Area | Score |\n| --- | --- |");
    for (area, score) in [
        ("Coverage", scores.coverage_score),
        ("Security", scores.security_score),
        ("Documentation", scores.documentation_score),
        ("Code quality", scores.code_quality_score),
    ] {
        let _ = writeln!(output, "| {area} | {score:.1} |");
    }
    let _ = writeln!(output);
}

fn append_language_stats(output: &mut String, stats: Option<&LanguageDistribution>) {
    match stats {
        Some(stats) if stats.is_empty() => {
            let _ = writeln!(output, "### Languages\nNo languages detected.\n");
        }
        Some(stats) => {
            let _ = writeln!(output, "### Languages");
            for (language, percent) in format_language_stats(stats) {
                let _ = writeln!(output, "- {language}: {percent:.2}%");
            }
            let _ = writeln!(output);
        }
        None => {
            let _ = writeln!(output, "### Languages\nLanguages unavailable.\n");
        }
    }
}

fn append_coverage(
    output: &mut String,
    coverage: Option<&CoverageAnalysis>,
    grade: Option<CoverageGrade>,
) {
    let _ = writeln!(output, "### Test coverage");
    let Some(coverage) = coverage else {
        let _ = writeln!(output, "Coverage unavailable.\n");
        return;
    };
    if let Some(error) = &coverage.error {
        let _ = writeln!(output, "Coverage analysis degraded: {error}\n");
    }

    let metrics = &coverage.coverage_metrics;
    let source = if metrics.estimated { "estimated" } else { metrics.tool_used.as_str() };
    let _ = write!(output, "- Overall: {:.1}% ({source})", metrics.overall);
    match grade {
        Some(grade) => {
            let _ = writeln!(output, ", {}", grade.as_str());
        }
        None => {
            let _ = writeln!(output);
        }
    }
    let _ = writeln!(output, "- Primary language: {}", coverage.primary_language);
    let _ = writeln!(output, "- Test files: {}", coverage.test_files_count);

    let distribution = &coverage.test_structure.test_distribution;
    if distribution.total > 0 {
        let shares: Vec<String> = TestType::ALL
            .iter()
            .map(|test_type| {
                let pct = distribution.percentages.get(test_type).copied().unwrap_or(0.0);
                format!("{test_type} {pct:.1}%")
            })
            .collect();
        let _ = writeln!(output, "- Distribution: {}", shares.join(", "));
        let _ = writeln!(output, "- Pyramid balance: {:.1}", distribution.balance_score);
    }
    let _ = writeln!(output);

    if !coverage.recommendations.is_empty() {
        let _ = writeln!(output, "#### Recommendations");
        for recommendation in &coverage.recommendations {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                recommendation.kind.as_str(),
                recommendation.title,
                recommendation.action
            );
        }
        let _ = writeln!(output);
    }

    if !coverage.uncovered_areas.is_empty() {
        let _ = writeln!(output, "#### Untested source files");
        for area in &coverage.uncovered_areas {
            let _ = writeln!(output, "- `{}` ({})", area.file, area.priority.as_str());
        }
        let _ = writeln!(output);
    }
}

fn append_issues(output: &mut String, issues: Option<&IssueReport>) {
    let _ = writeln!(output, "### Issues");
    let Some(issues) = issues else {
        let _ = writeln!(output, "Issue scan skipped.\n");
        return;
    };
    if issues.total() == 0 {
        let _ = writeln!(output, "No issues found.\n");
        return;
    }

    let counts: Vec<String> = Severity::ALL
        .iter()
        .map(|severity| format!("{severity} {}", issues.count(*severity)))
        .collect();
    let _ = writeln!(output, "- Severity: {}", counts.join(", "));
    for category in IssueCategory::ALL {
        let count = issues.findings_in(category).len();
        if count > 0 {
            let _ = writeln!(output, "- {}: {count}", category.label());
        }
    }
    let _ = writeln!(output);

    if !issues.action_items.is_empty() {
        let _ = writeln!(output, "#### Action items");
        for item in &issues.action_items {
            let _ = writeln!(
                output,
                "{}. **{}** ({}): {}",
                item.priority, item.title, item.category, item.action
            );
        }
        let _ = writeln!(output);
    }
}

fn append_insights(output: &mut String, insights: Option<&Insights>) {
    let Some(insights) = insights else {
        return;
    };
    let _ = writeln!(output, "### AI insights");
    if insights.fallback {
        let _ = writeln!(output, "_AI service unavailable; showing defaults._");
    }
    let _ = writeln!(output, "- Architecture score: {:.1}/10", insights.architecture_score);
    for finding in &insights.key_findings {
        let _ = writeln!(output, "- {finding}");
    }
    for recommendation in &insights.recommendations {
        let _ = writeln!(output, "- Recommendation: {recommendation}");
    }
    let _ = writeln!(output);
}

fn append_list(output: &mut String, title: &str, items: &[String], empty_message: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}
