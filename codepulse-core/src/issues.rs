//! Regex-based issue scanning and the shared finding taxonomy.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::RepoMetadata;
use crate::error::{CodePulseError, Result};
use crate::fs::RepositorySnapshot;
use crate::functions::{function_spans, python_def_name};

/// How serious a finding is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fix immediately.
    Critical,
    /// Fix soon.
    High,
    /// Worth scheduling.
    Medium,
    /// Minor.
    Low,
    /// Informational.
    Info,
}

impl Severity {
    /// Every severity, most serious first.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Lower-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group a finding is reported under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Secrets, injection and XSS.
    Security,
    /// Long functions, TODOs and magic numbers.
    CodeQuality,
    /// Missing project or code documentation.
    Documentation,
    /// Inefficient loops and unbounded caches.
    Performance,
    /// Missing manifests and lock files.
    Dependency,
    /// Project layout.
    Structure,
    /// Staleness and issue backlog.
    Maintenance,
}

impl IssueCategory {
    /// Every category, in report order.
    pub const ALL: [IssueCategory; 7] = [
        IssueCategory::Security,
        IssueCategory::CodeQuality,
        IssueCategory::Documentation,
        IssueCategory::Performance,
        IssueCategory::Dependency,
        IssueCategory::Structure,
        IssueCategory::Maintenance,
    ];

    /// Title-case heading.
    pub fn label(self) -> &'static str {
        match self {
            Self::Security => "Security",
            Self::CodeQuality => "Code Quality",
            Self::Documentation => "Documentation",
            Self::Performance => "Performance",
            Self::Dependency => "Dependencies",
            Self::Structure => "Structure",
            Self::Maintenance => "Maintenance",
        }
    }
}

/// A single detected issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Machine-readable kind such as `hardcoded_secret`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Seriousness.
    pub severity: Severity,
    /// Root-relative file, or `root`/`repository` for project-level findings.
    pub file: String,
    /// One-based line, when the finding points into a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// What was found.
    pub description: String,
    /// How to fix it.
    pub suggestion: String,
}

impl Finding {
    fn project(
        kind: &str,
        severity: Severity,
        file: &str,
        description: impl Into<String>,
        suggestion: &str,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            severity,
            file: file.to_string(),
            line: None,
            description: description.into(),
            suggestion: suggestion.to_string(),
        }
    }

    fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// A prioritised follow-up derived from the findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    /// 1 is most urgent.
    pub priority: u8,
    /// Area the item belongs to.
    pub category: String,
    /// Short title.
    pub title: String,
    /// What was observed.
    pub description: String,
    /// What to do.
    pub action: String,
    /// Why it matters.
    pub impact: String,
}

/// Findings grouped by category with derived summaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueReport {
    /// Findings per category; every category is present.
    pub findings: BTreeMap<IssueCategory, Vec<Finding>>,
    /// Finding count per severity.
    pub severity_summary: BTreeMap<Severity, usize>,
    /// Prioritised follow-ups.
    pub action_items: Vec<ActionItem>,
    /// Names of external scanners whose findings were merged in.
    pub external_scanners: Vec<String>,
}

impl IssueReport {
    /// Build a report and derive its summaries.
    pub fn from_findings(mut findings: BTreeMap<IssueCategory, Vec<Finding>>) -> Self {
        for category in IssueCategory::ALL {
            findings.entry(category).or_default();
        }
        let mut report = Self {
            findings,
            ..Self::default()
        };
        report.refresh();
        report
    }

    /// Findings of one category.
    pub fn findings_in(&self, category: IssueCategory) -> &[Finding] {
        self.findings
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of findings with a severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.severity_summary.get(&severity).copied().unwrap_or(0)
    }

    /// Number of findings overall.
    pub fn total(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }

    fn refresh(&mut self) {
        self.severity_summary = severity_summary(&self.findings);
        self.action_items = action_items(&self.findings);
    }
}

/// Count findings per severity. Every severity is present.
pub fn severity_summary(
    findings: &BTreeMap<IssueCategory, Vec<Finding>>,
) -> BTreeMap<Severity, usize> {
    let mut summary: BTreeMap<Severity, usize> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for finding in findings.values().flatten() {
        *summary.entry(finding.severity).or_insert(0) += 1;
    }
    summary
}

/// Follow-ups for security, testing, documentation, code quality and dependencies.
pub fn action_items(findings: &BTreeMap<IssueCategory, Vec<Finding>>) -> Vec<ActionItem> {
    let of = |category| findings.get(&category).map(Vec::as_slice).unwrap_or(&[]);
    let item = |priority,
                category: &str,
                title: &str,
                description: String,
                action: &str,
                impact: &str| ActionItem {
        priority,
        category: category.to_string(),
        title: title.to_string(),
        description,
        action: action.to_string(),
        impact: impact.to_string(),
    };
    let mut items = Vec::new();

    let critical = of(IssueCategory::Security)
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .count();
    if critical > 0 {
        items.push(item(
            1,
            "Security",
            "Address Critical Security Issues",
            format!("Found {critical} critical security issues"),
            "Immediately review and fix hardcoded secrets, SQL injection, and XSS vulnerabilities",
            "High - Security vulnerabilities can lead to data breaches",
        ));
    }

    let mentions_tests = of(IssueCategory::CodeQuality)
        .iter()
        .chain(of(IssueCategory::Structure))
        .any(|f| f.description.to_lowercase().contains("test"));
    if mentions_tests {
        items.push(item(
            2,
            "Testing",
            "Improve Test Coverage",
            "Low test coverage detected".to_string(),
            "Add unit tests for core functionality and critical business logic",
            "Medium - Poor test coverage increases bug risk",
        ));
    }

    let docs = of(IssueCategory::Documentation).len();
    if docs > 0 {
        items.push(item(
            3,
            "Documentation",
            "Improve Documentation",
            format!("Found {docs} documentation issues"),
            "Add README, license, and code documentation",
            "Medium - Poor documentation reduces maintainability",
        ));
    }

    let complex = of(IssueCategory::CodeQuality)
        .iter()
        .filter(|f| f.kind == "long_function" || f.kind == "deep_nesting")
        .count();
    if complex > 0 {
        items.push(item(
            4,
            "Code Quality",
            "Refactor Complex Code",
            format!("Found {complex} complex code issues"),
            "Break down long functions and reduce nesting complexity",
            "Medium - Complex code is harder to maintain and debug",
        ));
    }

    let deps = of(IssueCategory::Dependency).len();
    if deps > 0 {
        items.push(item(
            5,
            "Dependencies",
            "Improve Dependency Management",
            format!("Found {deps} dependency issues"),
            "Add proper dependency management files and lock files",
            "Low - Improves build reproducibility",
        ));
    }

    items
}

/// An opaque third-party security scanner.
#[cfg_attr(test, mockall::automock)]
pub trait SecurityScanner {
    /// Scanner name recorded in the report.
    fn name(&self) -> &str;
    /// Findings for the checkout at `root`.
    fn scan(&self, root: &Path) -> Vec<Finding>;
}

/// Fold external security findings into a report and recompute its summaries.
pub fn merge_security_findings(report: &mut IssueReport, scanner: &str, findings: Vec<Finding>) {
    if findings.is_empty() {
        return;
    }
    report
        .findings
        .entry(IssueCategory::Security)
        .or_default()
        .extend(findings);
    report.external_scanners.push(scanner.to_string());
    report.refresh();
}

const SECURITY_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".java", ".cs", ".php"];
const QUALITY_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".java", ".cs"];
const PERFORMANCE_EXTENSIONS: &[&str] = &[".py", ".js", ".ts"];
const JS_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx"];

const README_FILES: &[&str] = &["README.md", "README.rst", "README.txt", "README"];
const LICENSE_FILES: &[&str] = &["LICENSE", "LICENSE.md", "LICENSE.txt", "COPYING"];
const API_DOC_DIRS: &[&str] = &["docs", "documentation", "api"];
const API_DOC_FILES: &[&str] = &["swagger.yaml", "openapi.yaml"];
const PYTHON_MANIFESTS: &[&str] = &["requirements.txt", "setup.py", "pyproject.toml", "Pipfile"];
const JS_LOCKFILES: &[&str] = &["package-lock.json", "yarn.lock"];
const ORGANISED_DIRS: &[&str] = &["src", "lib", "tests", "test", "docs", "documentation"];

/// Static description of a per-line regex rule.
struct LineRuleSpec {
    kind: &'static str,
    severity: Severity,
    description: &'static str,
    suggestion: &'static str,
    patterns: &'static [&'static str],
}

const SECRET_RULE: LineRuleSpec = LineRuleSpec {
    kind: "hardcoded_secret",
    severity: Severity::Critical,
    description: "Potential hardcoded secret detected",
    suggestion: "Move secrets to environment variables or secure configuration",
    patterns: &[
        r#"(?i)password\s*=\s*["'][^"']+["']"#,
        r#"(?i)api_key\s*=\s*["'][^"']+["']"#,
        r#"(?i)secret\s*=\s*["'][^"']+["']"#,
        r#"(?i)token\s*=\s*["'][^"']+["']"#,
    ],
};

const SQL_RULE: LineRuleSpec = LineRuleSpec {
    kind: "sql_injection",
    severity: Severity::Critical,
    description: "Potential SQL injection vulnerability",
    suggestion: "Use parameterized queries or ORM methods",
    patterns: &[
        r#"(?i)execute\s*\(\s*["'].*\+.*["']"#,
        r#"(?i)query\s*\(\s*["'].*\+.*["']"#,
    ],
};

const XSS_RULE: LineRuleSpec = LineRuleSpec {
    kind: "xss_vulnerability",
    severity: Severity::High,
    description: "Potential XSS vulnerability",
    suggestion: "Sanitize user input and use safe DOM manipulation methods",
    patterns: &[r"innerHTML\s*=\s*.*\+", r"document\.write\s*\(", r"eval\s*\("],
};

const LOOP_RULE: LineRuleSpec = LineRuleSpec {
    kind: "inefficient_loop",
    severity: Severity::Medium,
    description: "Potentially inefficient loop pattern",
    suggestion: "Consider using enumerate() or direct iteration",
    patterns: &[r"for.*in.*range\(len\(", r"while.*len\("],
};

const CACHE_RULE: LineRuleSpec = LineRuleSpec {
    kind: "memory_leak_risk",
    severity: Severity::Medium,
    description: "Potential memory leak: global mutable default",
    suggestion: "Use None as default and initialize inside function",
    patterns: &[r"global\s+\w+\s*=\s*\[\]", r"cache\s*=\s*\{\}"],
};

struct LineRule {
    spec: &'static LineRuleSpec,
    patterns: Vec<Regex>,
}

impl LineRule {
    fn compile(spec: &'static LineRuleSpec) -> Result<Self> {
        let patterns = spec
            .patterns
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { spec, patterns })
    }

    /// One finding per matching pattern per line, rule by rule.
    fn scan(&self, relative: &str, lines: &[&str], out: &mut Vec<Finding>) {
        for (index, line) in lines.iter().enumerate() {
            for pattern in &self.patterns {
                if pattern.is_match(line) {
                    out.push(
                        Finding::project(
                            self.spec.kind,
                            self.spec.severity,
                            relative,
                            self.spec.description,
                            self.spec.suggestion,
                        )
                        .at_line(index + 1),
                    );
                }
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| CodePulseError::Pattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| name.ends_with(ext))
}

/// Scans a snapshot for security, quality, documentation, performance,
/// dependency, structure and maintenance issues.
pub struct IssueScanner {
    security: [LineRule; 3],
    performance: [LineRule; 2],
    todo: Regex,
    magic_number: Regex,
    commented_digits: Regex,
    long_function_lines: usize,
    max_file_bytes: u64,
}

impl IssueScanner {
    /// Compile every rule table.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            security: [
                LineRule::compile(&SECRET_RULE)?,
                LineRule::compile(&SQL_RULE)?,
                LineRule::compile(&XSS_RULE)?,
            ],
            performance: [LineRule::compile(&LOOP_RULE)?, LineRule::compile(&CACHE_RULE)?],
            todo: compile(r"(TODO|FIXME|HACK|XXX)")?,
            magic_number: compile(r"\b\d{3,}\b")?,
            commented_digits: compile(r"#.*\d+")?,
            long_function_lines: config.long_function_lines,
            max_file_bytes: config.max_file_bytes,
        })
    }

    /// Scan a checkout. `now` anchors the staleness checks.
    pub fn scan(
        &self,
        snapshot: &RepositorySnapshot<'_>,
        metadata: Option<&RepoMetadata>,
        now: DateTime<Utc>,
    ) -> IssueReport {
        let mut findings: BTreeMap<IssueCategory, Vec<Finding>> = BTreeMap::new();
        let mut documentation = project_documentation(snapshot, metadata);

        for relative in snapshot.files() {
            let scanned = has_extension(&relative, SECURITY_EXTENSIONS)
                || has_extension(&relative, PERFORMANCE_EXTENSIONS);
            if !scanned {
                continue;
            }
            let content = match snapshot.read_bounded(&relative, self.max_file_bytes) {
                Ok(content) => content,
                Err(err) => {
                    debug!("issue scan skipping {relative}: {err}");
                    continue;
                }
            };
            let lines: Vec<&str> = content.split('\n').collect();

            if has_extension(&relative, SECURITY_EXTENSIONS) {
                let out = findings.entry(IssueCategory::Security).or_default();
                for rule in &self.security {
                    rule.scan(&relative, &lines, out);
                }
            }
            if has_extension(&relative, QUALITY_EXTENSIONS) {
                let out = findings.entry(IssueCategory::CodeQuality).or_default();
                self.scan_quality(&relative, &lines, out);
            }
            if relative.ends_with(".py") {
                missing_docstrings(&relative, &lines, &mut documentation);
            }
            if has_extension(&relative, PERFORMANCE_EXTENSIONS) {
                let out = findings.entry(IssueCategory::Performance).or_default();
                for rule in &self.performance {
                    rule.scan(&relative, &lines, out);
                }
            }
        }

        findings.insert(IssueCategory::Documentation, documentation);
        findings.insert(
            IssueCategory::Dependency,
            dependency_findings(snapshot, self.max_file_bytes),
        );
        findings.insert(IssueCategory::Structure, structure_findings(snapshot));
        findings.insert(
            IssueCategory::Maintenance,
            metadata
                .map(|metadata| maintenance_findings(metadata, now))
                .unwrap_or_default(),
        );

        IssueReport::from_findings(findings)
    }

    fn scan_quality(&self, relative: &str, lines: &[&str], out: &mut Vec<Finding>) {
        for span in function_spans(relative, lines) {
            if span.lines > self.long_function_lines {
                out.push(
                    Finding::project(
                        "long_function",
                        Severity::Medium,
                        relative,
                        format!("Function \"{}\" has {} lines", span.name, span.lines),
                        "Consider breaking down into smaller functions",
                    )
                    .at_line(span.start_line),
                );
            }
        }

        for (index, line) in lines.iter().enumerate() {
            if self.todo.is_match(line) {
                out.push(
                    Finding::project(
                        "todo_comment",
                        Severity::Low,
                        relative,
                        "TODO/FIXME comment found",
                        "Address pending tasks or create proper issues",
                    )
                    .at_line(index + 1),
                );
            }
        }

        for (index, line) in lines.iter().enumerate() {
            let numbers: Vec<&str> = self
                .magic_number
                .find_iter(line)
                .map(|found| found.as_str())
                .collect();
            if !numbers.is_empty() && !self.commented_digits.is_match(line) {
                out.push(
                    Finding::project(
                        "magic_number",
                        Severity::Low,
                        relative,
                        format!("Magic number(s) found: {}", numbers.join(", ")),
                        "Replace with named constants",
                    )
                    .at_line(index + 1),
                );
            }
        }
    }
}

fn project_documentation(
    snapshot: &RepositorySnapshot<'_>,
    metadata: Option<&RepoMetadata>,
) -> Vec<Finding> {
    let mut out = Vec::new();
    if !README_FILES.iter().any(|name| snapshot.has_root_file(name)) {
        out.push(Finding::project(
            "missing_readme",
            Severity::Medium,
            "root",
            "No README file found",
            "Add a comprehensive README.md with project description, setup instructions, and usage examples",
        ));
    }

    let licensed = metadata.and_then(|m| m.license.as_deref()).is_some_and(|l| !l.is_empty());
    if !licensed && !LICENSE_FILES.iter().any(|name| snapshot.has_root_file(name)) {
        out.push(Finding::project(
            "missing_license",
            Severity::Medium,
            "root",
            "No license file found",
            "Add an appropriate license file (MIT, Apache 2.0, GPL, etc.)",
        ));
    }

    let has_api_docs = API_DOC_DIRS.iter().any(|dir| snapshot.has_root_dir(dir))
        || API_DOC_FILES.iter().any(|file| snapshot.has_root_file(file));
    if !has_api_docs {
        out.push(Finding::project(
            "missing_api_docs",
            Severity::Low,
            "root",
            "No API documentation found",
            "Consider adding API documentation using tools like Swagger/OpenAPI",
        ));
    }
    out
}

fn missing_docstrings(relative: &str, lines: &[&str], out: &mut Vec<Finding>) {
    for (index, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        let class = stripped
            .strip_prefix("class ")
            .filter(|_| stripped.contains(':'));
        let item = if let Some(rest) = class {
            let name = rest
                .split('(')
                .next()
                .unwrap_or(rest)
                .trim()
                .trim_end_matches(':');
            Some(("class", name.to_string()))
        } else {
            python_def_name(stripped)
                .filter(|name| !name.starts_with('_'))
                .map(|name| ("function", name))
        };

        if let Some((kind, name)) = item {
            if !has_docstring(lines, index + 1) {
                out.push(
                    Finding::project(
                        "missing_docstring",
                        Severity::Low,
                        relative,
                        format!("Missing docstring for {kind}: {name}"),
                        "Add comprehensive docstrings following PEP 257",
                    )
                    .at_line(index + 1),
                );
            }
        }
    }
}

fn has_docstring(lines: &[&str], start: usize) -> bool {
    lines.iter().skip(start).take(3).any(|line| {
        let stripped = line.trim();
        stripped.starts_with("\"\"\"") || stripped.starts_with("'''")
    })
}

fn dependency_findings(snapshot: &RepositorySnapshot<'_>, max_file_bytes: u64) -> Vec<Finding> {
    let mut out = Vec::new();

    let has_manifest = PYTHON_MANIFESTS.iter().any(|name| snapshot.has_root_file(name));
    if !has_manifest && snapshot.files().any(|file| file.ends_with(".py")) {
        out.push(Finding::project(
            "missing_requirements",
            Severity::Medium,
            "root",
            "Python project without dependency management",
            "Add requirements.txt or pyproject.toml for dependency management",
        ));
    }

    if snapshot.has_root_file("package.json") {
        let parsed = snapshot
            .read_bounded("package.json", max_file_bytes)
            .and_then(|raw| {
                serde_json::from_str::<serde_json::Value>(&raw).map_err(CodePulseError::from)
            });
        match parsed {
            Ok(_) if !JS_LOCKFILES.iter().any(|name| snapshot.has_root_file(name)) => {
                out.push(Finding::project(
                    "missing_lockfile",
                    Severity::Medium,
                    "package.json",
                    "No lock file found for JavaScript dependencies",
                    "Commit package-lock.json or yarn.lock for reproducible builds",
                ));
            }
            Ok(_) => {}
            Err(err) => debug!("package.json unreadable: {err}"),
        }
    } else if snapshot.files().any(|file| has_extension(&file, JS_EXTENSIONS)) {
        out.push(Finding::project(
            "missing_package_json",
            Severity::Medium,
            "root",
            "JavaScript project without package.json",
            "Add package.json for dependency and script management",
        ));
    }

    out
}

fn structure_findings(snapshot: &RepositorySnapshot<'_>) -> Vec<Finding> {
    let mut out = Vec::new();
    let root_code_files = snapshot
        .root_listing()
        .map(|listing| {
            listing
                .files
                .iter()
                .filter(|file| has_extension(file, QUALITY_EXTENSIONS))
                .count()
        })
        .unwrap_or(0);

    if root_code_files > 3 {
        out.push(Finding::project(
            "scattered_files",
            Severity::Low,
            "root",
            format!("{root_code_files} code files in root directory"),
            "Organize code files into appropriate directories (src/, lib/, etc.)",
        ));
    }

    if !snapshot.has_root_file(".gitignore") {
        out.push(Finding::project(
            "missing_gitignore",
            Severity::Low,
            "root",
            "No .gitignore file found",
            "Add .gitignore to exclude build artifacts, dependencies, and sensitive files",
        ));
    }

    let organised = ORGANISED_DIRS
        .iter()
        .any(|dir| snapshot.has_root_dir(dir) || snapshot.has_root_file(dir));
    if !organised && root_code_files > 5 {
        out.push(Finding::project(
            "poor_organization",
            Severity::Medium,
            "root",
            "Project lacks organized directory structure",
            "Create organized directories for source code, tests, and documentation",
        ));
    }

    out
}

/// Staleness and backlog findings from provider metadata.
pub fn maintenance_findings(metadata: &RepoMetadata, now: DateTime<Utc>) -> Vec<Finding> {
    let mut out = Vec::new();

    let updated = metadata.stats.updated_at.as_deref().and_then(|stamp| {
        let day = stamp.split('T').next().unwrap_or(stamp);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    });
    if let Some(updated) = updated {
        let days = (now.date_naive() - updated).num_days();
        if days > 365 {
            out.push(Finding::project(
                "stale_repository",
                Severity::Medium,
                "repository",
                format!("Repository not updated for {days} days"),
                "Consider archiving if no longer maintained, or update dependencies and documentation",
            ));
        } else if days > 180 {
            out.push(Finding::project(
                "infrequent_updates",
                Severity::Low,
                "repository",
                format!("Repository not updated for {days} days"),
                "Consider regular maintenance and dependency updates",
            ));
        }
    }

    let open_issues = metadata.stats.open_issues;
    if open_issues > 20 {
        out.push(Finding::project(
            "high_open_issues",
            Severity::Medium,
            "repository",
            format!("{open_issues} open issues"),
            "Address or triage open issues to improve project health",
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{
        Finding, IssueCategory, IssueReport, IssueScanner, MockSecurityScanner, SecurityScanner,
        Severity, maintenance_findings, merge_security_findings,
    };
    use crate::config::AnalysisConfig;
    use crate::domain::{RepoMetadata, RepoStats};
    use crate::fs::{RepositorySnapshot, StdFileSystem};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::path::Path;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid date")
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn scan(root: &Path, metadata: Option<&RepoMetadata>) -> IssueReport {
        let fs = StdFileSystem::new();
        let snapshot = RepositorySnapshot::capture(&fs, root);
        IssueScanner::new(&AnalysisConfig::default())
            .expect("rules compile")
            .scan(&snapshot, metadata, now())
    }

    fn kinds(report: &IssueReport, category: IssueCategory) -> Vec<&str> {
        report
            .findings_in(category)
            .iter()
            .map(|finding| finding.kind.as_str())
            .collect()
    }

    #[test]
    fn detects_security_patterns_with_lines() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(
            dir.path(),
            "src/app.py",
            "PASSWORD = \"hunter2\"\ncursor.execute(\"SELECT * FROM users WHERE name='\" + name + \"'\")\nvalue = eval(expr)\n",
        );

        let report = scan(dir.path(), None);
        let security = report.findings_in(IssueCategory::Security);
        assert_eq!(
            kinds(&report, IssueCategory::Security),
            vec!["hardcoded_secret", "sql_injection", "xss_vulnerability"]
        );
        assert_eq!(security[0].line, Some(1));
        assert_eq!(security[1].line, Some(2));
        assert_eq!(security[2].severity, Severity::High);
        assert_eq!(report.count(Severity::Critical), 2);
        assert_eq!(report.action_items[0].priority, 1);
    }

    #[test]
    fn detects_quality_and_performance_patterns() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut long_body = String::from("def huge():\n    \"\"\"Doc.\"\"\"\n");
        for i in 0..55 {
            long_body.push_str(&format!("    x{i} = {i}\n"));
        }
        long_body.push_str("limit = 5000\nretries = 3000  # ms 3000\n# TODO tidy\n");
        long_body.push_str("for i in range(len(items)):\n    pass\ncache = {}\n");
        write(dir.path(), "src/worker.py", &long_body);

        let report = scan(dir.path(), None);
        assert_eq!(
            kinds(&report, IssueCategory::CodeQuality),
            vec!["long_function", "todo_comment", "magic_number"]
        );
        let magic = &report.findings_in(IssueCategory::CodeQuality)[2];
        assert_eq!(magic.description, "Magic number(s) found: 5000");
        assert_eq!(
            kinds(&report, IssueCategory::Performance),
            vec!["inefficient_loop", "memory_leak_risk"]
        );
        assert!(report.action_items.iter().any(|item| item.priority == 4));
    }

    #[test]
    fn project_level_documentation_and_structure() {
        let dir = tempfile::tempdir().expect("temp dir");
        for name in ["a.py", "b.py", "c.py", "d.py", "e.py", "f.py"] {
            write(dir.path(), name, "def run():\n    return 1\n");
        }

        let report = scan(dir.path(), None);
        let docs = kinds(&report, IssueCategory::Documentation);
        assert_eq!(&docs[..3], &["missing_readme", "missing_license", "missing_api_docs"]);
        assert_eq!(docs.iter().filter(|kind| **kind == "missing_docstring").count(), 6);
        assert_eq!(
            kinds(&report, IssueCategory::Structure),
            vec!["scattered_files", "missing_gitignore", "poor_organization"]
        );
        assert_eq!(kinds(&report, IssueCategory::Dependency), vec!["missing_requirements"]);
    }

    #[test]
    fn well_kept_project_has_no_project_findings() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(dir.path(), "README.md", "# demo");
        write(dir.path(), ".gitignore", "target/");
        write(dir.path(), "docs/index.md", "docs");
        write(dir.path(), "package.json", "{\"name\": \"demo\"}");
        write(dir.path(), "package-lock.json", "{}");
        write(dir.path(), "src/index.js", "const x = 1;\n");

        let metadata = RepoMetadata {
            license: Some("MIT".to_string()),
            ..RepoMetadata::default()
        };
        let report = scan(dir.path(), Some(&metadata));
        assert!(report.findings_in(IssueCategory::Documentation).is_empty());
        assert!(report.findings_in(IssueCategory::Structure).is_empty());
        assert!(report.findings_in(IssueCategory::Dependency).is_empty());
        assert_eq!(report.total(), 0);
        assert!(report.action_items.is_empty());
    }

    #[test]
    fn javascript_dependency_checks() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(dir.path(), "index.js", "module.exports = {};\n");
        let report = scan(dir.path(), None);
        assert_eq!(kinds(&report, IssueCategory::Dependency), vec!["missing_package_json"]);

        write(dir.path(), "package.json", "{\"name\": \"demo\"}");
        let report = scan(dir.path(), None);
        assert_eq!(kinds(&report, IssueCategory::Dependency), vec!["missing_lockfile"]);
    }

    #[test]
    fn docstrings_are_looked_for_in_the_next_lines() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(
            dir.path(),
            "lib.py",
            "class Widget(Base):\n    \"\"\"A widget.\"\"\"\n\ndef _private():\n    pass\n\ndef public():\n    pass\n",
        );
        let report = scan(dir.path(), None);
        let missing: Vec<&str> = report
            .findings_in(IssueCategory::Documentation)
            .iter()
            .filter(|finding| finding.kind == "missing_docstring")
            .map(|finding| finding.description.as_str())
            .collect();
        assert_eq!(missing, vec!["Missing docstring for function: public"]);
    }

    #[test]
    fn maintenance_uses_supplied_clock() {
        let stale = RepoMetadata {
            stats: RepoStats {
                updated_at: Some("2022-01-01T00:00:00Z".to_string()),
                open_issues: 42,
                ..RepoStats::default()
            },
            ..RepoMetadata::default()
        };
        let findings = maintenance_findings(&stale, now());
        let kinds: Vec<&str> = findings.iter().map(|f| f.kind.as_str()).collect();
        assert_eq!(kinds, vec!["stale_repository", "high_open_issues"]);

        let quiet = RepoMetadata {
            stats: RepoStats {
                updated_at: Some("2023-10-01".to_string()),
                ..RepoStats::default()
            },
            ..RepoMetadata::default()
        };
        let findings = maintenance_findings(&quiet, now());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, "infrequent_updates");
        assert_eq!(findings[0].severity, Severity::Low);

        let garbage = RepoMetadata {
            stats: RepoStats {
                updated_at: Some("yesterday".to_string()),
                ..RepoStats::default()
            },
            ..RepoMetadata::default()
        };
        assert!(maintenance_findings(&garbage, now()).is_empty());
    }

    #[test]
    fn external_findings_merge_into_security() {
        let mut report = IssueReport::from_findings(BTreeMap::new());
        assert_eq!(report.findings.len(), IssueCategory::ALL.len());
        assert!(report.action_items.is_empty());

        let mut scanner = MockSecurityScanner::new();
        scanner.expect_name().return_const("static-scan".to_string());
        scanner.expect_scan().returning(|_| {
            vec![Finding {
                kind: "cwe_89".to_string(),
                severity: Severity::Critical,
                file: "src/db.py".to_string(),
                line: Some(10),
                description: "SQL injection".to_string(),
                suggestion: "Bind parameters".to_string(),
            }]
        });

        let findings = scanner.scan(Path::new("/repo"));
        merge_security_findings(&mut report, scanner.name(), findings);
        assert_eq!(report.findings_in(IssueCategory::Security).len(), 1);
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.external_scanners, vec!["static-scan"]);
        assert_eq!(report.action_items[0].title, "Address Critical Security Issues");

        merge_security_findings(&mut report, "empty", Vec::new());
        assert_eq!(report.external_scanners.len(), 1);
    }
}
