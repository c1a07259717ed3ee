//! Health score aggregation.

use serde::{Deserialize, Serialize};

use crate::coverage::round1;
use crate::domain::CoverageMetrics;
use crate::issues::{IssueCategory, IssueReport, Severity};

/// Scores in `[0, 100]`, one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    /// Weighted blend of the other four.
    pub health_score: f64,
    /// Coverage with a 10% bonus, capped.
    pub coverage_score: f64,
    /// Penalised per critical and high finding.
    pub security_score: f64,
    /// Penalised per documentation finding.
    pub documentation_score: f64,
    /// Penalised per code quality finding.
    pub code_quality_score: f64,
}

impl Scores {
    /// Combine coverage and issue findings.
    pub fn compute(coverage: &CoverageMetrics, issues: &IssueReport) -> Self {
        let coverage_score = (coverage.overall * 1.1).min(100.0);

        let security = issues.findings_in(IssueCategory::Security);
        let critical = security.iter().filter(|f| f.severity == Severity::Critical).count();
        let high = security.iter().filter(|f| f.severity == Severity::High).count();
        let security_score = (100.0 - 30.0 * critical as f64 - 15.0 * high as f64).max(0.0);

        let documentation_score =
            (100.0 - 10.0 * issues.findings_in(IssueCategory::Documentation).len() as f64).max(0.0);
        let code_quality_score =
            (100.0 - 5.0 * issues.findings_in(IssueCategory::CodeQuality).len() as f64).max(0.0);

        let health_score = coverage_score * 0.3
            + security_score * 0.3
            + documentation_score * 0.2
            + code_quality_score * 0.2;

        Self {
            health_score: round1(health_score),
            coverage_score: round1(coverage_score),
            security_score: round1(security_score),
            documentation_score: round1(documentation_score),
            code_quality_score: round1(code_quality_score),
        }
    }
}

/// Human label for a health score.
pub fn health_label(score: f64) -> &'static str {
    if score >= 80.0 {
        "excellent"
    } else if score >= 60.0 {
        "good"
    } else if score >= 40.0 {
        "fair"
    } else {
        "needs attention"
    }
}

#[cfg(test)]
mod tests {
    use super::{Scores, health_label};
    use crate::domain::CoverageMetrics;
    use crate::issues::{Finding, IssueCategory, IssueReport, Severity};
    use std::collections::BTreeMap;

    fn finding(severity: Severity) -> Finding {
        Finding {
            kind: "sample".to_string(),
            severity,
            file: "a.py".to_string(),
            line: None,
            description: String::new(),
            suggestion: String::new(),
        }
    }

    fn coverage(overall: f64) -> CoverageMetrics {
        CoverageMetrics {
            overall,
            ..CoverageMetrics::zeroed()
        }
    }

    #[test]
    fn clean_repository_scores_coverage_weighted() {
        let issues = IssueReport::from_findings(BTreeMap::new());
        let scores = Scores::compute(&coverage(60.0), &issues);
        assert_eq!(scores.coverage_score, 66.0);
        assert_eq!(scores.security_score, 100.0);
        assert_eq!(scores.health_score, 89.8);
    }

    #[test]
    fn penalties_floor_at_zero() {
        let mut findings = BTreeMap::new();
        findings.insert(
            IssueCategory::Security,
            vec![finding(Severity::Critical), finding(Severity::Critical), finding(Severity::High)],
        );
        findings.insert(IssueCategory::Documentation, vec![finding(Severity::Low); 12]);
        findings.insert(IssueCategory::CodeQuality, vec![finding(Severity::Low); 3]);
        let issues = IssueReport::from_findings(findings);

        let scores = Scores::compute(&coverage(95.0), &issues);
        assert_eq!(scores.coverage_score, 100.0);
        assert_eq!(scores.security_score, 25.0);
        assert_eq!(scores.documentation_score, 0.0);
        assert_eq!(scores.code_quality_score, 85.0);
        assert_eq!(scores.health_score, 54.5);
    }

    #[test]
    fn labels() {
        assert_eq!(health_label(80.0), "excellent");
        assert_eq!(health_label(60.0), "good");
        assert_eq!(health_label(45.5), "fair");
        assert_eq!(health_label(10.0), "needs attention");
    }
}
