//! Contract with the optional AI insight service.
//!
//! The core never talks to the service. It builds the prompt, parses whatever
//! text comes back and supplies the static payload used when there is no answer.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::analysis::CoverageAnalysis;
use crate::domain::RepoMetadata;
use crate::issues::{IssueCategory, IssueReport, Severity};

/// Structured answer of the insight service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Architecture rating on a 0-10 scale.
    pub architecture_score: f64,
    /// Notable observations.
    #[serde(default)]
    pub key_findings: Vec<String>,
    /// Suggested next steps.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Set when this is the static payload rather than a service answer.
    #[serde(default)]
    pub fallback: bool,
}

impl Insights {
    /// Payload used when the service is disabled, unauthenticated or unreachable.
    pub fn fallback() -> Self {
        Self {
            architecture_score: 7.0,
            key_findings: vec!["AI analysis requires GITHUB_TOKEN configuration".to_string()],
            recommendations: vec![
                "Add GITHUB_TOKEN to .env file for enhanced AI insights".to_string(),
                "Review the automated findings above for immediate improvements".to_string(),
            ],
            fallback: true,
        }
    }
}

/// Prompt asking the service for an [`Insights`] JSON object.
pub fn build_insight_prompt(
    metadata: Option<&RepoMetadata>,
    coverage: &CoverageAnalysis,
    issues: Option<&IssueReport>,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Assess the health of this software repository.\n");

    if let Some(metadata) = metadata {
        let _ = writeln!(prompt, "Repository: {}", metadata.full_name);
        if let Some(description) = &metadata.description {
            let _ = writeln!(prompt, "Description: {description}");
        }
        if !metadata.languages.is_empty() {
            let languages: Vec<&str> = metadata.languages.keys().map(String::as_str).collect();
            let _ = writeln!(prompt, "Languages: {}", languages.join(", "));
        }
    }

    let _ = writeln!(prompt, "Primary language: {}", coverage.primary_language);
    let _ = writeln!(prompt, "Test files: {}", coverage.test_files_count);
    let _ = writeln!(
        prompt,
        "Coverage: {:.1}% ({})",
        coverage.coverage_metrics.overall,
        if coverage.coverage_metrics.estimated { "estimated" } else { "measured" }
    );
    let _ = writeln!(
        prompt,
        "Test balance score: {:.1}",
        coverage.test_structure.test_distribution.balance_score
    );

    if let Some(issues) = issues {
        let _ = writeln!(prompt, "Issues by severity:");
        for severity in Severity::ALL {
            let _ = writeln!(prompt, "- {severity}: {}", issues.count(severity));
        }
        for category in IssueCategory::ALL {
            let count = issues.findings_in(category).len();
            if count > 0 {
                let _ = writeln!(prompt, "- {}: {count} findings", category.label());
            }
        }
    }

    let _ = writeln!(
        prompt,
        "\nRespond with a single JSON object only:\n\
{{\"architecture_score\": 0-10, \"key_findings\": [\"...\"], \"recommendations\": [\"...\"]}}"
    );
    prompt
}

/// First JSON object in `text` that fits the insight contract.
pub fn parse_insight_response(text: &str) -> Option<Insights> {
    let start = text.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Insights>();
    let mut insights = stream.next()?.ok()?;
    if !insights.architecture_score.is_finite() {
        return None;
    }
    insights.architecture_score = insights.architecture_score.clamp(0.0, 10.0);
    insights.fallback = false;
    Some(insights)
}

#[cfg(test)]
mod tests {
    use super::{Insights, build_insight_prompt, parse_insight_response};
    use crate::analysis::CoverageAnalysis;
    use crate::domain::RepoMetadata;
    use crate::issues::IssueReport;
    use std::collections::BTreeMap;

    #[test]
    fn parses_object_wrapped_in_prose() {
        let text = "Sure! Here it is:\n```json\n{\"architecture_score\": 12, \"key_findings\": [\"layered\"]}\n```\nThanks";
        let insights = parse_insight_response(text).expect("insights");
        assert_eq!(insights.architecture_score, 10.0);
        assert_eq!(insights.key_findings, vec!["layered"]);
        assert!(insights.recommendations.is_empty());
        assert!(!insights.fallback);
    }

    #[test]
    fn malformed_responses_are_rejected() {
        assert!(parse_insight_response("no json here").is_none());
        assert!(parse_insight_response("{\"key_findings\": []}").is_none());
        assert!(parse_insight_response("{\"architecture_score\": ").is_none());
    }

    #[test]
    fn fallback_is_flagged() {
        assert!(Insights::fallback().fallback);
    }

    #[test]
    fn prompt_mentions_repository_and_contract() {
        let metadata = RepoMetadata {
            full_name: "acme/widgets".to_string(),
            ..RepoMetadata::default()
        };
        let coverage = CoverageAnalysis::degraded("boom");
        let issues = IssueReport::from_findings(BTreeMap::new());
        let prompt = build_insight_prompt(Some(&metadata), &coverage, Some(&issues));
        assert!(prompt.contains("Repository: acme/widgets"));
        assert!(prompt.contains("- critical: 0"));
        assert!(prompt.contains("\"architecture_score\""));
    }
}
