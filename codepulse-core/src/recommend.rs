//! Testing recommendations derived from coverage and suite shape.

use crate::domain::{
    CoverageMetrics, Recommendation, RecommendationKind, TestStructure, TestType,
};

fn recommendation(
    kind: RecommendationKind,
    title: &str,
    description: &str,
    action: &str,
) -> Recommendation {
    Recommendation {
        kind,
        title: title.to_string(),
        description: description.to_string(),
        action: action.to_string(),
    }
}

/// Recommendations in rule order: coverage band, distribution, frameworks.
pub fn generate_recommendations(
    structure: &TestStructure,
    metrics: &CoverageMetrics,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let coverage = metrics.overall;
    if coverage < 30.0 {
        recommendations.push(recommendation(
            RecommendationKind::Critical,
            "Very Low Test Coverage",
            "Test coverage is below 30%. Consider implementing a comprehensive testing strategy.",
            "Start by adding unit tests for core functionality and critical business logic.",
        ));
    } else if coverage < 50.0 {
        recommendations.push(recommendation(
            RecommendationKind::Warning,
            "Low Test Coverage",
            "Test coverage is below 50%. Add more unit tests to improve code reliability.",
            "Focus on testing public APIs and error handling scenarios.",
        ));
    } else if coverage < 75.0 {
        recommendations.push(recommendation(
            RecommendationKind::Info,
            "Moderate Test Coverage",
            "Test coverage is moderate. Consider adding integration tests and edge case testing.",
            "Add tests for complex interactions and boundary conditions.",
        ));
    }

    let distribution = &structure.test_distribution;
    let pct = |test_type: TestType| {
        distribution
            .percentages
            .get(&test_type)
            .copied()
            .unwrap_or(0.0)
    };

    if distribution.total > 0 {
        if pct(TestType::Unit) < 50.0 {
            recommendations.push(recommendation(
                RecommendationKind::Warning,
                "Insufficient Unit Tests",
                &format!(
                    "Only {:.1}% of tests are unit tests. A healthy pyramid has about 70%.",
                    pct(TestType::Unit)
                ),
                "Write fast, isolated unit tests for individual functions and classes.",
            ));
        }
        if pct(TestType::Integration) > 40.0 {
            recommendations.push(recommendation(
                RecommendationKind::Info,
                "Too Many Integration Tests",
                &format!(
                    "{:.1}% of tests are integration tests, which slows the suite down.",
                    pct(TestType::Integration)
                ),
                "Move logic that does not need real collaborators into unit tests.",
            ));
        }
        if pct(TestType::E2e) > 20.0 {
            recommendations.push(recommendation(
                RecommendationKind::Info,
                "Too Many E2E Tests",
                &format!(
                    "{:.1}% of tests are end-to-end tests. Aim for 5-10%.",
                    pct(TestType::E2e)
                ),
                "Keep end-to-end tests for critical user journeys only.",
            ));
        }
        if pct(TestType::Unknown) > 10.0 {
            recommendations.push(recommendation(
                RecommendationKind::Suggestion,
                "Improve Test Organization",
                &format!(
                    "{:.1}% of test files could not be classified.",
                    pct(TestType::Unknown)
                ),
                "Group tests into unit/, integration/ and e2e/ directories with descriptive names.",
            ));
        }
    }

    let integration_count = structure
        .test_types
        .get(&TestType::Integration)
        .copied()
        .unwrap_or(0);
    if integration_count == 0 {
        recommendations.push(recommendation(
            RecommendationKind::Suggestion,
            "Add Integration Tests",
            "No integration tests detected. Consider adding tests for component interactions.",
            "Create integration tests for key workflows and data flows.",
        ));
    }

    match structure.test_frameworks.len() {
        0 => recommendations.push(recommendation(
            RecommendationKind::Warning,
            "No Test Framework Detected",
            "No recognized test framework found. Consider adopting a standard testing framework.",
            "Choose and implement a test framework appropriate for your language.",
        )),
        count if count > 2 => recommendations.push(recommendation(
            RecommendationKind::Suggestion,
            "Consolidate Test Frameworks",
            &format!("{count} test frameworks are in use, which fragments tooling and conventions."),
            "Standardise on one primary framework per language.",
        )),
        _ => {}
    }

    recommendations
}
