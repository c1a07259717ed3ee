//! Test-type distribution and pyramid balance.

use std::collections::BTreeMap;

use crate::domain::{TestDistribution, TestType};

/// Target share of each pyramid layer, in percent.
pub const PYRAMID_TARGETS: &[(TestType, f64)] = &[
    (TestType::Unit, 70.0),
    (TestType::Integration, 20.0),
    (TestType::E2e, 10.0),
];

/// Points lost per percentage point of deviation from a target.
pub const DEVIATION_PENALTY: f64 = 0.5;

/// Reduce per-type counts to percentages, a balance score and advice.
pub fn analyze_distribution(counts: &BTreeMap<TestType, usize>) -> TestDistribution {
    let total: usize = counts.values().sum();
    let count_of = |test_type: TestType| counts.get(&test_type).copied().unwrap_or(0);

    if total == 0 {
        return TestDistribution {
            total: 0,
            percentages: TestType::ALL.iter().map(|t| (*t, 0.0)).collect(),
            balance_score: 0.0,
            recommendations: vec!["No tests found".to_string()],
        };
    }

    let percentages: BTreeMap<TestType, f64> = TestType::ALL
        .iter()
        .map(|t| (*t, 100.0 * count_of(*t) as f64 / total as f64))
        .collect();
    let pct = |test_type: TestType| percentages.get(&test_type).copied().unwrap_or(0.0);

    let mut balance_score = 100.0;
    for (test_type, target) in PYRAMID_TARGETS {
        balance_score -= DEVIATION_PENALTY * (pct(*test_type) - target).abs();
    }
    let balance_score = balance_score.clamp(0.0, 100.0);

    let mut recommendations = Vec::new();
    if pct(TestType::Unit) < 50.0 {
        recommendations.push(
            "Increase unit test coverage - aim for 70% of tests to be unit tests".to_string(),
        );
    }
    if count_of(TestType::Integration) == 0 {
        recommendations.push(
            "Add integration tests to verify component interactions".to_string(),
        );
    } else if pct(TestType::Integration) > 40.0 {
        recommendations.push(
            "Consider converting some integration tests to faster unit tests".to_string(),
        );
    }
    if pct(TestType::E2e) > 20.0 {
        recommendations.push(
            "Reduce end-to-end tests to 5-10% of the suite; they are slow and brittle".to_string(),
        );
    }
    if pct(TestType::Unknown) > 10.0 {
        recommendations.push(
            "Improve test naming and organization so test types can be identified".to_string(),
        );
    }

    TestDistribution {
        total,
        percentages,
        balance_score,
        recommendations,
    }
}
