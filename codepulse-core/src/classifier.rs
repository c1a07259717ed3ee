//! Two-stage test-type classification.
//!
//! Stage one looks at the lower-cased relative path and checks keyword groups
//! in a fixed priority order: e2e, performance, integration, unit. The first
//! group with a hit decides the type.
//!
//! Stage two only runs when the path says nothing. It scores the lower-cased
//! content against weighted keyword tables and picks the highest score. A file
//! with no signal at all is treated as a unit test, since that is what most
//! ambiguous test files turn out to be. Equal non-zero maxima resolve to the
//! first of unit, integration, e2e, performance.

use serde::{Deserialize, Serialize};

use crate::domain::TestType;

/// A set of keywords that all contribute the same weight per occurrence.
#[derive(Debug)]
pub struct KeywordGroup {
    /// Points added for each occurrence.
    pub weight: u32,
    /// Substrings counted in lower-cased content.
    pub keywords: &'static [&'static str],
}

impl KeywordGroup {
    /// Weighted occurrence count of this group in `lowered`.
    pub fn score(&self, lowered: &str) -> u32 {
        let hits: usize = self
            .keywords
            .iter()
            .map(|keyword| lowered.matches(keyword).count())
            .sum();
        self.weight * hits as u32
    }
}

/// Path keyword groups in priority order.
pub const PATH_RULES: &[(TestType, &[&str])] = &[
    (
        TestType::E2e,
        &[
            "e2e",
            "end-to-end",
            "endtoend",
            "selenium",
            "cypress",
            "playwright",
            "webdriver",
            "browser",
            "functional",
            "acceptance",
            "system",
        ],
    ),
    (
        TestType::Performance,
        &["performance", "perf", "load", "stress", "benchmark", "bench"],
    ),
    (
        TestType::Integration,
        &[
            "integration",
            "integr",
            "int_test",
            "api_test",
            "service_test",
            "component_test",
            "contract_test",
            "database_test",
            "db_test",
        ],
    ),
    (TestType::Unit, &["unit", "spec", "_test", "test_", ".test.", "tests/"]),
];

/// Content signals for tests that cross component or process boundaries.
pub const INTEGRATION_SIGNALS: &[KeywordGroup] = &[
    KeywordGroup {
        weight: 3,
        keywords: &[
            "database",
            "db_",
            "session",
            "transaction",
            "commit",
            "rollback",
            "sql",
            "query",
            "connection",
            "cursor",
            "migrate",
            "schema",
        ],
    },
    KeywordGroup {
        weight: 2,
        keywords: &[
            "requests.",
            "httpx",
            "aiohttp",
            "urllib",
            "rest",
            "api",
            "client.",
            "service.",
            "endpoint",
            "response.status",
            "json()",
        ],
    },
    KeywordGroup {
        weight: 3,
        keywords: &[
            "redis",
            "mongodb",
            "elasticsearch",
            "rabbitmq",
            "kafka",
            "aws",
            "azure",
            "gcp",
            "s3",
            "sqs",
            "sns",
        ],
    },
    KeywordGroup {
        weight: 1,
        keywords: &[
            "config",
            "settings",
            "environment",
            "env",
            "docker",
            "compose",
            "container",
            "port",
        ],
    },
    KeywordGroup {
        weight: 2,
        keywords: &[
            "integration",
            "end_to_end",
            "workflow",
            "pipeline",
            "multiple",
            "components",
            "services",
        ],
    },
    KeywordGroup {
        weight: 1,
        keywords: &["open(", "file", "path", "directory", "socket", "network"],
    },
];

/// Content signals for browser automation and user journeys.
pub const E2E_SIGNALS: &[KeywordGroup] = &[
    KeywordGroup {
        weight: 5,
        keywords: &[
            "selenium",
            "webdriver",
            "playwright",
            "cypress",
            "puppeteer",
            "browser",
            "headless",
        ],
    },
    KeywordGroup {
        weight: 3,
        keywords: &[
            "find_element",
            "send_keys",
            "click(",
            ".click",
            "driver.get",
            "page.goto",
            "xpath",
            "css_selector",
            "screenshot",
        ],
    },
    KeywordGroup {
        weight: 2,
        keywords: &[
            "user_journey",
            "login",
            "checkout",
            "signup",
            "navigate",
            "user_flow",
        ],
    },
];

/// Content signals for timing, concurrency and resource measurements.
pub const PERFORMANCE_SIGNALS: &[KeywordGroup] = &[KeywordGroup {
    weight: 3,
    keywords: &[
        "timeit",
        "perf_counter",
        "time.time",
        "benchmark",
        "concurrent",
        "threadpool",
        "thread",
        "latency",
        "throughput",
        "memory",
        "duration",
        "stress",
        "load_test",
        "profil",
    ],
}];

/// Content signals for isolated tests.
pub const UNIT_SIGNALS: &[KeywordGroup] = &[
    KeywordGroup {
        weight: 2,
        keywords: &["assert", "mock", "expect(", "should", "equal"],
    },
    KeywordGroup {
        weight: 3,
        keywords: &[
            "mock.",
            "@mock",
            "@patch",
            "mocker",
            "monkeypatch",
            "fixture",
            "@fixture",
        ],
    },
];

/// Stage-two scores of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentScores {
    /// Assertion and isolation signals.
    pub unit: u32,
    /// Database, service and environment signals.
    pub integration: u32,
    /// Browser and journey signals.
    pub e2e: u32,
    /// Timing and concurrency signals.
    pub performance: u32,
}

impl ContentScores {
    /// Score raw content; lower-casing happens here.
    pub fn score(content: &str) -> Self {
        let lowered = content.to_lowercase();
        Self {
            unit: table_score(UNIT_SIGNALS, &lowered),
            integration: table_score(INTEGRATION_SIGNALS, &lowered),
            e2e: table_score(E2E_SIGNALS, &lowered),
            performance: table_score(PERFORMANCE_SIGNALS, &lowered),
        }
    }

    /// Type with the strictly highest score, `Unit` when every score is zero.
    pub fn winner(&self) -> TestType {
        let candidates = [
            (TestType::Unit, self.unit),
            (TestType::Integration, self.integration),
            (TestType::E2e, self.e2e),
            (TestType::Performance, self.performance),
        ];
        let mut best = (TestType::Unit, 0u32);
        for (test_type, score) in candidates {
            if score > best.1 {
                best = (test_type, score);
            }
        }
        best.0
    }
}

fn table_score(table: &[KeywordGroup], lowered: &str) -> u32 {
    table.iter().map(|group| group.score(lowered)).sum()
}

/// Stage one: classify by an already lower-cased relative path.
pub fn classify_by_path(lowered_path: &str) -> Option<TestType> {
    PATH_RULES
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| lowered_path.contains(keyword))
        })
        .map(|(test_type, _)| *test_type)
}

/// Stage two: classify by content alone.
pub fn classify_by_content(content: &str) -> TestType {
    ContentScores::score(content).winner()
}

/// Classify a file whose content is already in memory.
pub fn classify(relative_path: &str, content: &str) -> TestType {
    classify_loaded(relative_path, Some(content))
}

/// Classify a file whose content may have failed to load.
///
/// The path decides when it can. Otherwise missing content yields
/// [`TestType::Unknown`].
pub fn classify_loaded(relative_path: &str, content: Option<&str>) -> TestType {
    classify_by_path(&relative_path.to_lowercase())
        .unwrap_or_else(|| content.map_or(TestType::Unknown, classify_by_content))
}

#[cfg(test)]
mod tests {
    use super::{ContentScores, classify, classify_by_content, classify_by_path, classify_loaded};
    use crate::domain::TestType;

    fn assert_paths(paths: &[&str], expected: TestType) {
        for path in paths {
            assert_eq!(
                classify_by_path(&path.to_lowercase()),
                Some(expected),
                "{path} should classify as {expected}"
            );
        }
    }

    #[test]
    fn integration_paths() {
        assert_paths(
            &[
                "tests/integration/test_api.py",
                "test/integr/test_service.py",
                "tests/int_test_database.py",
                "integration_tests/test_workflow.py",
                "tests/api_test.py",
                "tests/service_test.py",
                "tests/component_test.py",
                "tests/contract_test.py",
                "tests/database_test.py",
                "tests/db_test.py",
            ],
            TestType::Integration,
        );
    }

    #[test]
    fn e2e_paths() {
        assert_paths(
            &[
                "tests/e2e/test_user_journey.py",
                "test/end-to-end/test_checkout.py",
                "tests/endtoend_test.py",
                "e2e_tests/test_selenium.py",
                "tests/cypress/test_ui.py",
                "tests/playwright/test_browser.py",
                "tests/webdriver/test_forms.py",
                "tests/browser/test_navigation.py",
                "tests/functional/test_user_flow.py",
                "tests/acceptance/test_requirements.py",
                "tests/system/test_complete_flow.py",
            ],
            TestType::E2e,
        );
    }

    #[test]
    fn performance_paths() {
        assert_paths(
            &[
                "tests/performance/test_load.py",
                "test/perf/test_api_speed.py",
                "tests/load/test_concurrent.py",
                "tests/stress/test_limits.py",
                "tests/benchmark/test_algorithms.py",
                "tests/bench/test_performance.py",
            ],
            TestType::Performance,
        );
    }

    #[test]
    fn unit_paths() {
        assert_paths(
            &[
                "tests/unit/test_utils.py",
                "test/test_helper.py",
                "tests/spec/test_module.py",
                "tests/test_model.py",
                "src/test_component.py",
                "lib/test_function.py",
                "src/app.test.js",
            ],
            TestType::Unit,
        );
    }

    #[test]
    fn specialised_path_keywords_beat_unit_keywords() {
        assert_eq!(
            classify_by_path("tests/e2e/test_checkout.py"),
            Some(TestType::E2e)
        );
        assert_eq!(
            classify("Tests/Integration/Test_Api.py", ""),
            TestType::Integration
        );
    }

    #[test]
    fn path_without_keywords_falls_through() {
        assert_eq!(classify_by_path("src/checks.py"), None);
    }

    #[test]
    fn helper_path_is_unit_regardless_of_content() {
        let content = "import pytest\ndef test_x(): assert mock.called";
        assert_eq!(classify("src/test_helper.py", content), TestType::Unit);
    }

    #[test]
    fn integration_content_wins() {
        let content = r#"
import pytest
import requests
from database import Session
from sqlalchemy import create_engine

class TestAPIIntegration:
    def test_user_api_with_database(self):
        session = Session()
        response = requests.post('/api/users', json={'name': 'test'})
        assert response.status_code == 201

        user = session.query(User).filter_by(name='test').first()
        assert user is not None
        session.commit()
"#;
        assert_eq!(classify_by_content(content), TestType::Integration);
    }

    #[test]
    fn e2e_content_wins() {
        let content = r#"
from selenium import webdriver
from selenium.webdriver.common.by import By

class TestUserJourney:
    def test_complete_checkout_flow(self):
        driver = webdriver.Chrome()
        driver.get('https://example.com')
        driver.find_element(By.ID, 'username').send_keys('user@test.com')
        driver.find_element(By.ID, 'login-button').click()
        driver.find_element(By.ID, 'checkout').click()
        driver.quit()
"#;
        assert_eq!(classify_by_content(content), TestType::E2e);
    }

    #[test]
    fn performance_content_wins() {
        let content = r#"
import time
import timeit
import concurrent.futures

class TestPerformance:
    def test_api_response_time(self):
        start_time = time.time()
        response = requests.get('/api/users')
        duration = time.time() - start_time
        assert duration < 0.5

    def test_concurrent_load(self):
        with concurrent.futures.ThreadPoolExecutor(max_workers=10) as executor:
            futures = [executor.submit(make_request) for _ in range(100)]
        assert all(f.result().status_code == 200 for f in futures)

    def test_memory_usage(self):
        memory_before = memory_profiler.memory_usage()[0]
        memory_after = memory_profiler.memory_usage()[0]
        assert memory_after - memory_before < 100
"#;
        assert_eq!(classify_by_content(content), TestType::Performance);
    }

    #[test]
    fn unit_content_wins() {
        let content = r#"
import unittest
from unittest.mock import Mock, patch
import pytest

class TestCalculator:
    @patch('calculator.external_service')
    def test_add_numbers(self, mock_service):
        mock_service.return_value = True
        assert Calculator().add(2, 3) == 5

    @pytest.fixture
    def sample_data(self):
        return {'key': 'value'}
"#;
        assert_eq!(classify_by_content(content), TestType::Unit);
    }

    #[test]
    fn empty_signal_defaults_to_unit() {
        assert_eq!(classify_by_content(""), TestType::Unit);
        assert_eq!(classify("src/checks.py", "x = 1\n"), TestType::Unit);
        assert_eq!(ContentScores::score("x = 1"), ContentScores::default());
    }

    #[test]
    fn engineered_tie_resolves_to_one_of_the_tied_types() {
        let scores = ContentScores {
            unit: 0,
            integration: 6,
            e2e: 6,
            performance: 0,
        };
        assert!(matches!(
            scores.winner(),
            TestType::Integration | TestType::E2e
        ));
    }

    #[test]
    fn classification_is_repeatable() {
        let content = "redis kafka assert";
        assert_eq!(classify_by_content(content), classify_by_content(content));
    }

    #[test]
    fn missing_content_is_unknown() {
        assert_eq!(classify_loaded("src/checks.py", None), TestType::Unknown);
        assert_eq!(
            classify_loaded("tests/integration/test_api.py", None),
            TestType::Integration
        );
        assert_eq!(classify_loaded("src/checks.py", Some("")), TestType::Unit);
    }
}
