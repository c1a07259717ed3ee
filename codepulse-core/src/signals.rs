//! Framework and characteristic detection for test files.

use std::collections::BTreeSet;

use crate::domain::TestCharacteristic;

/// Framework name and the case-sensitive markers that reveal it.
pub const FRAMEWORK_MARKERS: &[(&str, &[&str])] = &[
    ("pytest", &["import pytest", "from pytest"]),
    ("unittest", &["import unittest", "from unittest"]),
    ("nose", &["import nose"]),
    ("jest/mocha", &["describe(", "it("]),
    ("junit", &["@Test"]),
    ("nunit/mstest", &["[Test]", "[TestMethod]"]),
];

/// Characteristic tags and the lower-case markers that reveal them.
pub const CHARACTERISTIC_MARKERS: &[(TestCharacteristic, &[&str])] = &[
    (
        TestCharacteristic::UsesMocking,
        &["mock", "@patch", "monkeypatch", "stub", "spy", "jest.fn"],
    ),
    (
        TestCharacteristic::ApiInteraction,
        &[
            "requests.",
            "httpx",
            "aiohttp",
            "fetch(",
            "axios",
            "response.status",
            "/api/",
        ],
    ),
    (
        TestCharacteristic::DatabaseInteraction,
        &[
            "sqlite3",
            "database",
            "session.",
            "cursor",
            "sqlalchemy",
            ".query(",
            "db.",
        ],
    ),
    (
        TestCharacteristic::AsyncTesting,
        &["async ", "await ", "asyncio", "@pytest.mark.asyncio"],
    ),
    (
        TestCharacteristic::ParameterizedTests,
        &[
            "parametrize",
            "parameterized",
            "test.each",
            "@theory",
            "[testcase",
        ],
    ),
    (
        TestCharacteristic::UsesFixtures,
        &["fixture", "setup(", "setupclass", "beforeeach", "@before"],
    ),
    (
        TestCharacteristic::FileIo,
        &["open(", "tempfile", "tmp_path", "readfile", "writefile"],
    ),
    (
        TestCharacteristic::TimingSensitive,
        &[
            "time.sleep",
            "settimeout",
            "thread.sleep",
            "timeit",
            "perf_counter",
        ],
    ),
];

/// Frameworks referenced by raw content.
pub fn detect_frameworks(content: &str) -> BTreeSet<String> {
    FRAMEWORK_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|marker| content.contains(marker)))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Characteristic tags present in raw content.
pub fn analyze_characteristics(content: &str) -> BTreeSet<TestCharacteristic> {
    let lowered = content.to_lowercase();
    CHARACTERISTIC_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|marker| lowered.contains(marker)))
        .map(|(tag, _)| *tag)
        .collect()
}
