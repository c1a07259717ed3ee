//! Test and source file discovery.

use std::collections::HashSet;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use log::debug;

use crate::domain::{Priority, UncoveredArea};
use crate::error::{CodePulseError, Result};
use crate::fs::RepositorySnapshot;
use crate::profile::{Language, LanguageProfile};

/// Stems that mark a source file as core to the project.
pub const CORE_FILE_INDICATORS: &[&str] = &[
    "main",
    "app",
    "index",
    "server",
    "api",
    "service",
    "controller",
    "model",
];

const CASE_INSENSITIVE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled test-file rules for one language profile.
pub struct TestFileMatcher {
    profile: &'static LanguageProfile,
    patterns: Vec<Pattern>,
}

impl TestFileMatcher {
    /// Compile the profile's filename globs.
    pub fn new(profile: &'static LanguageProfile) -> Result<Self> {
        let patterns = profile
            .test_patterns
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { profile, patterns })
    }

    /// Matcher for a language, `None` when the language has no profile.
    pub fn for_language(language: Language) -> Result<Option<Self>> {
        language.profile().map(Self::new).transpose()
    }

    /// Whether a bare file name matches one of the test globs.
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(file_name, CASE_INSENSITIVE))
    }

    /// Apply both the filename rule and the directory rule.
    pub fn is_test_file(&self, lowered_dir_name: &str, file_name: &str) -> bool {
        if self.matches_name(file_name) {
            return true;
        }
        self.profile.is_test_directory(lowered_dir_name)
            && self.profile.has_source_extension(file_name)
            && !self.profile.is_marker_file(file_name)
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|err| CodePulseError::Pattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

/// Every root-relative test file for `language`, empty when it has no profile.
pub fn find_test_files(
    snapshot: &RepositorySnapshot<'_>,
    language: Language,
) -> Result<Vec<String>> {
    let Some(matcher) = TestFileMatcher::for_language(language)? else {
        debug!("no test profile for {language}");
        return Ok(Vec::new());
    };

    let mut test_files = Vec::new();
    for listing in snapshot.walk() {
        let dir_name = listing.dir_name();
        for file in &listing.files {
            if matcher.is_test_file(&dir_name, file) {
                test_files.push(listing.relative_file(file));
            }
        }
    }
    Ok(test_files)
}

/// Files with a source extension of `language` that are not in `test_files`.
pub fn find_source_files(
    snapshot: &RepositorySnapshot<'_>,
    language: Language,
    test_files: &[String],
) -> Vec<String> {
    let Some(profile) = language.profile() else {
        return Vec::new();
    };
    let tests: HashSet<&str> = test_files.iter().map(String::as_str).collect();

    let mut source_files = Vec::new();
    for listing in snapshot.walk() {
        for file in &listing.files {
            if !profile.has_source_extension(file) {
                continue;
            }
            let relative = listing.relative_file(file);
            if !tests.contains(relative.as_str()) {
                source_files.push(relative);
            }
        }
    }
    source_files
}

/// Source files that have no test whose stem overlaps theirs.
pub fn identify_uncovered_areas(
    source_files: &[String],
    test_files: &[String],
) -> Vec<UncoveredArea> {
    let test_stems: Vec<String> = test_files.iter().map(|file| lowered_stem(file)).collect();

    source_files
        .iter()
        .filter(|source| !has_corresponding_test(source, &test_stems))
        .map(|source| UncoveredArea {
            kind: "missing_test_file".to_string(),
            file: source.clone(),
            description: format!("No test file found for {source}"),
            priority: if is_core_file(source) {
                Priority::High
            } else {
                Priority::Medium
            },
        })
        .collect()
}

fn has_corresponding_test(source_file: &str, test_stems: &[String]) -> bool {
    let source_stem = lowered_stem(source_file);
    test_stems.iter().any(|test_stem| {
        test_stem.contains(&source_stem) || source_stem.contains(test_stem.as_str())
    })
}

/// Whether a file's stem names an entry point or core module.
pub fn is_core_file(path: &str) -> bool {
    let stem = lowered_stem(path);
    CORE_FILE_INDICATORS
        .iter()
        .any(|indicator| stem.contains(indicator))
}

fn lowered_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
