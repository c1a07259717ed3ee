//! Static per-language rule tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A programming language recognised by extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python sources.
    Python,
    /// JavaScript and TypeScript sources.
    JavaScript,
    /// Java sources.
    Java,
    /// C# sources.
    CSharp,
    /// C++ sources.
    Cpp,
    /// C sources.
    C,
    /// Go sources.
    Go,
    /// Rust sources.
    Rust,
    /// No known extension was found.
    Unknown,
}

impl Language {
    /// Stable lower-case identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::CSharp => "csharp",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Unknown => "unknown",
        }
    }

    /// Test-discovery profile, when the language has one.
    pub fn profile(self) -> Option<&'static LanguageProfile> {
        PROFILES.iter().find(|profile| profile.language == self)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Extension to language mapping, in tie-break order.
pub const EXTENSION_MAP: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("js", Language::JavaScript),
    ("ts", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("tsx", Language::JavaScript),
    ("java", Language::Java),
    ("cs", Language::CSharp),
    ("cpp", Language::Cpp),
    ("c", Language::C),
    ("go", Language::Go),
    ("rs", Language::Rust),
];

/// Look up the language for a bare extension (without the dot), case-insensitively.
pub fn language_for_extension(extension: &str) -> Option<Language> {
    let extension = extension.to_lowercase();
    EXTENSION_MAP
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

/// Immutable test-discovery configuration for one language.
#[derive(Debug)]
pub struct LanguageProfile {
    /// Language the profile applies to.
    pub language: Language,
    /// Filename globs identifying test files, matched case-insensitively.
    pub test_patterns: &'static [&'static str],
    /// Lower-case substrings that mark a directory name as a test directory.
    pub test_directories: &'static [&'static str],
    /// Source extensions including the leading dot.
    pub extensions: &'static [&'static str],
    /// Package/init markers never counted as tests by the directory rule.
    pub marker_files: &'static [&'static str],
}

impl LanguageProfile {
    /// Whether a file name ends with one of the profile's source extensions.
    pub fn has_source_extension(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext))
    }

    /// Whether a lower-cased directory name contains a test-directory substring.
    pub fn is_test_directory(&self, lowered_dir_name: &str) -> bool {
        self.test_directories
            .iter()
            .any(|marker| lowered_dir_name.contains(marker))
    }

    /// Whether a file name is a package/init marker.
    pub fn is_marker_file(&self, file_name: &str) -> bool {
        self.marker_files.iter().any(|marker| *marker == file_name)
    }
}

/// All languages with test-discovery support.
pub static PROFILES: [LanguageProfile; 4] = [
    LanguageProfile {
        language: Language::Python,
        test_patterns: &["test_*.py", "*_test.py", "test*.py"],
        test_directories: &["tests", "test", "testing"],
        extensions: &[".py"],
        marker_files: &["__init__.py"],
    },
    LanguageProfile {
        language: Language::JavaScript,
        test_patterns: &["*.test.js", "*.spec.js", "*.test.ts", "*.spec.ts"],
        test_directories: &["test", "tests", "__tests__", "spec"],
        extensions: &[".js", ".ts", ".jsx", ".tsx"],
        marker_files: &[],
    },
    LanguageProfile {
        language: Language::Java,
        test_patterns: &["*Test.java", "*Tests.java"],
        test_directories: &["test"],
        extensions: &[".java"],
        marker_files: &["package-info.java", "module-info.java"],
    },
    LanguageProfile {
        language: Language::CSharp,
        test_patterns: &["*Test.cs", "*Tests.cs"],
        test_directories: &["tests", "test"],
        extensions: &[".cs"],
        marker_files: &["AssemblyInfo.cs"],
    },
];
