//! Primary-language detection and line-based language statistics.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use tokei::{Config, LanguageType};

use crate::domain::LanguageDistribution;
use crate::fs::RepositorySnapshot;
use crate::profile::{EXTENSION_MAP, Language, language_for_extension};

/// Return the language with the most files by extension.
///
/// Ties go to the first maximum encountered in [`EXTENSION_MAP`] order.
/// Returns [`Language::Unknown`] when nothing in the tree has a known extension.
pub fn detect_primary_language(snapshot: &RepositorySnapshot<'_>) -> Language {
    let mut counts: Vec<(Language, usize)> = Vec::new();
    for (_, language) in EXTENSION_MAP {
        if !counts.iter().any(|(seen, _)| seen == language) {
            counts.push((*language, 0));
        }
    }

    for listing in snapshot.walk() {
        for file in &listing.files {
            let Some(language) = Path::new(file)
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(language_for_extension)
            else {
                continue;
            };
            if let Some((_, count)) = counts.iter_mut().find(|(seen, _)| *seen == language) {
                *count += 1;
            }
        }
    }

    let mut best = (Language::Unknown, 0usize);
    for (language, count) in counts {
        if count > best.1 {
            best = (language, count);
        }
    }
    debug!("primary language: {}", best.0);
    best.0
}

/// Computes language distribution by line count using `tokei` language tables.
pub struct TokeiInspector {
    config: Config,
    max_file_bytes: u64,
}

impl TokeiInspector {
    /// Create a new inspector with default `tokei` configuration.
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            config: Config::default(),
            max_file_bytes,
        }
    }

    /// Language distribution percentages over every readable file in the snapshot.
    pub fn inspect(&self, snapshot: &RepositorySnapshot<'_>) -> LanguageDistribution {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = 0usize;

        for relative in snapshot.files() {
            let Some(language) = LanguageType::from_path(Path::new(&relative), &self.config)
            else {
                continue;
            };
            let contents = match snapshot.read_bounded(&relative, self.max_file_bytes) {
                Ok(contents) => contents,
                Err(err) => {
                    debug!("skipping {relative} for language stats: {err}");
                    continue;
                }
            };
            let lines = contents.lines().count();
            if lines == 0 {
                continue;
            }
            total += lines;
            *counts.entry(language.to_string()).or_insert(0) += lines;
        }

        if total == 0 {
            return BTreeMap::new();
        }

        counts
            .into_iter()
            .map(|(language, count)| (language, (count as f64 / total as f64) * 100.0))
            .collect()
    }
}
