//! Reading the list of source image locations.
//!
//! The source list is a plain text (CSV-style) file with one location per
//! line: a local path or an `http(s)` URL. Blank lines are skipped and
//! surrounding whitespace is trimmed. Order is preserved; it decides each
//! image's cell in the atlas.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceListError {
    #[error("cannot read source list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("found duplicates in source list: {}", .0.join(", "))]
    Duplicates(Vec<String>),
    #[error("source list {0} contains no image locations")]
    Empty(PathBuf),
}

/// What to do when a location appears more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep every occurrence (with a warning).
    #[default]
    Ignore,
    /// Refuse the list.
    Fail,
    /// Keep only the first occurrence of each location.
    Unique,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "fail" => Ok(Self::Fail),
            "unique" => Ok(Self::Unique),
            other => Err(format!(
                "unknown duplicate policy '{other}' (expected ignore, fail or unique)"
            )),
        }
    }
}

/// Read and de-duplicate the locations listed in `path`.
pub fn read_source_list(
    path: &Path,
    policy: DuplicatePolicy,
) -> Result<Vec<String>, SourceListError> {
    tracing::debug!("reading source list {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| SourceListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let locations = parse_source_list(&content);
    if locations.is_empty() {
        return Err(SourceListError::Empty(path.to_path_buf()));
    }
    tracing::info!("{} images listed in {}", locations.len(), path.display());

    apply_duplicate_policy(locations, policy)
}

/// Split source list text into trimmed, non-empty lines.
pub fn parse_source_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply `policy` to `locations`. Duplicates are reported in first-seen order.
pub fn apply_duplicate_policy(
    locations: Vec<String>,
    policy: DuplicatePolicy,
) -> Result<Vec<String>, SourceListError> {
    let mut seen = HashSet::new();
    let mut uniques = Vec::with_capacity(locations.len());
    let mut dups: Vec<String> = Vec::new();

    for location in &locations {
        if seen.insert(location.as_str()) {
            uniques.push(location.clone());
        } else if !dups.contains(location) {
            dups.push(location.clone());
        }
    }

    if dups.is_empty() {
        return Ok(locations);
    }

    match policy {
        DuplicatePolicy::Fail => Err(SourceListError::Duplicates(dups)),
        DuplicatePolicy::Unique => {
            tracing::warn!(
                "found duplicates in source list: {}; using {} unique entries",
                dups.join(", "),
                uniques.len()
            );
            Ok(uniques)
        }
        DuplicatePolicy::Ignore => {
            tracing::warn!("found duplicates in source list: {}", dups.join(", "));
            Ok(locations)
        }
    }
}
