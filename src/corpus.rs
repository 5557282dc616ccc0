//! Corpus file enumeration.
//!
//! Walks `corpus.root`, applies include/exclude globs, and returns files
//! sorted by their corpus-relative path, which is also the document key.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// A file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub path: PathBuf,
    /// Unique key stored as `source_documents.path`.
    pub key: String,
}

impl CorpusFile {
    /// A file named explicitly (outside the corpus walk), keyed by the path as given.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = path.to_string_lossy().to_string();
        Self { path, key }
    }
}

pub fn scan_corpus(config: &Config) -> Result<Vec<CorpusFile>> {
    let corpus = config
        .corpus
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Corpus not configured (missing [corpus] section)"))?;

    let root = &corpus.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&corpus.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/target/**".to_string()];
    default_excludes.extend(corpus.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(corpus.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let key = relative_key(relative);

        if exclude_set.is_match(&key) {
            continue;
        }
        if !include_set.is_match(&key) {
            continue;
        }

        files.push(CorpusFile {
            path: path.to_path_buf(),
            key,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(files)
}

/// Forward-slash key so the same corpus gets the same keys on every platform.
fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
