//! Localized (Korean) title lookup.
//!
//! The walker consults a [`TitleLookup`] once per section. Built-in
//! implementations are [`NoTitles`] and the file-backed [`TitleTable`];
//! any closure with the same shape works too.
//!
//! # Title file format
//!
//! ```toml
//! [by_id]
//! "T01n0001_001" = "장아함경 제1권"
//!
//! [by_section]
//! "juan:1" = "제1권"
//!
//! [by_title]
//! "長阿含經卷第一" = "장아함경 권제1"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::normalize::normalize_text;

/// Resolves a localized title for a section.
///
/// Arguments are the section's stable identifier, type label, number label
/// and extracted title text. Absence of a match is not an error.
pub trait TitleLookup {
    fn lookup(
        &self,
        xml_id: Option<&str>,
        div_type: Option<&str>,
        div_n: Option<&str>,
        title: Option<&str>,
    ) -> Option<String>;
}

/// Lookup that never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTitles;

impl TitleLookup for NoTitles {
    fn lookup(
        &self,
        _xml_id: Option<&str>,
        _div_type: Option<&str>,
        _div_n: Option<&str>,
        _title: Option<&str>,
    ) -> Option<String> {
        None
    }
}

impl<F> TitleLookup for F
where
    F: Fn(Option<&str>, Option<&str>, Option<&str>, Option<&str>) -> Option<String>,
{
    fn lookup(
        &self,
        xml_id: Option<&str>,
        div_type: Option<&str>,
        div_n: Option<&str>,
        title: Option<&str>,
    ) -> Option<String> {
        self(xml_id, div_type, div_n, title)
    }
}

/// Title mapping loaded from a TOML file.
///
/// Precedence: stable identifier, then `"type:n"`, then normalized title
/// text. The first match wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleTable {
    #[serde(default)]
    by_id: HashMap<String, String>,
    #[serde(default)]
    by_section: HashMap<String, String>,
    #[serde(default)]
    by_title: HashMap<String, String>,
}

impl TitleTable {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read title table: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse title table: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: TitleTable = toml::from_str(content)?;
        // Title keys are matched against normalized text.
        let by_title = raw
            .by_title
            .into_iter()
            .filter_map(|(k, v)| normalize_text(&k).map(|k| (k, v)))
            .collect();
        Ok(Self { by_title, ..raw })
    }

    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_section.len() + self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TitleLookup for TitleTable {
    fn lookup(
        &self,
        xml_id: Option<&str>,
        div_type: Option<&str>,
        div_n: Option<&str>,
        title: Option<&str>,
    ) -> Option<String> {
        if let Some(found) = xml_id.and_then(|id| self.by_id.get(id)) {
            return Some(found.clone());
        }
        if let (Some(t), Some(n)) = (div_type, div_n) {
            if let Some(found) = self.by_section.get(&format!("{t}:{n}")) {
                return Some(found.clone());
            }
        }
        title
            .and_then(normalize_text)
            .and_then(|key| self.by_title.get(&key).cloned())
    }
}
