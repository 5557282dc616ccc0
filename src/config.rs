use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub corpus: Option<CorpusConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub titles: TitlesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}

/// What the batch does after a document fails.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Roll back the failed document and move on to the next one.
    #[default]
    Continue,
    /// Roll back the failed document and stop the run.
    Halt,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub on_error: OnError,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TitlesConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Config for a database path with every optional section defaulted.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            corpus: None,
            ingest: IngestConfig::default(),
            titles: TitlesConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if let Some(corpus) = &config.corpus {
        if corpus.include_globs.is_empty() {
            anyhow::bail!("corpus.include_globs must contain at least one pattern");
        }
    }

    if let Some(titles) = &config.titles.path {
        if !titles.exists() {
            anyhow::bail!("titles.path does not exist: {}", titles.display());
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("tpk.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[db]\npath = \"data/tpk.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.db.path, PathBuf::from("data/tpk.sqlite"));
        assert!(config.corpus.is_none());
        assert_eq!(config.ingest.on_error, OnError::Continue);
        assert!(config.titles.path.is_none());
    }

    #[test]
    fn full_config_parses() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"
[db]
path = "data/tpk.sqlite"

[corpus]
root = "xml"
exclude_globs = ["**/draft/**"]

[ingest]
on_error = "halt"
"#,
        );
        let config = load_config(&path).unwrap();
        let corpus = config.corpus.unwrap();
        assert_eq!(corpus.include_globs, vec!["**/*.xml".to_string()]);
        assert_eq!(corpus.exclude_globs, vec!["**/draft/**".to_string()]);
        assert!(!corpus.follow_symlinks);
        assert_eq!(config.ingest.on_error, OnError::Halt);
    }

    #[test]
    fn unknown_error_policy_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "[db]\npath = \"x.sqlite\"\n[ingest]\non_error = \"retry\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_title_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "[db]\npath = \"x.sqlite\"\n[titles]\npath = \"/nonexistent/titles.toml\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("titles.path"));
    }
}
