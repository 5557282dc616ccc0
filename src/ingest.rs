//! Ingestion pipeline orchestration.
//!
//! Per document: read bytes → hash → decode → header → parse → walk →
//! [`replace_document`]. Documents are processed one at a time in key
//! order. A failing document is always rolled back; whether the run then
//! continues is governed by [`OnError`].

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{Config, OnError};
use crate::corpus::{scan_corpus, CorpusFile};
use crate::db;
use crate::decode::decode_document;
use crate::error::{DocumentError, IngestError};
use crate::header::extract_header;
use crate::migrate::apply_schema;
use crate::models::{DocumentInput, WalkOutput};
use crate::progress::{IngestProgressEvent, IngestProgressReporter, ProgressMode};
use crate::store::replace_document;
use crate::titles::{NoTitles, TitleLookup, TitleTable};
use crate::tree::parse_document;
use crate::walker::walk_document;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub on_error: OnError,
    /// Decode, parse and walk without writing to the store.
    pub dry_run: bool,
    pub limit: Option<usize>,
}

/// Totals for one ingest run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents that completed (stored, or walked in a dry run).
    pub documents: usize,
    /// Of those, documents that replaced an earlier version.
    pub replaced: usize,
    pub sections: usize,
    pub pages: usize,
    pub blocks: usize,
    pub failures: Vec<DocumentError>,
    pub elapsed: Duration,
}

/// Run the pure stages for one document: everything except the write.
pub fn prepare_document(
    bytes: &[u8],
    path: &Path,
    key: &str,
    titles: &dyn TitleLookup,
) -> Result<(DocumentInput, WalkOutput), IngestError> {
    let content_hash = format!("{:x}", Sha256::digest(bytes));
    let decoded = decode_document(bytes, path)?;
    let header_xml = extract_header(&decoded.text).map(str::to_string);
    let root = parse_document(&decoded.text)?;
    let walk = walk_document(&root, titles)?;

    let doc = DocumentInput {
        path: key.to_string(),
        content_hash,
        header_xml,
    };
    Ok((doc, walk))
}

/// Ingest a batch of files against an open pool.
///
/// With [`OnError::Continue`] every failure is collected into the report;
/// with [`OnError::Halt`] the first failure is returned and later files
/// are not attempted.
pub async fn ingest_files(
    pool: &SqlitePool,
    files: &[CorpusFile],
    titles: &dyn TitleLookup,
    options: &IngestOptions,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestReport, DocumentError> {
    let started = Instant::now();

    let mut files: Vec<&CorpusFile> = files.iter().collect();
    files.sort_by(|a, b| a.key.cmp(&b.key));
    if let Some(limit) = options.limit {
        files.truncate(limit);
    }

    let total = files.len() as u64;
    progress.report(IngestProgressEvent::Discovered { total });

    let mut report = IngestReport::default();
    for (i, file) in files.into_iter().enumerate() {
        let outcome = ingest_one(pool, file, titles, options.dry_run).await;
        progress.report(IngestProgressEvent::Document {
            key: file.key.clone(),
            n: i as u64 + 1,
            total,
            ok: outcome.is_ok(),
        });

        match outcome {
            Ok(counts) => {
                report.documents += 1;
                report.replaced += usize::from(counts.replaced);
                report.sections += counts.sections;
                report.pages += counts.pages;
                report.blocks += counts.blocks;
            }
            Err(source) => {
                let err = DocumentError::new(&file.path, source);
                tracing::error!(document = %file.key, error = %err.source, "document rolled back");
                match options.on_error {
                    OnError::Halt => return Err(err),
                    OnError::Continue => report.failures.push(err),
                }
            }
        }
    }

    report.elapsed = started.elapsed();
    Ok(report)
}

struct Counts {
    replaced: bool,
    sections: usize,
    pages: usize,
    blocks: usize,
}

async fn ingest_one(
    pool: &SqlitePool,
    file: &CorpusFile,
    titles: &dyn TitleLookup,
    dry_run: bool,
) -> Result<Counts, IngestError> {
    let bytes = tokio::fs::read(&file.path).await?;
    let (doc, walk) = prepare_document(&bytes, &file.path, &file.key, titles)?;

    if dry_run {
        return Ok(Counts {
            replaced: false,
            sections: walk.nodes.len(),
            pages: walk.pages.len(),
            blocks: walk.blocks.len(),
        });
    }

    let stored = replace_document(pool, &doc, &walk).await?;
    tracing::debug!(
        document = %file.key,
        id = stored.document_id,
        replaced = stored.replaced,
        sections = stored.sections,
        pages = stored.pages,
        blocks = stored.blocks,
        "document stored"
    );
    Ok(Counts {
        replaced: stored.replaced,
        sections: stored.sections,
        pages: stored.pages,
        blocks: stored.blocks,
    })
}

/// Load the configured title table, or a lookup that never matches.
pub fn load_titles(config: &Config) -> Result<Box<dyn TitleLookup>> {
    match &config.titles.path {
        Some(path) => {
            let table = TitleTable::load(path)?;
            tracing::debug!(entries = table.len(), path = %path.display(), "title table loaded");
            Ok(Box::new(table))
        }
        None => Ok(Box::new(NoTitles)),
    }
}

/// `tpk ingest`: explicit paths, or the configured corpus when none are given.
pub async fn run_ingest(
    config: &Config,
    paths: Vec<PathBuf>,
    limit: Option<usize>,
    fail_fast: bool,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let files = if paths.is_empty() {
        scan_corpus(config)?
    } else {
        paths.into_iter().map(CorpusFile::from_path).collect()
    };
    let titles = load_titles(config)?;

    let options = IngestOptions {
        on_error: if fail_fast {
            OnError::Halt
        } else {
            config.ingest.on_error
        },
        dry_run,
        limit,
    };

    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;

    let reporter = progress.reporter();
    let result = ingest_files(&pool, &files, titles.as_ref(), &options, reporter.as_ref()).await;
    pool.close().await;

    let report = result.context("ingest halted")?;

    if dry_run {
        println!("ingest (dry-run)");
    } else {
        println!("ingest");
    }
    println!("  documents: {}", report.documents);
    println!("  replaced: {}", report.replaced);
    println!("  sections: {}", report.sections);
    println!("  pages: {}", report.pages);
    println!("  blocks: {}", report.blocks);
    println!("  failed: {}", report.failures.len());
    println!("  elapsed: {:.2}s", report.elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        for failure in &report.failures {
            eprintln!("error: {}", failure);
        }
        bail!(
            "{} of {} documents failed",
            report.failures.len(),
            report.failures.len() + report.documents
        );
    }

    println!("ok");
    Ok(())
}
