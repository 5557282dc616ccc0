//! # Tripitaka Ingest CLI (`tpk`)
//!
//! ## Usage
//!
//! ```bash
//! tpk --config ./config/tpk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tpk init` | Create the SQLite database and run schema migrations |
//! | `tpk ingest [PATHS...]` | Ingest files, or the configured corpus when no paths are given |
//! | `tpk outline <PATH>` | Print the section tree of a stored document |
//! | `tpk remove <PATH>` | Delete a stored document and all of its records |
//! | `tpk stats` | Show stored document, section, page and block counts |
//!
//! Set `RUST_LOG=tripitaka_ingest=debug` for per-document diagnostics.

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tripitaka_ingest::progress::ProgressMode;
use tripitaka_ingest::{config, db, ingest, migrate, outline, stats, store};

/// Tripitaka Ingest — structural ingestion of TEI canonical texts into SQLite.
#[derive(Parser)]
#[command(
    name = "tpk",
    about = "Tripitaka Ingest — structural ingestion of TEI canonical texts into SQLite",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tpk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all tables. Idempotent.
    Init,

    /// Ingest TEI documents.
    ///
    /// Each document is replaced as a whole inside one transaction. A failed
    /// document is rolled back; by default the run continues with the next
    /// one and exits non-zero at the end.
    Ingest {
        /// Files to ingest. When omitted, the `[corpus]` section is scanned.
        paths: Vec<PathBuf>,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Stop at the first failing document.
        #[arg(long)]
        fail_fast: bool,

        /// Decode, parse and classify without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr: `off`, `human` or `json`. Defaults to `human` on a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print the section tree of a stored document.
    Outline {
        /// Document key as stored (corpus-relative path or the path given to `ingest`).
        path: String,
    },

    /// Delete a stored document; its sections, pages and blocks go with it.
    Remove {
        /// Document key as stored.
        path: String,
    },

    /// Show database statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            paths,
            limit,
            fail_fast,
            dry_run,
            progress,
        } => {
            let mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some(s) => match ProgressMode::parse(s) {
                    Some(mode) => mode,
                    None => bail!("Unknown progress mode: '{}'. Use off, human, or json.", s),
                },
            };
            ingest::run_ingest(&cfg, paths, limit, fail_fast, dry_run, mode).await?;
        }
        Commands::Outline { path } => {
            outline::run_outline(&cfg, &path).await?;
        }
        Commands::Remove { path } => {
            let pool = db::connect(&cfg).await?;
            let removed = store::remove_document(&pool, &path).await;
            pool.close().await;
            if !removed? {
                bail!("document not found: {}", path);
            }
            println!("removed {}", path);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
