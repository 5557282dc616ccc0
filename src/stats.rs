//! Database statistics.
//!
//! Summarises what is stored: document, section, page and block counts,
//! plus a per-document breakdown. Used by `tpk stats`.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::progress::format_number;

/// Store-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub documents: i64,
    pub sections: i64,
    pub pages: i64,
    pub blocks: i64,
}

/// Per-document breakdown row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStats {
    pub path: String,
    pub sections: i64,
    pub pages: i64,
    pub blocks: i64,
    pub updated_at: i64,
}

pub async fn totals(pool: &SqlitePool) -> Result<Totals> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM source_documents) AS documents,
            (SELECT COUNT(*) FROM structural_nodes) AS sections,
            (SELECT COUNT(*) FROM physical_pages) AS pages,
            (SELECT COUNT(*) FROM text_blocks) AS blocks
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(Totals {
        documents: row.get("documents"),
        sections: row.get("sections"),
        pages: row.get("pages"),
        blocks: row.get("blocks"),
    })
}

pub async fn per_document(pool: &SqlitePool) -> Result<Vec<DocumentStats>> {
    let rows = sqlx::query(
        r#"
        SELECT
            d.path,
            d.updated_at,
            (SELECT COUNT(*) FROM structural_nodes n WHERE n.document_id = d.id) AS sections,
            (SELECT COUNT(*) FROM physical_pages p WHERE p.document_id = d.id) AS pages,
            (SELECT COUNT(*) FROM text_blocks b WHERE b.document_id = d.id) AS blocks
        FROM source_documents d
        ORDER BY d.path
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DocumentStats {
            path: row.get("path"),
            sections: row.get("sections"),
            pages: row.get("pages"),
            blocks: row.get("blocks"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let totals = totals(&pool).await?;
    let documents = per_document(&pool).await?;
    pool.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Tripitaka Ingest — Database Stats");
    println!("=================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", format_count(totals.documents));
    println!("  Sections:    {}", format_count(totals.sections));
    println!("  Pages:       {}", format_count(totals.pages));
    println!("  Blocks:      {}", format_count(totals.blocks));

    if !documents.is_empty() {
        println!();
        println!("  By document:");
        println!(
            "  {:<40} {:>8} {:>6} {:>8}   {}",
            "PATH", "SECTIONS", "PAGES", "BLOCKS", "UPDATED"
        );
        println!("  {}", "-".repeat(84));
        for d in &documents {
            println!(
                "  {:<40} {:>8} {:>6} {:>8}   {}",
                d.path,
                d.sections,
                d.pages,
                d.blocks,
                format_ts_iso(d.updated_at)
            );
        }
    }

    println!();
    Ok(())
}

fn format_count(n: i64) -> String {
    format_number(n.max(0) as u64)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_human_readable() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn timestamps_format_as_utc() {
        assert_eq!(format_ts_iso(0), "1970-01-01 00:00");
    }
}
