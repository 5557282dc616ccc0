use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS source_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            content_hash TEXT NOT NULL,
            header_xml TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS structural_nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            parent_id INTEGER,
            xml_id TEXT,
            div_type TEXT,
            div_n TEXT,
            title TEXT,
            title_ko TEXT,
            sibling_order INTEGER NOT NULL CHECK (sibling_order >= 1),
            depth INTEGER NOT NULL CHECK (depth >= 1),
            UNIQUE(document_id, xml_id),
            UNIQUE(document_id, parent_id, sibling_order),
            FOREIGN KEY (document_id) REFERENCES source_documents(id) ON DELETE CASCADE,
            FOREIGN KEY (parent_id) REFERENCES structural_nodes(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS physical_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            page_no INTEGER NOT NULL CHECK (page_no >= 1),
            xml_id TEXT,
            n TEXT,
            facs TEXT,
            UNIQUE(document_id, page_no),
            UNIQUE(document_id, xml_id),
            FOREIGN KEY (document_id) REFERENCES source_documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS text_blocks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            node_id INTEGER,
            page_id INTEGER,
            block_order INTEGER NOT NULL CHECK (block_order >= 1),
            kind TEXT NOT NULL,
            xml_id TEXT,
            text TEXT NOT NULL,
            text_norm TEXT,
            UNIQUE(document_id, block_order),
            UNIQUE(document_id, xml_id),
            FOREIGN KEY (document_id) REFERENCES source_documents(id) ON DELETE CASCADE,
            FOREIGN KEY (node_id) REFERENCES structural_nodes(id) ON DELETE SET NULL,
            FOREIGN KEY (page_id) REFERENCES physical_pages(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_nodes_document_id ON structural_nodes(document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_parent_id ON structural_nodes(parent_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_document_id ON physical_pages(document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blocks_document_id ON text_blocks(document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blocks_node_id ON text_blocks(node_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blocks_page_id ON text_blocks(page_id)")
        .execute(pool)
        .await?;

    Ok(())
}
