//! Per-document persistence.
//!
//! [`replace_document`] is the only write path for ingested content: it
//! upserts the `source_documents` row, clears the document's previous
//! blocks, pages and sections (in that order), and inserts the fresh walk,
//! all inside one transaction. Any error drops the transaction, which rolls
//! the store back to its state before the document was attempted.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::IngestError;
use crate::models::{DocumentInput, StoredDocument, WalkOutput};

/// Replace everything stored for `doc.path` with `walk`.
pub async fn replace_document(
    pool: &SqlitePool,
    doc: &DocumentInput,
    walk: &WalkOutput,
) -> Result<StoredDocument, IngestError> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM source_documents WHERE path = ?")
            .bind(&doc.path)
            .fetch_optional(&mut *tx)
            .await?;

    let (document_id, replaced) = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE source_documents SET content_hash = ?, header_xml = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&doc.content_hash)
            .bind(&doc.header_xml)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            clear_document_records(&mut tx, id).await?;
            (id, true)
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO source_documents (path, content_hash, header_xml, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&doc.path)
            .bind(&doc.content_hash)
            .bind(&doc.header_xml)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            (result.last_insert_rowid(), false)
        }
    };

    let node_ids = insert_nodes(&mut tx, document_id, walk).await?;
    let page_ids = insert_pages(&mut tx, document_id, walk).await?;
    insert_blocks(&mut tx, document_id, walk, &node_ids, &page_ids).await?;

    tx.commit().await?;

    Ok(StoredDocument {
        document_id,
        replaced,
        sections: walk.nodes.len(),
        pages: walk.pages.len(),
        blocks: walk.blocks.len(),
    })
}

/// Delete a document row; its sections, pages and blocks cascade.
///
/// Returns `false` when no document is stored under `path`.
pub async fn remove_document(pool: &SqlitePool, path: &str) -> Result<bool, IngestError> {
    let result = sqlx::query("DELETE FROM source_documents WHERE path = ?")
        .bind(path)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Dependents before parents: blocks reference pages and sections.
async fn clear_document_records(
    conn: &mut SqliteConnection,
    document_id: i64,
) -> Result<(), IngestError> {
    sqlx::query("DELETE FROM text_blocks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM physical_pages WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM structural_nodes WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_nodes(
    conn: &mut SqliteConnection,
    document_id: i64,
    walk: &WalkOutput,
) -> Result<Vec<i64>, IngestError> {
    let mut ids = Vec::with_capacity(walk.nodes.len());
    for node in &walk.nodes {
        let parent_id = node
            .parent
            .map(|h| resolve(&ids, h.0, "section"))
            .transpose()?;
        let result = sqlx::query(
            r#"
            INSERT INTO structural_nodes
                (document_id, parent_id, xml_id, div_type, div_n, title, title_ko, sibling_order, depth)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(parent_id)
        .bind(&node.xml_id)
        .bind(&node.div_type)
        .bind(&node.div_n)
        .bind(&node.title)
        .bind(&node.title_ko)
        .bind(i64::from(node.sibling_order))
        .bind(i64::from(node.depth))
        .execute(&mut *conn)
        .await?;
        ids.push(result.last_insert_rowid());
    }
    Ok(ids)
}

async fn insert_pages(
    conn: &mut SqliteConnection,
    document_id: i64,
    walk: &WalkOutput,
) -> Result<Vec<i64>, IngestError> {
    let mut ids = Vec::with_capacity(walk.pages.len());
    for page in &walk.pages {
        let result = sqlx::query(
            "INSERT INTO physical_pages (document_id, page_no, xml_id, n, facs) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(document_id)
        .bind(i64::from(page.page_no))
        .bind(&page.xml_id)
        .bind(&page.n)
        .bind(&page.facs)
        .execute(&mut *conn)
        .await?;
        ids.push(result.last_insert_rowid());
    }
    Ok(ids)
}

async fn insert_blocks(
    conn: &mut SqliteConnection,
    document_id: i64,
    walk: &WalkOutput,
    node_ids: &[i64],
    page_ids: &[i64],
) -> Result<(), IngestError> {
    for block in &walk.blocks {
        let node_id = block
            .node
            .map(|h| resolve(node_ids, h.0, "section"))
            .transpose()?;
        let page_id = block
            .page
            .map(|h| resolve(page_ids, h.0, "page"))
            .transpose()?;
        sqlx::query(
            r#"
            INSERT INTO text_blocks
                (document_id, node_id, page_id, block_order, kind, xml_id, text, text_norm)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(node_id)
        .bind(page_id)
        .bind(i64::from(block.order))
        .bind(block.kind.as_str())
        .bind(&block.xml_id)
        .bind(&block.text)
        .bind(&block.text_norm)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Map a walk-local handle to the row id inserted for it.
fn resolve(ids: &[i64], index: usize, what: &str) -> Result<i64, IngestError> {
    ids.get(index).copied().ok_or_else(|| {
        IngestError::Constraint(format!("{what} handle {index} refers to an unsaved record"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::migrate::apply_schema;
    use crate::models::{BlockKind, BlockRecord, NodeHandle, NodeRecord, PageHandle, PageRecord};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqlitePool) {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("store.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        apply_schema(&pool).await.unwrap();
        (tmp, pool)
    }

    fn doc(path: &str, hash: &str) -> DocumentInput {
        DocumentInput {
            path: path.to_string(),
            content_hash: hash.to_string(),
            header_xml: Some("<teiHeader/>".to_string()),
        }
    }

    fn node(parent: Option<usize>, order: u32, depth: u32) -> NodeRecord {
        NodeRecord {
            parent: parent.map(NodeHandle),
            xml_id: None,
            div_type: None,
            div_n: None,
            title: None,
            title_ko: None,
            sibling_order: order,
            depth,
        }
    }

    fn block(order: u32, text: &str, node: Option<usize>, page: Option<usize>) -> BlockRecord {
        BlockRecord {
            order,
            kind: BlockKind::Paragraph,
            xml_id: None,
            text: text.to_string(),
            text_norm: Some(text.to_string()),
            node: node.map(NodeHandle),
            page: page.map(PageHandle),
        }
    }

    fn page(no: u32) -> PageRecord {
        PageRecord {
            page_no: no,
            xml_id: None,
            n: None,
            facs: None,
        }
    }

    fn sample_walk() -> WalkOutput {
        WalkOutput {
            nodes: vec![node(None, 1, 1), node(Some(0), 1, 2)],
            pages: vec![page(1)],
            blocks: vec![block(1, "a", Some(1), None), block(2, "b", Some(0), Some(0))],
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn inserts_and_links_records() {
        let (_tmp, pool) = setup().await;
        let stored = replace_document(&pool, &doc("a.xml", "h1"), &sample_walk())
            .await
            .unwrap();
        assert!(!stored.replaced);
        assert_eq!((stored.sections, stored.pages, stored.blocks), (2, 1, 2));

        let parent_depth: (i64, i64) = sqlx::query_as(
            "SELECT c.depth, p.depth FROM structural_nodes c JOIN structural_nodes p ON c.parent_id = p.id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(parent_depth, (2, 1));

        let linked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM text_blocks b JOIN physical_pages p ON b.page_id = p.id WHERE b.text = 'b'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(linked, 1);
    }

    #[tokio::test]
    async fn replace_clears_previous_records_and_updates_hash() {
        let (_tmp, pool) = setup().await;
        replace_document(&pool, &doc("a.xml", "h1"), &sample_walk())
            .await
            .unwrap();

        let smaller = WalkOutput {
            nodes: vec![node(None, 1, 1)],
            pages: vec![],
            blocks: vec![block(1, "only", Some(0), None)],
        };
        let stored = replace_document(&pool, &doc("a.xml", "h2"), &smaller)
            .await
            .unwrap();
        assert!(stored.replaced);

        assert_eq!(count(&pool, "source_documents").await, 1);
        assert_eq!(count(&pool, "structural_nodes").await, 1);
        assert_eq!(count(&pool, "physical_pages").await, 0);
        assert_eq!(count(&pool, "text_blocks").await, 1);

        let hash: String =
            sqlx::query_scalar("SELECT content_hash FROM source_documents WHERE path = 'a.xml'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(hash, "h2");
    }

    #[tokio::test]
    async fn constraint_failure_rolls_back_whole_document() {
        let (_tmp, pool) = setup().await;
        replace_document(&pool, &doc("a.xml", "h1"), &sample_walk())
            .await
            .unwrap();

        let mut broken = sample_walk();
        broken.pages.push(page(1)); // duplicate page number
        let err = replace_document(&pool, &doc("a.xml", "h2"), &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Constraint(_)), "got {err}");

        // Previous version is intact.
        assert_eq!(count(&pool, "structural_nodes").await, 2);
        assert_eq!(count(&pool, "physical_pages").await, 1);
        assert_eq!(count(&pool, "text_blocks").await, 2);
        let hash: String = sqlx::query_scalar("SELECT content_hash FROM source_documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(hash, "h1");
    }

    #[tokio::test]
    async fn failed_first_ingest_leaves_no_document_row() {
        let (_tmp, pool) = setup().await;
        let mut broken = sample_walk();
        broken.blocks[1].xml_id = Some("dup".to_string());
        broken.blocks[0].xml_id = Some("dup".to_string());
        let err = replace_document(&pool, &doc("new.xml", "h"), &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Constraint(_)));
        assert_eq!(count(&pool, "source_documents").await, 0);
        assert_eq!(count(&pool, "structural_nodes").await, 0);
    }

    #[tokio::test]
    async fn dangling_handle_is_rejected() {
        let (_tmp, pool) = setup().await;
        let walk = WalkOutput {
            nodes: vec![],
            pages: vec![],
            blocks: vec![block(1, "x", Some(3), None)],
        };
        let err = replace_document(&pool, &doc("a.xml", "h"), &walk)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Constraint(_)));
        assert_eq!(count(&pool, "source_documents").await, 0);
    }

    #[tokio::test]
    async fn remove_cascades_to_dependents_only_for_that_document() {
        let (_tmp, pool) = setup().await;
        replace_document(&pool, &doc("a.xml", "h1"), &sample_walk())
            .await
            .unwrap();
        replace_document(&pool, &doc("b.xml", "h2"), &sample_walk())
            .await
            .unwrap();

        assert!(remove_document(&pool, "a.xml").await.unwrap());
        assert!(!remove_document(&pool, "a.xml").await.unwrap());

        assert_eq!(count(&pool, "source_documents").await, 1);
        assert_eq!(count(&pool, "structural_nodes").await, 2);
        assert_eq!(count(&pool, "physical_pages").await, 1);
        assert_eq!(count(&pool, "text_blocks").await, 2);
    }

    #[tokio::test]
    async fn deleting_a_page_nulls_block_reference() {
        let (_tmp, pool) = setup().await;
        replace_document(&pool, &doc("a.xml", "h1"), &sample_walk())
            .await
            .unwrap();
        sqlx::query("DELETE FROM physical_pages")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(count(&pool, "text_blocks").await, 2);
        let with_page: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM text_blocks WHERE page_id IS NOT NULL")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(with_page, 0);
    }

    #[tokio::test]
    async fn deleting_a_section_nulls_block_owner() {
        let (_tmp, pool) = setup().await;
        replace_document(&pool, &doc("a.xml", "h1"), &sample_walk())
            .await
            .unwrap();
        sqlx::query("DELETE FROM structural_nodes WHERE depth = 2")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(count(&pool, "structural_nodes").await, 1);
        assert_eq!(count(&pool, "text_blocks").await, 2);
        let orphaned: Option<i64> =
            sqlx::query_scalar("SELECT node_id FROM text_blocks WHERE text = 'a'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(orphaned, None);
        let kept: Option<i64> =
            sqlx::query_scalar("SELECT node_id FROM text_blocks WHERE text = 'b'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(kept.is_some());
    }
}
