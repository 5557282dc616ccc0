//! Document outline retrieval.
//!
//! Reads a stored document's section tree back in document order. Used by
//! the `tpk outline` command.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::config::Config;
use crate::db;

/// One section of a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub depth: i64,
    pub sibling_order: i64,
    pub xml_id: Option<String>,
    pub div_type: Option<String>,
    pub div_n: Option<String>,
    pub title: Option<String>,
    pub title_ko: Option<String>,
    /// Blocks owned directly by this section.
    pub blocks: i64,
    /// Dotted sibling-order path, e.g. `2.1.3`.
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct DocumentOutline {
    pub path: String,
    pub content_hash: String,
    pub updated_at: i64,
    pub pages: i64,
    pub blocks: i64,
    /// Pre-order, siblings by `sibling_order`.
    pub sections: Vec<OutlineSection>,
}

pub async fn get_outline(pool: &SqlitePool, path: &str) -> Result<Option<DocumentOutline>> {
    let doc_row = sqlx::query(
        r#"
        SELECT
            d.id, d.path, d.content_hash, d.updated_at,
            (SELECT COUNT(*) FROM physical_pages p WHERE p.document_id = d.id) AS pages,
            (SELECT COUNT(*) FROM text_blocks b WHERE b.document_id = d.id) AS blocks
        FROM source_documents d
        WHERE d.path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;

    let Some(doc_row) = doc_row else {
        return Ok(None);
    };
    let document_id: i64 = doc_row.get("id");

    let rows = sqlx::query(
        r#"
        SELECT n.id, n.parent_id, n.depth, n.sibling_order, n.xml_id, n.div_type, n.div_n,
               n.title, n.title_ko,
               (SELECT COUNT(*) FROM text_blocks b WHERE b.node_id = n.id) AS blocks
        FROM structural_nodes n
        WHERE n.document_id = ?
        ORDER BY n.sibling_order
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    let mut children: HashMap<Option<i64>, Vec<OutlineSection>> = HashMap::new();
    for row in &rows {
        let section = OutlineSection {
            id: row.get("id"),
            parent_id: row.get("parent_id"),
            depth: row.get("depth"),
            sibling_order: row.get("sibling_order"),
            xml_id: row.get("xml_id"),
            div_type: row.get("div_type"),
            div_n: row.get("div_n"),
            title: row.get("title"),
            title_ko: row.get("title_ko"),
            blocks: row.get("blocks"),
            label: String::new(),
        };
        children.entry(section.parent_id).or_default().push(section);
    }

    let mut sections = Vec::with_capacity(rows.len());
    flatten(&mut children, None, "", &mut sections);

    Ok(Some(DocumentOutline {
        path: doc_row.get("path"),
        content_hash: doc_row.get("content_hash"),
        updated_at: doc_row.get("updated_at"),
        pages: doc_row.get("pages"),
        blocks: doc_row.get("blocks"),
        sections,
    }))
}

fn flatten(
    children: &mut HashMap<Option<i64>, Vec<OutlineSection>>,
    parent: Option<i64>,
    prefix: &str,
    out: &mut Vec<OutlineSection>,
) {
    let Some(siblings) = children.remove(&parent) else {
        return;
    };
    for mut section in siblings {
        section.label = if prefix.is_empty() {
            section.sibling_order.to_string()
        } else {
            format!("{}.{}", prefix, section.sibling_order)
        };
        let id = section.id;
        let label = section.label.clone();
        out.push(section);
        flatten(children, Some(id), &label, out);
    }
}

/// `tpk outline <path>`: print the section tree of a stored document.
pub async fn run_outline(config: &Config, path: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let outline = get_outline(&pool, path).await?;
    pool.close().await;

    let Some(outline) = outline else {
        bail!("document not found: {}", path);
    };

    println!("{}", outline.path);
    println!("  hash: {}", outline.content_hash);
    println!(
        "  sections: {}  pages: {}  blocks: {}",
        outline.sections.len(),
        outline.pages,
        outline.blocks
    );
    println!();

    for s in &outline.sections {
        let indent = "  ".repeat((s.depth.max(1) - 1) as usize);
        let kind = match (&s.div_type, &s.div_n) {
            (Some(t), Some(n)) => format!("{} {}", t, n),
            (Some(t), None) => t.clone(),
            (None, Some(n)) => n.clone(),
            (None, None) => "-".to_string(),
        };
        let title = match (&s.title, &s.title_ko) {
            (Some(t), Some(ko)) => format!("  {} ({})", t, ko),
            (Some(t), None) => format!("  {}", t),
            (None, Some(ko)) => format!("  ({})", ko),
            (None, None) => String::new(),
        };
        println!(
            "{}{} [{}]{}  {} blocks",
            indent, s.label, kind, title, s.blocks
        );
    }

    Ok(())
}
