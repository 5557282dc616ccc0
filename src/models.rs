//! Core data models for the ingestion pipeline.
//!
//! The walker produces `*Record` values that reference each other through
//! local handles (indices into [`WalkOutput`]). The store turns them into
//! rows and maps handles to row ids as it inserts.

use std::fmt;

/// Index of a [`NodeRecord`] within [`WalkOutput::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub usize);

/// Index of a [`PageRecord`] within [`WalkOutput::pages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(pub usize);

/// A logical section (`div`) of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub parent: Option<NodeHandle>,
    pub xml_id: Option<String>,
    pub div_type: Option<String>,
    pub div_n: Option<String>,
    pub title: Option<String>,
    pub title_ko: Option<String>,
    /// 1-based position among the section children of `parent`.
    pub sibling_order: u32,
    /// Roots are depth 1.
    pub depth: u32,
}

/// A physical page opened by a page-break marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// 1-based, in encounter order.
    pub page_no: u32,
    pub xml_id: Option<String>,
    pub n: Option<String>,
    pub facs: Option<String>,
}

/// Kind of a textual block, stored as its tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    AnonymousBlock,
    Byline,
    Trailer,
    VerseGroup,
}

impl BlockKind {
    /// Paragraph-like kinds keyed by tag. Verse groups are handled separately.
    pub fn paragraph_like(tag: &str) -> Option<Self> {
        match tag {
            "p" => Some(Self::Paragraph),
            "ab" => Some(Self::AnonymousBlock),
            "byline" => Some(Self::Byline),
            "trailer" => Some(Self::Trailer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "p",
            Self::AnonymousBlock => "ab",
            Self::Byline => "byline",
            Self::Trailer => "trailer",
            Self::VerseGroup => "lg",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A textual unit extracted from the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    /// 1-based, document-wide, in encounter order.
    pub order: u32,
    pub kind: BlockKind,
    pub xml_id: Option<String>,
    pub text: String,
    pub text_norm: Option<String>,
    /// Innermost open section when the block was produced.
    pub node: Option<NodeHandle>,
    /// Most recent page break before the block.
    pub page: Option<PageHandle>,
}

/// Everything the walker produced for one document, in production order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutput {
    pub nodes: Vec<NodeRecord>,
    pub pages: Vec<PageRecord>,
    pub blocks: Vec<BlockRecord>,
}

/// Document-level facts written to `source_documents`.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Unique key of the document (corpus-relative path).
    pub path: String,
    /// Lowercase hex SHA-256 of the raw file bytes.
    pub content_hash: String,
    pub header_xml: Option<String>,
}

/// Result of persisting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub document_id: i64,
    /// `true` when an existing row for the path was replaced.
    pub replaced: bool,
    pub sections: usize,
    pub pages: usize,
    pub blocks: usize,
}
