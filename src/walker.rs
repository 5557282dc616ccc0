//! Structural classification of a parsed TEI tree.
//!
//! The walker descends from the `<text>` element and turns structurally
//! significant tags into records:
//!
//! | Tag | Record |
//! |-----|--------|
//! | `pb` | [`PageRecord`], becomes the active page |
//! | `div`, `div1`..`div7` | [`NodeRecord`], pushed while its children are walked |
//! | `p`, `ab`, `byline`, `trailer` | [`BlockRecord`] of that kind |
//! | `lg` | [`BlockRecord`] of kind `lg`, lines joined with `\n` |
//! | `head` | consumed by its section, ignored elsewhere |
//! | anything else | walked through transparently |
//!
//! All running state lives in a [`WalkContext`] owned by one call to
//! [`walk_document`].

use crate::error::IngestError;
use crate::models::{
    BlockKind, BlockRecord, NodeHandle, NodeRecord, PageHandle, PageRecord, WalkOutput,
};
use crate::normalize::normalize_text;
use crate::titles::TitleLookup;
use crate::tree::{Element, Node};

const BODY_CONTAINER: &str = "text";
const PAGE_BREAK: &str = "pb";
const TITLE: &str = "head";
const VERSE_GROUP: &str = "lg";
const VERSE_LINE: &str = "l";

/// Joins multiple `head` elements of one section.
pub const TITLE_SEPARATOR: &str = " / ";

fn is_section(tag: &str) -> bool {
    match tag.strip_prefix("div") {
        Some("") => true,
        Some(level) => matches!(level, "1" | "2" | "3" | "4" | "5" | "6" | "7"),
        None => false,
    }
}

/// Walk a parsed document and classify its structure.
///
/// Fails with [`IngestError::Structure`] when the document has no `<text>`.
pub fn walk_document(root: &Element, titles: &dyn TitleLookup) -> Result<WalkOutput, IngestError> {
    let body = root
        .find_first(BODY_CONTAINER)
        .ok_or_else(|| IngestError::Structure(BODY_CONTAINER.to_string()))?;

    let mut ctx = WalkContext::new(titles);
    ctx.walk_children(body);

    tracing::trace!(
        sections = ctx.out.nodes.len(),
        pages = ctx.out.pages.len(),
        blocks = ctx.out.blocks.len(),
        "walk finished"
    );
    Ok(ctx.out)
}

struct OpenSection {
    handle: NodeHandle,
    /// Section children produced so far.
    children: u32,
}

/// Running state of one walk.
struct WalkContext<'a> {
    titles: &'a dyn TitleLookup,
    /// Innermost last.
    open: Vec<OpenSection>,
    root_children: u32,
    page_no: u32,
    block_order: u32,
    active_page: Option<PageHandle>,
    out: WalkOutput,
}

impl<'a> WalkContext<'a> {
    fn new(titles: &'a dyn TitleLookup) -> Self {
        Self {
            titles,
            open: Vec::new(),
            root_children: 0,
            page_no: 0,
            block_order: 0,
            active_page: None,
            out: WalkOutput::default(),
        }
    }

    fn walk_children(&mut self, el: &Element) {
        for child in &el.children {
            if let Node::Element(child) = child {
                self.visit(child);
            }
        }
    }

    fn visit(&mut self, el: &Element) {
        match el.tag.as_str() {
            PAGE_BREAK => self.page_break(el),
            tag if is_section(tag) => self.section(el),
            VERSE_GROUP => self.verse_group(el),
            TITLE => {}
            tag => match BlockKind::paragraph_like(tag) {
                Some(kind) => self.paragraph(el, kind),
                None => self.walk_children(el),
            },
        }
    }

    fn page_break(&mut self, el: &Element) {
        self.page_no += 1;
        let handle = PageHandle(self.out.pages.len());
        self.out.pages.push(PageRecord {
            page_no: self.page_no,
            xml_id: owned_attr(el, "xml:id"),
            n: owned_attr(el, "n"),
            facs: owned_attr(el, "facs"),
        });
        self.active_page = Some(handle);
    }

    fn section(&mut self, el: &Element) {
        let xml_id = owned_attr(el, "xml:id");
        let div_type = owned_attr(el, "type");
        let div_n = owned_attr(el, "n");
        let title = section_title(el);
        let title_ko = self.titles.lookup(
            xml_id.as_deref(),
            div_type.as_deref(),
            div_n.as_deref(),
            title.as_deref(),
        );

        let sibling_order = self.next_sibling_order();
        let handle = NodeHandle(self.out.nodes.len());
        self.out.nodes.push(NodeRecord {
            parent: self.open.last().map(|s| s.handle),
            xml_id,
            div_type,
            div_n,
            title,
            title_ko,
            sibling_order,
            depth: self.open.len() as u32 + 1,
        });

        self.open.push(OpenSection {
            handle,
            children: 0,
        });
        for child in &el.children {
            match child {
                Node::Element(child) if child.tag != TITLE => self.visit(child),
                _ => {}
            }
        }
        self.open.pop();
    }

    fn paragraph(&mut self, el: &Element, kind: BlockKind) {
        let text = el.text_content();
        let text = text.trim_end();
        if text.is_empty() {
            return;
        }
        self.push_block(el, kind, text.to_string());
    }

    fn verse_group(&mut self, el: &Element) {
        let lines: Vec<String> = el
            .child_elements()
            .filter(|child| child.tag == VERSE_LINE)
            .map(|line| line.text_content().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        let text = if lines.is_empty() {
            el.text_content().trim().to_string()
        } else {
            lines.join("\n")
        };
        if text.is_empty() {
            return;
        }
        self.push_block(el, BlockKind::VerseGroup, text);
    }

    fn push_block(&mut self, el: &Element, kind: BlockKind, text: String) {
        self.block_order += 1;
        self.out.blocks.push(BlockRecord {
            order: self.block_order,
            kind,
            xml_id: owned_attr(el, "xml:id"),
            text_norm: normalize_text(&text),
            text,
            node: self.open.last().map(|s| s.handle),
            page: self.active_page,
        });
    }

    fn next_sibling_order(&mut self) -> u32 {
        let counter = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root_children,
        };
        *counter += 1;
        *counter
    }
}

fn owned_attr(el: &Element, name: &str) -> Option<String> {
    el.attr(name).map(str::to_string)
}

/// Texts of the direct `head` children, trimmed and joined.
fn section_title(el: &Element) -> Option<String> {
    let heads: Vec<String> = el
        .child_elements()
        .filter(|child| child.tag == TITLE)
        .map(|head| head.text_content().trim().to_string())
        .filter(|head| !head.is_empty())
        .collect();
    if heads.is_empty() {
        None
    } else {
        Some(heads.join(TITLE_SEPARATOR))
    }
}
