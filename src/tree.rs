//! Order-preserving markup tree.
//!
//! Children are kept as an ordered list of [`Node`]s, never a map keyed by
//! tag name: repeated sibling tags and interleaved text runs keep exactly
//! the order they have in the source. The walker's page, block and sibling
//! counters depend on that order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

use crate::error::IngestError;

/// One child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A tagged element with attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Local tag name (namespace prefix removed).
    pub tag: String,
    /// Attributes keyed by qualified name (`xml:id`, `n`, ...).
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct child elements, in order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// All descendant text, concatenated in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Depth-first search for the first element with `tag`, including `self`.
    pub fn find_first(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.child_elements().find_map(|el| el.find_first(tag))
    }
}

/// Parse decoded document text into its root element.
pub fn parse_document(text: &str) -> Result<Element, IngestError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| parse_error(&reader, e.to_string()))?;
        match event {
            Event::Start(start) => {
                let element = open_element(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start)?;
                attach(&reader, &mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error(&reader, "unexpected closing tag"))?;
                attach(&reader, &mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| parse_error(&reader, e.to_string()))?;
                push_text(&reader, &mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| parse_error(&reader, e.to_string()))?;
                push_text(&reader, &mut stack, text)?;
            }
            Event::Eof => break,
            // Comments, processing instructions, declarations, doctype.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(
            &reader,
            format!("unclosed element <{}>", open.tag),
        ));
    }
    root.ok_or_else(|| parse_error(&reader, "document has no root element"))
}

fn open_element(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, IngestError> {
    let tag = std::str::from_utf8(start.local_name().as_ref())
        .map_err(|e| parse_error(reader, e.to_string()))?
        .to_string();

    let mut attributes = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(reader, e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| parse_error(reader, e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(reader, e.to_string()))?
            .into_owned();
        attributes.insert(key, value);
    }

    Ok(Element {
        tag,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    reader: &Reader<&[u8]>,
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), IngestError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(parse_error(
                reader,
                format!("second root element <{}>", element.tag),
            ))
        }
    }
    Ok(())
}

fn push_text(
    reader: &Reader<&[u8]>,
    stack: &mut [Element],
    text: &str,
) -> Result<(), IngestError> {
    let Some(parent) = stack.last_mut() else {
        // Whitespace around the root element has no parent; anything else is
        // content outside the document.
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(parse_error(reader, "text outside the root element"));
    };
    if text.is_empty() {
        return Ok(());
    }
    if let Some(Node::Text(prev)) = parent.children.last_mut() {
        prev.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
    Ok(())
}

fn parse_error(reader: &Reader<&[u8]>, message: impl Into<String>) -> IngestError {
    IngestError::Parse {
        position: reader.buffer_position() as u64,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(el: &Element) -> Vec<&str> {
        el.child_elements().map(|c| c.tag.as_str()).collect()
    }

    #[test]
    fn keeps_duplicate_siblings_in_order() {
        let root = parse_document("<r><p>1</p><pb/><p>2</p><pb/><p>3</p></r>").unwrap();
        assert_eq!(tags(&root), vec!["p", "pb", "p", "pb", "p"]);
        let texts: Vec<String> = root
            .child_elements()
            .filter(|c| c.tag == "p")
            .map(Element::text_content)
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn keeps_text_runs_between_elements() {
        let root = parse_document("<p>a<hi>b</hi>c</p>").unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[0], Node::Text("a".to_string()));
        assert_eq!(root.children[2], Node::Text("c".to_string()));
        assert_eq!(root.text_content(), "abc");
    }

    #[test]
    fn strips_namespace_prefix_but_keeps_qualified_attributes() {
        let root = parse_document(
            r#"<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0"><tei:div xml:id="d1" n="3"/></tei:TEI>"#,
        )
        .unwrap();
        assert_eq!(root.tag, "TEI");
        let div = root.find_first("div").unwrap();
        assert_eq!(div.attr("xml:id"), Some("d1"));
        assert_eq!(div.attr("n"), Some("3"));
    }

    #[test]
    fn unescapes_entities_and_cdata() {
        let root = parse_document("<p>a &amp; b<![CDATA[ <c> ]]></p>").unwrap();
        assert_eq!(root.text_content(), "a & b <c> ");
    }

    #[test]
    fn drops_comments_and_prolog() {
        let root =
            parse_document("<?xml version=\"1.0\"?>\n<!-- note -->\n<r><!-- x -->y</r>\n").unwrap();
        assert_eq!(root.children, vec![Node::Text("y".to_string())]);
    }

    #[test]
    fn mismatched_end_tag_is_parse_error() {
        let err = parse_document("<r><p>text</q></r>").unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn trailing_text_after_root_is_parse_error() {
        let err =
            parse_document("<TEI><text><p>a</p></text></TEI>stray trailing text").unwrap_err();
        match err {
            IngestError::Parse { message, .. } => {
                assert!(message.contains("outside the root element"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn leading_text_before_root_is_parse_error() {
        let err = parse_document("garbage<TEI><text/></TEI>").unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn whitespace_around_root_is_accepted() {
        let root = parse_document("\n  <r>x</r>\n\n").unwrap();
        assert_eq!(root.text_content(), "x");
    }

    #[test]
    fn unclosed_element_is_parse_error() {
        let err = parse_document("<r><p>text</p>").unwrap_err();
        match err {
            IngestError::Parse { message, .. } => assert!(message.contains("<r>")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_parse_error() {
        assert!(matches!(
            parse_document("   ").unwrap_err(),
            IngestError::Parse { .. }
        ));
    }

    #[test]
    fn find_first_is_depth_first() {
        let root = parse_document("<r><a><text n=\"1\"/></a><text n=\"2\"/></r>").unwrap();
        assert_eq!(root.find_first("text").unwrap().attr("n"), Some("1"));
        assert!(root.find_first("body").is_none());
    }
}
