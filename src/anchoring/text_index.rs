//! Flattened page text
//!
//! Concatenates every content text node in document order and maps flat char
//! offsets back to `(text node, offset)` boundaries. Splitting text nodes or
//! wrapping them in markers never changes the flattened text, which is what
//! makes it usable as a stable search space across edits.

use crate::dom::{Boundary, Document, DomRange, Node, NodeId};

use super::{BLOCK_ELEMENTS, NON_CONTENT_ELEMENTS};

#[derive(Debug, Clone, Copy)]
struct TextSpan {
    node: NodeId,
    start: usize,
    len: usize,
}

impl TextSpan {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Search index over the content text of a document.
///
/// Only valid until the next tree mutation.
#[derive(Debug, Clone)]
pub struct TextIndex {
    chars: Vec<char>,
    spans: Vec<TextSpan>,
}

impl TextIndex {
    pub fn build(doc: &Document) -> Self {
        let mut chars = Vec::new();
        let mut spans = Vec::new();

        for node in content_text_nodes(doc) {
            let Some(text) = doc.text(node) else {
                continue;
            };
            let start = chars.len();
            chars.extend(text.chars());
            let len = chars.len() - start;
            if len > 0 {
                spans.push(TextSpan { node, start, len });
            }
        }

        Self { chars, spans }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Flat offset of the first char of `node`
    pub fn offset_of(&self, node: NodeId) -> Option<usize> {
        self.spans.iter().find(|s| s.node == node).map(|s| s.start)
    }

    /// Start offsets of every occurrence of `needle`, overlapping ones included
    pub fn find_all(&self, needle: &str) -> Vec<usize> {
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() || needle.len() > self.chars.len() {
            return Vec::new();
        }
        self.chars
            .windows(needle.len())
            .enumerate()
            .filter(|(_, window)| *window == needle.as_slice())
            .map(|(i, _)| i)
            .collect()
    }

    /// Up to `n` chars ending right before `at`
    pub fn preceding(&self, at: usize, n: usize) -> String {
        let end = at.min(self.chars.len());
        let start = end.saturating_sub(n);
        self.chars[start..end].iter().collect()
    }

    /// Up to `n` chars starting at `at`
    pub fn following(&self, at: usize, n: usize) -> String {
        let start = at.min(self.chars.len());
        let end = (start + n).min(self.chars.len());
        self.chars[start..end].iter().collect()
    }

    /// Live range covering flat offsets `start..end`
    pub fn range(&self, start: usize, end: usize) -> Option<DomRange> {
        if start >= end || end > self.chars.len() {
            return None;
        }

        let first = self.spans.partition_point(|s| s.end() <= start);
        let first = self.spans.get(first).filter(|s| s.start <= start)?;

        let last = self.spans.partition_point(|s| s.end() < end);
        let last = self.spans.get(last).filter(|s| s.start < end)?;

        Some(DomRange::new(
            Boundary::new(first.node, start - first.start),
            Boundary::new(last.node, end - last.start),
        ))
    }
}

/// Text nodes that carry page text, in document order.
///
/// Text inside non-content elements is left out, and so is whitespace that
/// only pads or separates blocks.
pub fn content_text_nodes(doc: &Document) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![doc.root()];

    while let Some(node) = stack.pop() {
        match doc.value(node) {
            Some(Node::Text(text)) => {
                if !is_block_whitespace(doc, node, text) {
                    out.push(node);
                }
            }
            Some(Node::Element(el)) if NON_CONTENT_ELEMENTS.contains(&el.name()) => {}
            _ => stack.extend(doc.children(node).into_iter().rev()),
        }
    }

    out
}

/// Whitespace-only text that is not flanked by inline content on both
/// sides. The space in `<b>quick</b> <i>brown</i>` is content; the newline
/// between two paragraphs is not.
fn is_block_whitespace(doc: &Document, node: NodeId, text: &str) -> bool {
    if !text.chars().all(char::is_whitespace) {
        return false;
    }
    if doc.ancestors(node).any(|n| doc.tag_name(n) == Some("pre")) {
        return false;
    }
    let Some(parent) = doc.parent(node) else {
        return true;
    };

    let siblings = doc.children(parent);
    let Some(at) = siblings.iter().position(|s| *s == node) else {
        return true;
    };
    let before = siblings[..at].iter().rev().find(|s| !is_comment(doc, **s));
    let after = siblings[at + 1..].iter().find(|s| !is_comment(doc, **s));

    !(before.map_or(false, |s| is_inline(doc, *s)) && after.map_or(false, |s| is_inline(doc, *s)))
}

fn is_comment(doc: &Document, node: NodeId) -> bool {
    matches!(doc.value(node), Some(Node::Comment(_)))
}

fn is_inline(doc: &Document, node: NodeId) -> bool {
    match doc.value(node) {
        Some(Node::Text(_)) => true,
        Some(Node::Element(el)) => {
            !BLOCK_ELEMENTS.contains(&el.name()) && !NON_CONTENT_ELEMENTS.contains(&el.name())
        }
        _ => false,
    }
}
