//! Boundary points, ranges and document order
//!
//! A boundary is a `(node, offset)` pair as in the DOM Range model: inside a
//! text node the offset counts chars, inside any other node it counts
//! children.

use std::collections::HashMap;

use ego_tree::iter::Edge;
use ego_tree::NodeId;

use super::tree::Document;

/// A point in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live selection range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl DomRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Range inside a single text node
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self::new(Boundary::new(node, start), Boundary::new(node, end))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Totally ordered document position: pre-order node index, then offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub index: usize,
    pub offset: usize,
}

/// Pre-order numbering of the connected tree.
///
/// Built from an unmodified tree and only valid until the next mutation.
pub struct OrderIndex {
    pre: HashMap<NodeId, usize>,
    subtree_end: HashMap<NodeId, usize>,
}

impl OrderIndex {
    pub fn build(doc: &Document) -> Self {
        let mut pre = HashMap::new();
        let mut subtree_end = HashMap::new();
        let mut counter = 0;

        for edge in doc.tree().root().traverse() {
            match edge {
                Edge::Open(node) => {
                    pre.insert(node.id(), counter);
                    counter += 1;
                }
                Edge::Close(node) => {
                    subtree_end.insert(node.id(), counter);
                }
            }
        }

        Self { pre, subtree_end }
    }

    /// Pre-order index of a connected node
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.pre.get(&node).copied()
    }

    /// Map a boundary onto a comparable position.
    ///
    /// Returns `None` for detached nodes and out-of-range offsets.
    pub fn position(&self, doc: &Document, boundary: Boundary) -> Option<Position> {
        let index = self.index_of(boundary.node)?;
        if boundary.offset > doc.boundary_len(boundary.node) {
            return None;
        }
        if doc.is_text(boundary.node) {
            return Some(Position {
                index,
                offset: boundary.offset,
            });
        }

        // A container boundary sits right before child `offset`, or right
        // after the container's subtree when `offset` equals the child count
        let index = match doc.children(boundary.node).get(boundary.offset) {
            Some(child) => self.index_of(*child)?,
            None => *self.subtree_end.get(&boundary.node)?,
        };
        Some(Position { index, offset: 0 })
    }

    /// Resolve both ends of a range
    pub fn span(&self, doc: &Document, range: &DomRange) -> Option<(Position, Position)> {
        Some((
            self.position(doc, range.start)?,
            self.position(doc, range.end)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_and_text_boundaries_agree() {
        let doc = Document::parse_html("<p>ab<b>cd</b>ef</p>");
        let p = doc.find_by_tag("p")[0];
        let b = doc.find_by_tag("b")[0];
        let cd = doc.children(b)[0];
        let order = OrderIndex::build(&doc);

        // Offset 0 inside <b> is the start of its first text node
        let before_b = order.position(&doc, Boundary::new(p, 1)).unwrap();
        let in_b = order.position(&doc, Boundary::new(b, 0)).unwrap();
        let text_start = order.position(&doc, Boundary::new(cd, 0)).unwrap();
        assert!(before_b < text_start);
        assert_eq!(in_b, text_start);

        let text_end = order.position(&doc, Boundary::new(cd, 2)).unwrap();
        let after_b = order.position(&doc, Boundary::new(b, 1)).unwrap();
        assert!(text_end < after_b);
    }

    #[test]
    fn test_invalid_boundaries() {
        let doc = Document::parse_html("<p>ab</p>");
        let p = doc.find_by_tag("p")[0];
        let text = doc.children(p)[0];
        let order = OrderIndex::build(&doc);

        assert!(order.position(&doc, Boundary::new(text, 3)).is_none());
        assert!(order.position(&doc, Boundary::new(p, 2)).is_none());
    }
}
