//! Mutable HTML document
//!
//! A thin layer over the tree `scraper` parses into. Nodes are addressed by
//! `ego_tree` ids, which stay valid across every mutation (splits, wraps,
//! detaches), so ids captured before a batch of edits can be used safely
//! while the edits run. Detached nodes stay in the tree as orphans until the
//! document is dropped.

use ego_tree::{NodeId, NodeRef, Tree};
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{Html, Node, StrTendril};
use thiserror::Error;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Errors raised by tree mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("Node {0:?} is not an element")]
    NotElement(NodeId),

    #[error("Offset {offset} is out of range for node {node:?} (length {len})")]
    OffsetOutOfRange { node: NodeId, offset: usize, len: usize },

    #[error("Node {0:?} has no parent")]
    Detached(NodeId),
}

/// A mutable HTML document
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
        }
    }

    /// Parse a complete HTML document.
    ///
    /// Missing `html`/`head`/`body` elements are synthesized by the parser,
    /// the same way a browser builds its DOM.
    pub fn parse_html(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    pub(crate) fn tree(&self) -> &Tree<Node> {
        &self.html.tree
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    /// The document root
    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    /// Whether `id` belongs to this document, attached or not
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn value(&self, id: NodeId) -> Option<&Node> {
        self.node(id).map(|n| n.value())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|p| p.id())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.value(id)?.as_element()
    }

    /// Tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.value(id)?.as_text().map(|t| &**t)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.value(id).map_or(false, Node::is_text)
    }

    /// Length of a text node in chars, or child count for any other node.
    /// This is the upper bound of a valid boundary offset in `id`.
    pub fn boundary_len(&self, id: NodeId) -> usize {
        match self.node(id) {
            Some(node) => match node.value().as_text() {
                Some(text) => text.chars().count(),
                None => node.children().count(),
            },
            None => 0,
        }
    }

    /// Whether the node is reachable from the root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(id) && self.ancestors(id).last() == Some(self.root())
    }

    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attributes = attrs
            .iter()
            .map(|(k, v)| Attribute {
                name: attr_name(k),
                value: html5ever::tendril::StrTendril::from(*v),
            })
            .collect();
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(name.to_ascii_lowercase()),
        );
        self.html
            .tree
            .orphan(Node::Element(Element::new(name, attributes)))
            .id()
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.html
            .tree
            .orphan(Node::Text(Text {
                text: StrTendril::from(text),
            }))
            .id()
    }

    /// Set an attribute, replacing any existing value in place
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.with_element(id, |el| {
            el.attrs.insert(attr_name(name), StrTendril::from(value));
        })
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        self.with_element(id, |el| el.attrs.shift_remove(&attr_name(name)).map(String::from))
    }

    fn with_element<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Element) -> R) -> Result<R, DomError> {
        let mut node = self.html.tree.get_mut(id).ok_or(DomError::NotElement(id))?;
        match node.value() {
            Node::Element(el) => Ok(f(el)),
            _ => Err(DomError::NotElement(id)),
        }
    }

    /// Remove a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(child) {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(parent) {
            node.append_id(child);
        }
    }

    /// Position of `id` among its parent's children
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id)?;
        node.parent()?;
        Some(node.prev_siblings().count())
    }

    /// Split a text node at a char offset.
    ///
    /// `id` keeps the text before `offset`; the returned node holds the rest
    /// and is inserted as the next sibling.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id))?;
        let len = text.chars().count();
        if offset > len {
            return Err(DomError::OffsetOutOfRange {
                node: id,
                offset,
                len,
            });
        }
        self.parent(id).ok_or(DomError::Detached(id))?;

        let byte = char_to_byte(text, offset);
        let head = StrTendril::from(&text[..byte]);
        let tail = StrTendril::from(&text[byte..]);

        let mut node = self.html.tree.get_mut(id).ok_or(DomError::NotText(id))?;
        if let Node::Text(current) = node.value() {
            current.text = head;
        }
        Ok(node.insert_after(Node::Text(Text { text: tail })).id())
    }

    /// Put `wrapper` where `id` is and move `id` inside it
    pub fn wrap(&mut self, id: NodeId, wrapper: NodeId) -> Result<(), DomError> {
        self.parent(id).ok_or(DomError::Detached(id))?;
        if !self.contains(wrapper) {
            return Err(DomError::NotElement(wrapper));
        }
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.insert_id_before(wrapper);
        }
        if let Some(mut node) = self.html.tree.get_mut(wrapper) {
            node.append_id(id);
        }
        Ok(())
    }

    /// Replace an element by its children
    pub fn unwrap(&mut self, id: NodeId) -> Result<(), DomError> {
        if self.element(id).is_none() {
            return Err(DomError::NotElement(id));
        }
        self.parent(id).ok_or(DomError::Detached(id))?;

        let children = self.children(id);
        if let Some(mut node) = self.html.tree.get_mut(id) {
            for child in children {
                node.insert_id_before(child);
            }
            node.detach();
        }
        Ok(())
    }

    /// Iterate `id` and its ancestors, innermost first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.parent(*n))
    }

    /// Pre-order walk of the subtree rooted at `id`, `id` included
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.descendants())
            .map(|n| n.id())
    }

    /// Concatenated text of every text node below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id).filter_map(|n| self.text(n)).collect()
    }

    /// Connected elements carrying `name="value"`, in document order
    pub fn find_by_attr(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .filter(|n| self.attr(*n, name) == Some(value))
            .collect()
    }

    /// Connected elements with the given tag name, in document order
    pub fn find_by_tag(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .filter(|n| self.tag_name(*n) == Some(name))
            .collect()
    }

    /// Child indices leading from the root to `id`
    pub fn path_from_root(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.child_index(current)?);
            current = parent;
        }
        if current != self.root() {
            return None;
        }
        path.reverse();
        Some(path)
    }

    /// Follow child indices from the root
    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(self.root(), |node, &i| {
            self.node(node)?.children().nth(i).map(|c| c.id())
        })
    }
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

/// Byte index of the `chars`-th char of `s`, clamped to `s.len()`
pub(crate) fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b)
}

/// Substring by char offsets
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let from = char_to_byte(s, start);
    let to = char_to_byte(s, end);
    &s[from..to.max(from)]
}
