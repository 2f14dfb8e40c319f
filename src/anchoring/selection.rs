//! Selection checks and the current-selection slot

use thiserror::Error;

use crate::dom::{Boundary, Document, DomRange, NodeId, OrderIndex};

use super::NON_CONTENT_ELEMENTS;

const EDITABLE_ELEMENTS: &[&str] = &["input", "textarea", "select"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Selection is collapsed")]
    Collapsed,

    #[error("Selection boundary does not point into the document")]
    InvalidBoundary,

    #[error("Selection ends before it starts")]
    Reversed,

    #[error("Selection is inside an editable field")]
    Editable,

    #[error("Selection is inside a non-content element")]
    NonContent,
}

/// Check a live range before anything in the tree changes
pub fn validate(doc: &Document, range: &DomRange) -> Result<(), SelectionError> {
    for boundary in [range.start, range.end] {
        check_boundary(doc, boundary)?;
    }

    if range.is_collapsed() {
        return Err(SelectionError::Collapsed);
    }

    let order = OrderIndex::build(doc);
    let (start, end) = order
        .span(doc, range)
        .ok_or(SelectionError::InvalidBoundary)?;
    if start > end {
        return Err(SelectionError::Reversed);
    }
    if start == end {
        return Err(SelectionError::Collapsed);
    }

    for boundary in [range.start, range.end] {
        if is_editable(doc, boundary.node) {
            return Err(SelectionError::Editable);
        }
        if in_non_content(doc, boundary.node) {
            return Err(SelectionError::NonContent);
        }
    }

    Ok(())
}

fn check_boundary(doc: &Document, boundary: Boundary) -> Result<(), SelectionError> {
    if !doc.is_connected(boundary.node) {
        return Err(SelectionError::InvalidBoundary);
    }
    if boundary.offset > doc.boundary_len(boundary.node) {
        return Err(SelectionError::InvalidBoundary);
    }
    Ok(())
}

fn is_editable(doc: &Document, node: NodeId) -> bool {
    doc.ancestors(node).any(|n| {
        doc.element(n).map_or(false, |el| {
            EDITABLE_ELEMENTS.contains(&el.name())
                || el
                    .attr("contenteditable")
                    .map_or(false, |v| !v.eq_ignore_ascii_case("false"))
        })
    })
}

fn in_non_content(doc: &Document, node: NodeId) -> bool {
    doc.ancestors(node).any(|n| {
        doc.tag_name(n)
            .map_or(false, |name| NON_CONTENT_ELEMENTS.contains(&name))
    })
}

/// The one selection a pending action works on.
///
/// Saving overwrites; there is never more than one selection in flight.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    range: Option<DomRange>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self, range: DomRange) {
        self.range = Some(range);
    }

    pub fn current(&self) -> Option<DomRange> {
        self.range
    }

    pub fn clear(&mut self) {
        self.range = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_text(doc: &Document, tag: &str) -> NodeId {
        doc.children(doc.find_by_tag(tag)[0])[0]
    }

    #[test]
    fn test_accepts_cross_block_selection() {
        let doc = Document::parse_html("<p>first</p><div>second</div>");
        let a = first_text(&doc, "p");
        let b = first_text(&doc, "div");

        let range = DomRange::new(Boundary::new(a, 2), Boundary::new(b, 3));
        assert_eq!(validate(&doc, &range), Ok(()));
    }

    #[test]
    fn test_rejects_collapsed_and_reversed() {
        let doc = Document::parse_html("<p>first</p><div>second</div>");
        let a = first_text(&doc, "p");
        let b = first_text(&doc, "div");

        assert_eq!(validate(&doc, &DomRange::within(a, 2, 2)), Err(SelectionError::Collapsed));
        assert_eq!(
            validate(&doc, &DomRange::new(Boundary::new(b, 1), Boundary::new(a, 1))),
            Err(SelectionError::Reversed)
        );
        // End of one node and start of the next are different positions
        // but still select nothing
        let p = doc.find_by_tag("p")[0];
        assert_eq!(
            validate(&doc, &DomRange::new(Boundary::new(p, 0), Boundary::new(a, 0))),
            Err(SelectionError::Collapsed)
        );
    }

    #[test]
    fn test_rejects_bad_offsets() {
        let doc = Document::parse_html("<p>first</p>");
        let a = first_text(&doc, "p");

        assert_eq!(
            validate(&doc, &DomRange::within(a, 0, 99)),
            Err(SelectionError::InvalidBoundary)
        );
    }

    #[test]
    fn test_rejects_editable_hosts() {
        let doc = Document::parse_html(
            "<div contenteditable=\"true\">edit me</div><div contenteditable=\"false\">read me</div>",
        );
        let divs = doc.find_by_tag("div");
        let editable = doc.children(divs[0])[0];
        let readonly = doc.children(divs[1])[0];

        assert_eq!(
            validate(&doc, &DomRange::within(editable, 0, 4)),
            Err(SelectionError::Editable)
        );
        assert_eq!(validate(&doc, &DomRange::within(readonly, 0, 4)), Ok(()));
    }

    #[test]
    fn test_rejects_non_content() {
        let doc = Document::parse_html("<p>x</p><script>let a = 1;</script>");
        let code = first_text(&doc, "script");

        assert_eq!(
            validate(&doc, &DomRange::within(code, 0, 3)),
            Err(SelectionError::NonContent)
        );
    }

    #[test]
    fn test_slot_overwrites() {
        let doc = Document::parse_html("<p>first</p>");
        let a = first_text(&doc, "p");
        let mut slot = SelectionContext::new();

        slot.save(DomRange::within(a, 0, 1));
        slot.save(DomRange::within(a, 1, 3));
        assert_eq!(slot.current(), Some(DomRange::within(a, 1, 3)));
        slot.clear();
        assert_eq!(slot.current(), None);
    }
}
