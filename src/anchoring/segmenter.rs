//! Range segmentation
//!
//! A selection can cross any number of element boundaries. It is broken into
//! one run per text node in two phases:
//!
//! - [`plan`] reads an unmodified tree and decides every run up front
//! - [`segment`] then splits the first and last text nodes so each run sits
//!   alone in its own text node
//!
//! Deciding before mutating keeps the walk independent of the splits it
//! causes.

use crate::dom::{char_slice, Document, DomError, DomRange, NodeId, OrderIndex, Position};

use super::text_index::content_text_nodes;

/// A run decided by [`plan`], not yet isolated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSegment {
    pub node: NodeId,
    /// Char offsets into `node`
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// An isolated run: `node` contains exactly `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub node: NodeId,
    /// Char offsets into the text node the run was cut from
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Decide the runs covered by `range` without touching the tree.
///
/// Only content text nodes take part (see [`content_text_nodes`]). An
/// unresolvable, collapsed or reversed range yields no runs, and so does a
/// range that covers nothing but whitespace.
pub fn plan(doc: &Document, range: &DomRange) -> Vec<PlannedSegment> {
    let order = OrderIndex::build(doc);
    let Some((start, end)) = order.span(doc, range) else {
        return Vec::new();
    };
    if start >= end {
        return Vec::new();
    }

    let mut planned = Vec::new();
    for node in content_text_nodes(doc) {
        let (Some(index), Some(text)) = (order.index_of(node), doc.text(node)) else {
            continue;
        };
        let len = text.chars().count();

        if (Position { index, offset: len }) <= start {
            continue;
        }
        if (Position { index, offset: 0 }) >= end {
            break;
        }
        let from = if start.index == index { start.offset } else { 0 };
        let to = if end.index == index { end.offset } else { len };
        if from >= to {
            continue;
        }

        planned.push(PlannedSegment {
            node,
            start: from,
            end: to,
            text: char_slice(text, from, to).to_string(),
        });
    }

    // Inline separators count as text, but never on their own
    if planned.iter().all(|run| run.text.trim().is_empty()) {
        return Vec::new();
    }
    planned
}

/// Plan, then isolate every run into its own text node
pub fn segment(doc: &mut Document, range: &DomRange) -> Result<Vec<Segment>, DomError> {
    let planned = plan(doc, range);
    let mut segments = Vec::with_capacity(planned.len());

    for run in planned {
        let mut node = run.node;
        if run.end < doc.boundary_len(node) {
            doc.split_text(node, run.end)?;
        }
        if run.start > 0 {
            node = doc.split_text(node, run.start)?;
        }
        segments.push(Segment {
            node,
            start: run.start,
            end: run.end,
            text: run.text,
        });
    }

    Ok(segments)
}

/// Concatenated text of a list of runs
pub fn joined_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}
