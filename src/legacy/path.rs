//! Conversion between live ranges and path-encoded legacy ranges

use thiserror::Error;

use crate::dom::{Boundary, Document, DomRange};

use super::overlap::LegacyRange;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LegacyPathError {
    #[error("Path {0:?} no longer resolves")]
    Unresolved(Vec<usize>),

    #[error("Offset {offset} is out of range for the node at {path:?}")]
    OffsetOutOfRange { path: Vec<usize>, offset: usize },
}

/// Encode a live range as root-relative child-index paths
pub fn to_legacy_range(doc: &Document, range: &DomRange) -> Option<LegacyRange> {
    Some(LegacyRange {
        start_container_path: doc.path_from_root(range.start.node)?,
        end_container_path: doc.path_from_root(range.end.node)?,
        start_offset: range.start.offset,
        end_offset: range.end.offset,
    })
}

/// Replay a legacy range against the current tree
pub fn to_dom_range(doc: &Document, range: &LegacyRange) -> Result<DomRange, LegacyPathError> {
    let start = resolve(doc, &range.start_container_path, range.start_offset)?;
    let end = resolve(doc, &range.end_container_path, range.end_offset)?;
    Ok(DomRange::new(start, end))
}

fn resolve(doc: &Document, path: &[usize], offset: usize) -> Result<Boundary, LegacyPathError> {
    let node = doc
        .node_at_path(path)
        .ok_or_else(|| LegacyPathError::Unresolved(path.to_vec()))?;
    if offset > doc.boundary_len(node) {
        return Err(LegacyPathError::OffsetOutOfRange {
            path: path.to_vec(),
            offset,
        });
    }
    Ok(Boundary::new(node, offset))
}
