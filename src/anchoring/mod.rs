//! Text anchoring engine
//!
//! Capturing an annotation:
//!
//! 1. `selection::validate` checks the live range before anything changes
//! 2. `segmenter::segment` snapshots the intersected text nodes, then
//!    isolates the selected runs into their own text nodes
//! 3. `marker::MarkWriter::apply` wraps each run in a marker element
//! 4. `codec::encode` turns the runs into an `AnchoredRecord`
//!
//! Re-applying one on load is `restore::RestorationEngine`, which searches
//! the flattened page text (`text_index`) for the stored anchor.

pub mod codec;
pub mod marker;
pub mod restore;
pub mod segmenter;
pub mod selection;
pub mod text_index;

pub use codec::{encode, AnchorExtras, DEFAULT_CONTEXT_CHARS};
pub use marker::{MarkSpec, MarkWriter, MarkerConfig};
pub use restore::{RestorationEngine, RestoreError, RestoreReport, SkippedRecord};
pub use segmenter::{joined_text, plan, segment, PlannedSegment, Segment};
pub use selection::{validate, SelectionContext, SelectionError};
pub use text_index::TextIndex;

/// Elements whose text is never annotated
pub(crate) const NON_CONTENT_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "textarea", "select",
];

/// Elements that start a new block of text
pub(crate) const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "details", "dialog", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "html", "li", "main", "nav", "ol", "p", "pre", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];
