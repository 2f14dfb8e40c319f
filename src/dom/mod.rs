//! Mutable HTML document model
//!
//! Documents are parsed and serialized by `scraper`/html5ever. On top of
//! its tree this module adds the mutations the anchoring engine needs (text
//! split, wrap, unwrap, attribute edits), index paths, and boundary points
//! with document-order comparison.

mod range;
mod tree;

pub use ego_tree::NodeId;
pub use range::{Boundary, DomRange, OrderIndex, Position};
pub use scraper::Node;
pub use tree::{Document, DomError};

pub(crate) use tree::char_slice;
