//! Pre-migration annotation support
//!
//! Old records were stored as child-index paths from the document root. They
//! are still replayed on load and cleared through a geometric overlap test;
//! new records never use this module.

mod overlap;
mod path;

pub use overlap::{compare_paths, LegacyPoint, LegacyRange};
pub use path::{to_dom_range, to_legacy_range, LegacyPathError};
