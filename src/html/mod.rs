//! HTML processing module
//!
//! Streaming clean-up of submitted pages before they are parsed.

mod sanitize;

pub use sanitize::{sanitize_html, SanitizeError};
