//! Page identity
//!
//! Every piece of stored data about a page is keyed by the SHA-1 hex digest
//! of its URL with the fragment removed.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid page identity: {0}")]
    Invalid(String),
}

/// Content hash of a fragment-less page URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIdentity(String);

impl PageIdentity {
    /// Derive the identity of a page URL
    pub fn from_url(url: &str) -> Self {
        let digest = Sha1::digest(strip_fragment(url).as_bytes());
        Self(hex::encode(digest))
    }

    /// Accept an already computed digest (e.g. from a request path)
    pub fn parse(digest: &str) -> Result<Self, IdentityError> {
        let valid = digest.len() == 40 && digest.bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(IdentityError::Invalid(digest.to_string()));
        }
        Ok(Self(digest.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drop everything from the first `#`
pub fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_does_not_change_identity() {
        let a = PageIdentity::from_url("https://example.com/post?id=3#comments");
        let b = PageIdentity::from_url("https://example.com/post?id=3");

        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 40);
    }

    #[test]
    fn test_known_digest() {
        // sha1("abc")
        assert_eq!(
            PageIdentity::from_url("abc").as_str(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_parse_rejects_non_digest() {
        assert!(PageIdentity::parse("not-a-digest").is_err());
        let id = PageIdentity::from_url("https://example.com/");
        assert_eq!(PageIdentity::parse(id.as_str()).unwrap(), id);
    }
}
