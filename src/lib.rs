//! Marginalia
//!
//! Persistent text anchoring for HTML documents: a selection becomes a set
//! of marker elements and a record that can be stored and put back onto the
//! page after a reload, even when the markup around it has changed.
//!
//! # Modules
//!
//! - `dom`: arena document model with DOM-style ranges
//! - `anchoring`: segmentation, markers, anchor encoding and restoration
//! - `annotations`: stored record types and page identity
//! - `legacy`: path-encoded records kept for old data
//! - `storage`: the annotation store and its SQLite and in-memory tiers
//! - `controller`: per-document actions and the background save queue
//! - `routes`: HTTP surface

pub mod anchoring;
pub mod annotations;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod html;
pub mod legacy;
pub mod routes;
pub mod state;
pub mod storage;
