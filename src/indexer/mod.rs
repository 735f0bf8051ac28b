//! Site index generation.
//!
//! Walks the blend-data directory and regenerates the static assets the web
//! front end loads up front: a compact per-blend index, sorted metadata value
//! lists, and the record-file manifest.

pub mod abbrev;
pub mod builder;
pub mod types;

pub use builder::{IndexSummary, build_index};
