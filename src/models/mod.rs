//! Domain models for mindgraph.
//!
//! - [`Node`]: a tree element with a display label and ordered children;
//!   the unit everything else operates on.
//! - `map`: raw remote documents — legacy shape normalization and display
//!   names. Remote documents are opaque JSON until they pass through
//!   [`map::normalize_document`].

pub mod map;
mod node;

pub use node::{all_ids, filter_matches, focus_set, Node};
