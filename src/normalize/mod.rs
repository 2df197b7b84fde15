//! Format normalizer: heterogeneous backend output → canonical candidates.
//!
//! The vision/markup family of backends produces either HTML `<table>`
//! markup or pipe-delimited markdown, depending on the model and prompt.
//! [`normalize`] auto-detects which and hands off to the matching parser;
//! grid-producing backends go through [`grid::candidate_from_grid`]
//! directly. Whatever the path, the result is the same canonical record and
//! no ragged grid ever escapes.

pub mod grid;
pub mod html;
pub mod markdown;

use crate::model::TableCandidate;

/// Normalize raw markup output from a backend into table candidates.
///
/// Auto-detects HTML by the presence of a `<table` tag; anything else is
/// treated as markdown. Empty or malformed input yields an empty list.
pub fn normalize(raw: &str, page: usize, method: &str) -> Vec<TableCandidate> {
    if raw.contains("<table") {
        html::parse(raw, page, method)
    } else {
        markdown::parse(raw, page, method)
    }
}
