//! Search
//!
//! Two engines produce one result shape. [`GeometrySearch`] scans stored
//! per-item geometry and approximates match positions from average
//! character width. [`LayerSearch`] scans the live text layer and paints
//! exact, span-accurate matches through the highlight painter. Both keep
//! normalized positions so overlays survive zoom changes.

mod geometry;
mod layer;

pub use geometry::{GeometryItem, GeometrySearch, PageGeometry};
pub use layer::LayerSearch;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::NormalizedRect;

/// Longest query accepted for whole-word regex construction.
const MAX_REGEX_QUERY_LEN: usize = 256;

/// Characters pulled in on each side of a match for its context snippet.
pub(crate) const CONTEXT_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

/// One search hit, position normalized to scale 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// 1-based page number.
    pub page_number: usize,
    /// Matched text in original case.
    pub text: String,
    pub position: NormalizedRect,
    /// Sequential index within the search call that produced it.
    pub text_index: usize,
    /// Surrounding text snippet.
    pub context: String,
}

/// Navigation display state, 1-based for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavDisplay {
    pub index: usize,
    pub total: usize,
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Build the whole-word regex for a query, or `None` when the query is
/// unsuitable (empty after trimming, over the length cap, or the built
/// pattern fails to compile). Callers fall back to plain substring
/// matching on `None`.
pub(crate) fn build_whole_word_regex(query: &str, case_sensitive: bool) -> Option<Regex> {
    let trimmed = query.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_REGEX_QUERY_LEN {
        debug!(len = trimmed.len(), "query unsuitable for whole-word regex");
        return None;
    }

    let flags = if case_sensitive { "" } else { "(?i)" };
    // `\b` never matches next to a non-word character, so anchor only the
    // edges that start or end with one ("c++" keeps its leading `\b` but
    // not its trailing one).
    let lead = if trimmed.chars().next().is_some_and(is_word_char) {
        "\\b"
    } else {
        ""
    };
    let trail = if trimmed.chars().next_back().is_some_and(is_word_char) {
        "\\b"
    } else {
        ""
    };
    let pattern = format!("{flags}{lead}{}{trail}", regex::escape(trimmed));
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            debug!(%error, "whole-word pattern rejected");
            None
        }
    }
}

pub(crate) use crate::highlight::matcher::fold_char;

/// Context snippet around a character range.
pub(crate) fn context_around(chars: &[char], start: usize, end: usize) -> String {
    let from = start.saturating_sub(CONTEXT_CHARS);
    let to = (end + CONTEXT_CHARS).min(chars.len());
    chars[from..to].iter().collect()
}
