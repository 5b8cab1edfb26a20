//! Text matching over a layer
//!
//! Finds query occurrences in the concatenation of a layer's span texts
//! and maps each occurrence's character range back to span boundaries.

use tracing::debug;

use crate::textlayer::TextLayer;

/// A position inside a layer: span index plus character offset into that
/// span's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPoint {
    pub span_index: usize,
    pub offset: usize,
}

/// One query occurrence in a page's text layer.
///
/// `begin` always precedes `end` in span-then-offset order, and the match
/// covers the contiguous span range `span_range.0..=span_range.1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayerMatch {
    /// 0-based page index.
    pub page_index: usize,
    /// Position of this match within the search call's result list.
    pub match_index: usize,
    /// Inclusive range of involved span indices.
    pub span_range: (usize, usize),
    /// Matched text in original case.
    pub text: String,
    pub begin: MatchPoint,
    /// `offset` counts characters into the end span (exclusive range end).
    pub end: MatchPoint,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    pub case_sensitive: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
        }
    }
}

/// Find all non-overlapping occurrences of `query` in the layer.
///
/// Concatenates span texts in order (no separator), scans repeatedly from
/// the previous match's end, and resolves each hit's begin/end span by
/// walking spans with a running length counter. Matches are returned in
/// strictly increasing `(span, offset)` order.
pub fn find_text_in_layer(
    layer: &TextLayer,
    query: &str,
    options: &MatchOptions,
) -> Vec<TextLayerMatch> {
    let needle: Vec<char> = fold_chars(query, options.case_sensitive);
    if needle.is_empty() {
        return Vec::new();
    }

    let original: Vec<char> = layer.text_content().chars().collect();
    let haystack: Vec<char> = if options.case_sensitive {
        original.clone()
    } else {
        original
            .iter()
            .map(|c| fold_char(*c))
            .collect()
    };

    let span_lens: Vec<usize> = layer.spans.iter().map(|span| span.char_len()).collect();

    let mut matches = Vec::new();
    let mut from = 0usize;
    while let Some(relative) = find_chars(&haystack[from..], &needle) {
        let start = from + relative;
        let end = start + needle.len();
        from = end;

        let Some(begin) = resolve_point(&span_lens, start, false) else {
            debug!(start, "dropping match with unresolvable begin span");
            continue;
        };
        let Some(end_point) = resolve_point(&span_lens, end, true) else {
            debug!(end, "dropping match with unresolvable end span");
            continue;
        };

        matches.push(TextLayerMatch {
            page_index: layer.page_number.saturating_sub(1),
            match_index: matches.len(),
            span_range: (begin.span_index, end_point.span_index),
            text: original[start..end].iter().collect(),
            begin,
            end: end_point,
        });
    }

    debug!(
        page = layer.page_number,
        query,
        count = matches.len(),
        "text layer scan complete"
    );
    matches
}

fn fold_chars(text: &str, case_sensitive: bool) -> Vec<char> {
    if case_sensitive {
        text.chars().collect()
    } else {
        text.chars().map(fold_char).collect()
    }
}

/// Length-preserving case fold: multi-char expansions would desynchronize
/// character offsets from the layer, so only 1:1 lowercase mappings apply.
pub(crate) fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(folded), None) => folded,
        _ => c,
    }
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

/// Walk span lengths until the running counter passes `target`. For a
/// begin point the owning span's text must strictly contain the offset;
/// for an end point landing exactly on a span boundary stays inclusive of
/// that final span.
fn resolve_point(span_lens: &[usize], target: usize, inclusive: bool) -> Option<MatchPoint> {
    let mut cursor = 0usize;
    for (i, len) in span_lens.iter().enumerate() {
        let end = cursor + len;
        let hit = if inclusive {
            target <= end && target > cursor
        } else {
            target < end
        };
        if hit {
            return Some(MatchPoint {
                span_index: i,
                offset: target - cursor,
            });
        }
        cursor = end;
    }
    // A zero-length layer, or a begin point at the very end of the text.
    if inclusive && target == 0 && !span_lens.is_empty() {
        return Some(MatchPoint {
            span_index: 0,
            offset: 0,
        });
    }
    None
}
