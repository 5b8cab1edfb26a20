//! Geometry-based search
//!
//! Scans text-item geometry captured at document load (scale 1), without
//! a live text layer. Match x positions are approximated from the item's
//! average character width, so hits inside proportionally-spaced runs can
//! drift by a few pixels. The layer engine is the accurate path; this one
//! exists so search works before any page's layer is built.

use std::collections::BTreeMap;

use tracing::debug;

use crate::geometry::{NormalizedRect, Rect};

use super::{
    build_whole_word_regex, context_around, fold_char, SearchOptions, SearchResult,
};

/// One text item's geometry at scale 1.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    /// 1-based page number.
    pub page_number: usize,
    pub items: Vec<GeometryItem>,
}

/// Search over stored page geometry.
#[derive(Default)]
pub struct GeometrySearch {
    pages: Vec<PageGeometry>,
    results: Vec<SearchResult>,
    /// Overlay rectangles (scale 1) grouped per page, one batch per page.
    overlays: BTreeMap<usize, Vec<Rect>>,
}

impl GeometrySearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored geometry, usually once per document load.
    pub fn set_pages(&mut self, pages: Vec<PageGeometry>) {
        self.pages = pages;
        self.clear();
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Overlay batch for one page at the given scale; empty when the page
    /// has no hits.
    pub fn overlays_for_page(&self, page_number: usize, scale: f32) -> Vec<Rect> {
        self.overlays
            .get(&page_number)
            .map(|rects| {
                rects
                    .iter()
                    .map(|rect| rect.normalized(1.0).at_scale(scale))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pages that currently carry overlays.
    pub fn pages_with_overlays(&self) -> Vec<usize> {
        self.overlays.keys().copied().collect()
    }

    /// Run a search, replacing any previous result set. An empty or
    /// whitespace query is equivalent to [`clear`](Self::clear).
    pub fn search(&mut self, query: &str, options: &SearchOptions) -> &[SearchResult] {
        self.clear();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return &self.results;
        }

        let word_regex = if options.whole_word {
            build_whole_word_regex(trimmed, options.case_sensitive)
        } else {
            None
        };

        for page in &self.pages {
            let mut page_rects = Vec::new();
            for item in &page.items {
                let hits = match &word_regex {
                    Some(regex) => regex_hits(&item.text, regex),
                    None => substring_hits(&item.text, trimmed, options.case_sensitive),
                };
                for (start, end) in hits {
                    let (result, rect) =
                        build_result(page.page_number, item, start, end, self.results.len());
                    page_rects.push(rect);
                    self.results.push(result);
                }
            }
            if !page_rects.is_empty() {
                self.overlays.insert(page.page_number, page_rects);
            }
        }

        debug!(
            query = trimmed,
            count = self.results.len(),
            "geometry search complete"
        );
        &self.results
    }

    /// Drop all results and overlays. Idempotent.
    pub fn clear(&mut self) {
        self.results.clear();
        self.overlays.clear();
    }
}

/// Char-range hits of `query` in `text`, non-overlapping, left to right.
fn substring_hits(text: &str, query: &str, case_sensitive: bool) -> Vec<(usize, usize)> {
    let fold = |c: char| if case_sensitive { c } else { fold_char(c) };
    let haystack: Vec<char> = text.chars().map(fold).collect();
    let needle: Vec<char> = query.chars().map(fold).collect();
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    let mut at = 0;
    while at + needle.len() <= haystack.len() {
        if haystack[at..at + needle.len()] == needle[..] {
            hits.push((at, at + needle.len()));
            at += needle.len();
        } else {
            at += 1;
        }
    }
    hits
}

/// Char-range hits from a whole-word regex; byte offsets are mapped back
/// to character indices.
fn regex_hits(text: &str, regex: &regex::Regex) -> Vec<(usize, usize)> {
    regex
        .find_iter(text)
        .map(|m| {
            let start = text[..m.start()].chars().count();
            let len = m.as_str().chars().count();
            (start, start + len)
        })
        .collect()
}

fn build_result(
    page_number: usize,
    item: &GeometryItem,
    start: usize,
    end: usize,
    text_index: usize,
) -> (SearchResult, Rect) {
    let chars: Vec<char> = item.text.chars().collect();
    let char_count = chars.len().max(1) as f32;
    let char_width = item.width / char_count;

    let rect = Rect::new(
        item.x + start as f32 * char_width,
        item.y,
        (end - start) as f32 * char_width,
        item.height,
    );

    let result = SearchResult {
        page_number,
        text: chars[start..end].iter().collect(),
        // Geometry is captured at scale 1, so normalization is identity.
        position: NormalizedRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        },
        text_index,
        context: context_around(&chars, start, end),
    };
    (result, rect)
}
