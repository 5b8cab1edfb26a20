//! Layer-based search
//!
//! The accurate engine: matches against the concatenated span text of
//! live layers and paints hits as wrapped segments through the highlight
//! painter, so positions are exact to the character. Owns navigation
//! state (current match, wraparound next/previous).

use tracing::debug;

use crate::geometry::NormalizedRect;
use crate::highlight::{
    find_text_in_layer, highlight_matches, select_match, MatchOptions, ScrollTarget,
    TextLayerMatch,
};
use crate::textlayer::{OverlayOwner, TextLayer};

use super::{context_around, is_word_char, NavDisplay, SearchOptions, SearchResult};

/// A painted match: which page it lives on plus its layer-local match.
struct PaintedMatch {
    page_number: usize,
    inner: TextLayerMatch,
}

#[derive(Default)]
pub struct LayerSearch {
    matches: Vec<PaintedMatch>,
    results: Vec<SearchResult>,
    current: Option<usize>,
}

impl LayerSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// 1-based display state for the navigation widget.
    pub fn display(&self) -> Option<NavDisplay> {
        let current = self.current?;
        Some(NavDisplay {
            index: current + 1,
            total: self.results.len(),
        })
    }

    /// Search the given layers, replacing any previous result set and
    /// repainting overlays. The first match becomes current. An empty or
    /// whitespace query is equivalent to [`clear`](Self::clear).
    pub fn search(
        &mut self,
        layers: &mut [&mut TextLayer],
        query: &str,
        options: &SearchOptions,
    ) -> &[SearchResult] {
        self.clear(layers);
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return &self.results;
        }

        let match_options = MatchOptions {
            case_sensitive: options.case_sensitive,
        };

        for layer in layers.iter_mut() {
            let chars: Vec<char> = layer.text_content().chars().collect();
            let span_lens: Vec<usize> = layer.spans.iter().map(|span| span.char_len()).collect();

            let mut found = find_text_in_layer(layer, trimmed, &match_options);
            if options.whole_word {
                found.retain(|m| is_whole_word(&chars, &span_lens, m));
            }
            // Match indices must stay dense after the whole-word filter so
            // the painter's wrapper ids line up with navigation targets.
            for (index, m) in found.iter_mut().enumerate() {
                m.match_index = index;
            }

            highlight_matches(layer, &found, OverlayOwner::Search, None);

            for m in found {
                let start = global_offset(&span_lens, m.begin.span_index, m.begin.offset);
                let end = global_offset(&span_lens, m.end.span_index, m.end.offset);
                self.results.push(SearchResult {
                    page_number: layer.page_number,
                    text: m.text.clone(),
                    position: match_position(layer, &m),
                    text_index: self.results.len(),
                    context: context_around(&chars, start, end),
                });
                self.matches.push(PaintedMatch {
                    page_number: layer.page_number,
                    inner: m,
                });
            }
        }

        if !self.results.is_empty() {
            self.select(layers, 0);
        }
        debug!(
            query = trimmed,
            count = self.results.len(),
            "layer search complete"
        );
        &self.results
    }

    /// Advance to the next match, wrapping past the last one.
    pub fn next(&mut self, layers: &mut [&mut TextLayer]) -> Option<ScrollTarget> {
        let total = self.matches.len();
        if total == 0 {
            return None;
        }
        let target = match self.current {
            Some(current) => (current + 1) % total,
            None => 0,
        };
        self.select(layers, target)
    }

    /// Step back to the previous match, wrapping before the first one.
    pub fn previous(&mut self, layers: &mut [&mut TextLayer]) -> Option<ScrollTarget> {
        let total = self.matches.len();
        if total == 0 {
            return None;
        }
        let target = match self.current {
            Some(current) => (current + total - 1) % total,
            None => 0,
        };
        self.select(layers, target)
    }

    /// Jump to a specific result index.
    pub fn select(&mut self, layers: &mut [&mut TextLayer], index: usize) -> Option<ScrollTarget> {
        let target = self.matches.get(index)?;
        self.current = Some(index);

        // Only one page carries a selected marker at a time.
        for layer in layers.iter_mut() {
            if layer.page_number != target.page_number {
                for span in &mut layer.spans {
                    span.clear_selection(OverlayOwner::Search);
                }
            }
        }

        let Some(layer) = layers
            .iter_mut()
            .find(|layer| layer.page_number == target.page_number)
        else {
            debug!(page = target.page_number, "no live layer for selected match");
            return None;
        };

        let page_matches: Vec<TextLayerMatch> = self
            .matches
            .iter()
            .filter(|m| m.page_number == target.page_number)
            .map(|m| m.inner.clone())
            .collect();
        select_match(layer, &page_matches, target.inner.match_index, OverlayOwner::Search)
    }

    /// Remove the engine's overlays from every layer and reset navigation
    /// state. Idempotent.
    pub fn clear(&mut self, layers: &mut [&mut TextLayer]) {
        for layer in layers.iter_mut() {
            layer.clear_owner(OverlayOwner::Search);
        }
        self.matches.clear();
        self.results.clear();
        self.current = None;
    }
}

/// Whole-word test on the concatenated page text: the characters just
/// outside the match must not be word characters.
fn is_whole_word(chars: &[char], span_lens: &[usize], m: &TextLayerMatch) -> bool {
    let start = global_offset(span_lens, m.begin.span_index, m.begin.offset);
    let end = global_offset(span_lens, m.end.span_index, m.end.offset);

    let before_ok = start == 0 || !is_word_char(chars[start - 1]);
    let after_ok = end >= chars.len() || !is_word_char(chars[end]);
    before_ok && after_ok
}

fn global_offset(span_lens: &[usize], span_index: usize, offset: usize) -> usize {
    span_lens[..span_index].iter().sum::<usize>() + offset
}

/// Bounding box of the involved spans, normalized by the layer's scale.
fn match_position(layer: &TextLayer, m: &TextLayerMatch) -> NormalizedRect {
    let (first, last) = m.span_range;
    let mut rect = layer.spans[first].rect();
    for span in &layer.spans[first + 1..=last.min(layer.spans.len() - 1)] {
        rect = rect.union(&span.rect());
    }
    rect.normalized(layer.scale)
}
