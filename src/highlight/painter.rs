//! Highlight painting
//!
//! Applies matches and resolved ranges to a layer by splitting and
//! wrapping span segments, clears them owner-scoped, and moves the
//! selected-match marker for navigation.

use tracing::debug;

use crate::geometry::DomPosition;
use crate::textlayer::{OverlayOwner, ResolvedRange, TextLayer};

use super::matcher::TextLayerMatch;

/// Where to scroll a match into view: the first involved span's position
/// on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTarget {
    pub page_number: usize,
    pub position: DomPosition,
}

/// Wrap each match's text in highlight segments owned by `owner`, the
/// match at `selected` flagged as the selected one.
///
/// Matches are processed in ascending `(span, offset)` order; splitting
/// rewrites span segments in place, so position order keeps the visual
/// result stable when several matches share a span.
pub fn highlight_matches(
    layer: &mut TextLayer,
    matches: &[TextLayerMatch],
    owner: OverlayOwner,
    selected: Option<usize>,
) {
    let mut order: Vec<&TextLayerMatch> = matches.iter().collect();
    order.sort_by_key(|m| (m.begin.span_index, m.begin.offset));

    for m in order {
        let is_selected = selected == Some(m.match_index);
        apply_match(layer, m, owner, is_selected);
    }
}

fn apply_match(layer: &mut TextLayer, m: &TextLayerMatch, owner: OverlayOwner, selected: bool) {
    let id = m.match_index.to_string();
    let (first, last) = m.span_range;
    if first >= layer.spans.len() || last >= layer.spans.len() {
        debug!(first, last, "skipping match outside layer bounds");
        return;
    }

    if first == last {
        layer.spans[first].wrap(m.begin.offset, m.end.offset, owner, Some(&id), selected);
        return;
    }

    // First span: suffix from the begin offset.
    let first_len = layer.spans[first].char_len();
    layer.spans[first].wrap(m.begin.offset, first_len, owner, Some(&id), selected);

    // Middle spans: wrapped in full.
    for span_index in first + 1..last {
        let len = layer.spans[span_index].char_len();
        layer.spans[span_index].wrap(0, len, owner, Some(&id), selected);
    }

    // Last span: prefix up to the end offset.
    layer.spans[last].wrap(0, m.end.offset, owner, Some(&id), selected);
}

/// Remove all of `owner`'s highlight segments from the layer and merge
/// text back together. Idempotent; the layer's text content is unchanged.
pub fn clear_highlights(layer: &mut TextLayer, owner: OverlayOwner) {
    layer.clear_owner(owner);
}

/// Move the selected marker to `target_index` and return where to scroll.
///
/// The previously selected match loses its flag; the target match's
/// wrappers gain it. Returns `None` when the target is unknown to the
/// layer (e.g. it was never painted).
pub fn select_match(
    layer: &mut TextLayer,
    matches: &[TextLayerMatch],
    target_index: usize,
    owner: OverlayOwner,
) -> Option<ScrollTarget> {
    let target = matches.iter().find(|m| m.match_index == target_index)?;

    for span in &mut layer.spans {
        span.clear_selection(owner);
    }

    let id = target_index.to_string();
    let mut flagged = 0;
    for span in &mut layer.spans {
        flagged += span.set_selected_by_id(owner, &id, true);
    }
    if flagged == 0 {
        debug!(target_index, "selected match has no painted segments");
        return None;
    }

    let first_span = layer.spans.get(target.begin.span_index)?;
    Some(ScrollTarget {
        page_number: layer.page_number,
        position: first_span.position,
    })
}

/// Wrap a resolved (re-anchored or live-selection) range.
///
/// A range inside a single span wraps directly; one crossing spans falls
/// back to wrapping the first span's suffix, whole middle spans, and the
/// last span's prefix. Both paths leave the layer's text content
/// unchanged. Returns the number of segments created.
pub fn wrap_resolved_range(
    layer: &mut TextLayer,
    range: &ResolvedRange,
    owner: OverlayOwner,
    highlight_id: Option<&str>,
) -> usize {
    if range.start_span >= layer.spans.len() || range.end_span >= layer.spans.len() {
        debug!(
            start = range.start_span,
            end = range.end_span,
            "skipping range outside layer bounds"
        );
        return 0;
    }

    if range.start_span == range.end_span {
        return layer.spans[range.start_span].wrap(
            range.start_offset,
            range.end_offset,
            owner,
            highlight_id,
            false,
        );
    }

    let mut created = 0;
    let first_len = layer.spans[range.start_span].char_len();
    created += layer.spans[range.start_span].wrap(
        range.start_offset,
        first_len,
        owner,
        highlight_id,
        false,
    );
    for span_index in range.start_span + 1..range.end_span {
        let len = layer.spans[span_index].char_len();
        created += layer.spans[span_index].wrap(0, len, owner, highlight_id, false);
    }
    created += layer.spans[range.end_span].wrap(0, range.end_offset, owner, highlight_id, false);
    created
}

/// Remove the wrappers carrying a specific highlight id.
pub fn unwrap_highlight(layer: &mut TextLayer, owner: OverlayOwner, highlight_id: &str) {
    use crate::textlayer::SegmentNode;
    for span in &mut layer.spans {
        let nodes = std::mem::take(&mut span.nodes);
        span.nodes = nodes
            .into_iter()
            .map(|node| match node {
                SegmentNode::Wrapped(wrapped)
                    if wrapped.owner == owner
                        && wrapped.highlight_id.as_deref() == Some(highlight_id) =>
                {
                    SegmentNode::Text(wrapped.text)
                }
                other => other,
            })
            .collect();
        span.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DomPosition;
    use crate::highlight::matcher::{find_text_in_layer, MatchOptions};
    use crate::textlayer::Span;

    fn layer(texts: &[&str]) -> TextLayer {
        let spans = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Span::new(
                    text,
                    DomPosition {
                        left: 10.0 * i as f32,
                        top: 20.0,
                        font_size: 12.0,
                    },
                    50.0,
                )
            })
            .collect();
        TextLayer::new(1, 1.0, spans)
    }

    #[test]
    fn test_wrap_then_clear_round_trip() {
        let mut l = layer(&["Hello ", "World"]);
        let before = l.text_content();

        let matches = find_text_in_layer(&l, "lo Wo", &MatchOptions::default());
        highlight_matches(&mut l, &matches, OverlayOwner::Search, None);
        assert_eq!(l.wrapped_count(OverlayOwner::Search), 2);
        assert_eq!(l.text_content(), before);

        clear_highlights(&mut l, OverlayOwner::Search);
        assert_eq!(l.text_content(), before);
        assert_eq!(l.wrapped_count(OverlayOwner::Search), 0);
    }

    #[test]
    fn test_multiple_matches_same_span() {
        let mut l = layer(&["cat and cat and cat"]);
        let before = l.text_content();
        let matches = find_text_in_layer(&l, "cat", &MatchOptions::default());
        assert_eq!(matches.len(), 3);

        highlight_matches(&mut l, &matches, OverlayOwner::Search, None);
        assert_eq!(l.wrapped_count(OverlayOwner::Search), 3);
        assert_eq!(l.text_content(), before);
    }

    #[test]
    fn test_three_span_match_wraps_middle_fully() {
        let mut l = layer(&["ab", "cd", "ef"]);
        let matches = find_text_in_layer(&l, "bcde", &MatchOptions::default());
        assert_eq!(matches.len(), 1);

        highlight_matches(&mut l, &matches, OverlayOwner::Search, None);
        // Middle span is wrapped whole.
        assert_eq!(l.spans[1].nodes.len(), 1);
        assert_eq!(l.spans[1].wrapped_count(OverlayOwner::Search), 1);
        assert_eq!(l.text_content(), "abcdef");
    }

    #[test]
    fn test_select_match_moves_marker() {
        let mut l = layer(&["cat cat cat"]);
        let matches = find_text_in_layer(&l, "cat", &MatchOptions::default());
        highlight_matches(&mut l, &matches, OverlayOwner::Search, Some(0));

        let target = select_match(&mut l, &matches, 2, OverlayOwner::Search).unwrap();
        assert_eq!(target.page_number, 1);

        // Exactly one selected wrapper remains, and it is match 2.
        use crate::textlayer::SegmentNode;
        let selected: Vec<String> = l
            .spans
            .iter()
            .flat_map(|span| span.nodes.iter())
            .filter_map(|node| match node {
                SegmentNode::Wrapped(w) if w.selected => w.highlight_id.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(selected, vec!["2".to_string()]);
    }

    #[test]
    fn test_wrap_resolved_range_single_span() {
        let mut l = layer(&["Hello World"]);
        let range = ResolvedRange {
            start_span: 0,
            start_offset: 6,
            end_span: 0,
            end_offset: 11,
        };
        let created = wrap_resolved_range(&mut l, &range, OverlayOwner::Highlights, Some("h1"));
        assert_eq!(created, 1);
        assert_eq!(l.text_content(), "Hello World");
    }

    #[test]
    fn test_wrap_resolved_range_multi_span_fallback() {
        let mut l = layer(&["Hello ", "brave ", "World"]);
        let range = ResolvedRange {
            start_span: 0,
            start_offset: 3,
            end_span: 2,
            end_offset: 2,
        };
        let created = wrap_resolved_range(&mut l, &range, OverlayOwner::Highlights, Some("h1"));
        assert_eq!(created, 3);
        assert_eq!(l.text_content(), "Hello brave World");

        unwrap_highlight(&mut l, OverlayOwner::Highlights, "h1");
        assert_eq!(l.text_content(), "Hello brave World");
        assert_eq!(l.wrapped_count(OverlayOwner::Highlights), 0);
    }

    #[test]
    fn test_unwrap_specific_highlight_only() {
        let mut l = layer(&["one two three"]);
        wrap_resolved_range(
            &mut l,
            &ResolvedRange {
                start_span: 0,
                start_offset: 0,
                end_span: 0,
                end_offset: 3,
            },
            OverlayOwner::Highlights,
            Some("a"),
        );
        wrap_resolved_range(
            &mut l,
            &ResolvedRange {
                start_span: 0,
                start_offset: 4,
                end_span: 0,
                end_offset: 7,
            },
            OverlayOwner::Highlights,
            Some("b"),
        );

        unwrap_highlight(&mut l, OverlayOwner::Highlights, "a");
        assert_eq!(l.wrapped_count(OverlayOwner::Highlights), 1);
        assert_eq!(l.text_content(), "one two three");
    }

    #[test]
    fn test_clear_twice_is_safe() {
        let mut l = layer(&["text"]);
        clear_highlights(&mut l, OverlayOwner::Search);
        clear_highlights(&mut l, OverlayOwner::Search);
        assert_eq!(l.wrapped_count(OverlayOwner::Search), 0);
    }
}
