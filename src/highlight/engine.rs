//! Persistent highlight engine
//!
//! Owns the collection of saved highlights: creation from a resolved
//! selection range, re-anchoring onto rebuilt layers, removal, recolor,
//! and click hit-testing. Layer painting goes through the painter so the
//! text layer's round-trip invariant holds; positions are kept normalized
//! so a stored highlight is valid at every zoom level.

use tracing::{debug, warn};

use crate::events::{EventDispatcher, HighlightEvent, HighlightEventKind};
use crate::geometry::NormalizedRect;
use crate::textlayer::{OverlayOwner, RangeAnchor, ResolvedRange, TextLayer};

use super::painter;
use super::types::{generate_highlight_id, now_millis, Highlight, DEFAULT_HIGHLIGHT_COLOR};

/// Errors from highlight creation. Restoration never returns these;
/// anchors that fail to resolve are skipped and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    #[error("selection range is empty")]
    EmptyRange,

    #[error(transparent)]
    Anchor(#[from] crate::textlayer::AnchorError),
}

/// Store and painter driver for saved highlights.
pub struct SelectionHighlighter {
    highlights: Vec<Highlight>,
    dispatcher: EventDispatcher,
}

impl SelectionHighlighter {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self {
            highlights: Vec::new(),
            dispatcher,
        }
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    /// Create a highlight from a span-level selection range on a live
    /// layer: captures a replayable anchor, wraps the range, and stores
    /// the normalized bounding rectangle and covered text.
    ///
    /// `end_offset` counts characters into the end span (exclusive).
    pub fn create_from_range(
        &mut self,
        layer: &mut TextLayer,
        start_span: usize,
        start_offset: usize,
        end_span: usize,
        end_offset: usize,
        color: Option<&str>,
    ) -> Result<Highlight, HighlightError> {
        if start_span == end_span && start_offset == end_offset {
            return Err(HighlightError::EmptyRange);
        }

        let anchor = RangeAnchor::capture(layer, start_span, start_offset, end_span, end_offset)?;
        let resolved = ResolvedRange {
            start_span,
            start_offset,
            end_span,
            end_offset,
        };

        let text = range_text(layer, &resolved);
        if text.trim().is_empty() {
            return Err(HighlightError::EmptyRange);
        }
        let position = range_position(layer, &resolved);

        let highlight = Highlight {
            id: generate_highlight_id(),
            text,
            color: color.unwrap_or(DEFAULT_HIGHLIGHT_COLOR).to_string(),
            position,
            page_number: layer.page_number,
            timestamp: now_millis(),
            serialized_range: Some(anchor.to_string()),
        };

        painter::wrap_resolved_range(
            layer,
            &resolved,
            OverlayOwner::Highlights,
            Some(&highlight.id),
        );

        self.dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::Created,
            highlight: highlight.clone(),
        });
        self.highlights.push(highlight.clone());
        Ok(highlight)
    }

    /// Replay this page's stored highlights onto a freshly built layer.
    ///
    /// Best effort: anchors that no longer parse or resolve (content
    /// drifted, structure changed) are skipped with a warning; the
    /// highlight record itself is kept so exports still carry it.
    /// Returns the number of highlights painted.
    pub fn restore(&self, layer: &mut TextLayer) -> usize {
        let page_number = layer.page_number;
        let mut painted = 0;
        for highlight in self
            .highlights
            .iter()
            .filter(|h| h.page_number == page_number)
        {
            let Some(serialized) = &highlight.serialized_range else {
                debug!(id = %highlight.id, "highlight has no serialized range, skipping");
                continue;
            };
            let anchor = match RangeAnchor::parse(serialized) {
                Ok(anchor) => anchor,
                Err(error) => {
                    warn!(id = %highlight.id, %error, "unparseable highlight range, skipping");
                    continue;
                }
            };
            let resolved = match anchor.resolve(layer) {
                Ok(resolved) => resolved,
                Err(error) => {
                    warn!(id = %highlight.id, %error, "highlight range did not resolve, skipping");
                    continue;
                }
            };
            painter::wrap_resolved_range(
                layer,
                &resolved,
                OverlayOwner::Highlights,
                Some(&highlight.id),
            );
            painted += 1;
        }
        painted
    }

    /// Remove a highlight. When its page's layer is live, its wrappers
    /// are unwrapped too. Returns the removed record.
    pub fn remove(&mut self, id: &str, layer: Option<&mut TextLayer>) -> Option<Highlight> {
        let index = self.highlights.iter().position(|h| h.id == id)?;
        let highlight = self.highlights.remove(index);

        if let Some(layer) = layer {
            if layer.page_number == highlight.page_number {
                painter::unwrap_highlight(layer, OverlayOwner::Highlights, id);
            }
        }

        self.dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::Removed,
            highlight: highlight.clone(),
        });
        Some(highlight)
    }

    pub fn set_color(&mut self, id: &str, color: &str) -> bool {
        let Some(highlight) = self.highlights.iter_mut().find(|h| h.id == id) else {
            return false;
        };
        highlight.color = color.to_string();
        let updated = highlight.clone();
        self.dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::Updated,
            highlight: updated,
        });
        true
    }

    /// Drop every stored highlight and clear their wrappers from the
    /// given live layers.
    pub fn clear_all(&mut self, layers: &mut [&mut TextLayer]) {
        for layer in layers.iter_mut() {
            painter::clear_highlights(layer, OverlayOwner::Highlights);
        }
        for highlight in self.highlights.drain(..) {
            self.dispatcher.emit(&HighlightEvent {
                kind: HighlightEventKind::Removed,
                highlight,
            });
        }
    }

    /// Replace the store with imported records. Nothing is painted until
    /// the affected layers are next restored.
    pub fn load(&mut self, highlights: Vec<Highlight>) {
        self.highlights = highlights;
    }

    /// Hit-test a click at page coordinates (pixels at `scale`). The most
    /// recently created highlight wins when several overlap.
    pub fn handle_click(&self, page_number: usize, x: f32, y: f32, scale: f32) -> Option<&Highlight> {
        let hit = self.hit_test(page_number, x, y, scale)?;
        self.dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::Clicked,
            highlight: hit.clone(),
        });
        Some(hit)
    }

    /// Hit-test a context-menu request, emitting the corresponding event.
    pub fn handle_context_menu(
        &self,
        page_number: usize,
        x: f32,
        y: f32,
        scale: f32,
    ) -> Option<&Highlight> {
        let hit = self.hit_test(page_number, x, y, scale)?;
        self.dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::ContextMenu,
            highlight: hit.clone(),
        });
        Some(hit)
    }

    fn hit_test(&self, page_number: usize, x: f32, y: f32, scale: f32) -> Option<&Highlight> {
        self.highlights
            .iter()
            .rev()
            .filter(|h| h.page_number == page_number)
            .find(|h| h.position.at_scale(scale).contains(x, y))
    }
}

/// Characters covered by a resolved range, concatenated across spans the
/// same way the layer's own text content is.
fn range_text(layer: &TextLayer, range: &ResolvedRange) -> String {
    if range.start_span == range.end_span {
        return layer.spans[range.start_span]
            .text_content()
            .chars()
            .skip(range.start_offset)
            .take(range.end_offset.saturating_sub(range.start_offset))
            .collect();
    }

    let mut text: String = layer.spans[range.start_span]
        .text_content()
        .chars()
        .skip(range.start_offset)
        .collect();
    for span in &layer.spans[range.start_span + 1..range.end_span] {
        text.push_str(&span.text_content());
    }
    text.extend(
        layer.spans[range.end_span]
            .text_content()
            .chars()
            .take(range.end_offset),
    );
    text
}

/// Bounding rectangle of the involved spans, divided by the layer's scale
/// so it can be reapplied at any zoom.
fn range_position(layer: &TextLayer, range: &ResolvedRange) -> NormalizedRect {
    let mut rect = layer.spans[range.start_span].rect();
    for span in &layer.spans[range.start_span + 1..=range.end_span] {
        rect = rect.union(&span.rect());
    }
    rect.normalized(layer.scale)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::geometry::DomPosition;
    use crate::textlayer::Span;

    fn span(text: &str, left: f32, top: f32, width: f32) -> Span {
        Span::new(
            text,
            DomPosition {
                left,
                top,
                font_size: 12.0,
            },
            width,
        )
    }

    fn layer() -> TextLayer {
        TextLayer::new(
            1,
            1.0,
            vec![
                span("Hello ", 10.0, 100.0, 40.0),
                span("World", 55.0, 100.0, 36.0),
            ],
        )
    }

    fn recorder() -> (EventDispatcher, Arc<Mutex<Vec<HighlightEventKind>>>) {
        let dispatcher = EventDispatcher::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.subscribe(move |event| {
            sink.lock().unwrap().push(event.kind);
        });
        (dispatcher, seen)
    }

    #[test]
    fn test_create_wraps_and_stores() {
        let (dispatcher, seen) = recorder();
        let mut engine = SelectionHighlighter::new(dispatcher);
        let mut layer = layer();

        let highlight = engine
            .create_from_range(&mut layer, 0, 2, 1, 3, None)
            .unwrap();
        assert_eq!(highlight.text, "llo Wor");
        assert_eq!(highlight.page_number, 1);
        assert_eq!(highlight.color, DEFAULT_HIGHLIGHT_COLOR);
        assert!(highlight.serialized_range.is_some());

        assert_eq!(layer.text_content(), "Hello World");
        assert!(layer.wrapped_count(OverlayOwner::Highlights) > 0);
        assert_eq!(&*seen.lock().unwrap(), &[HighlightEventKind::Created]);
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut engine = SelectionHighlighter::new(EventDispatcher::default());
        let mut layer = layer();
        assert!(matches!(
            engine.create_from_range(&mut layer, 0, 3, 0, 3, None),
            Err(HighlightError::EmptyRange)
        ));
    }

    #[test]
    fn test_restore_on_rebuilt_layer() {
        let mut engine = SelectionHighlighter::new(EventDispatcher::default());
        let mut original = layer();
        engine
            .create_from_range(&mut original, 1, 0, 1, 5, Some("#00ff00"))
            .unwrap();

        // Same content, rebuilt from scratch at another zoom level.
        let mut rebuilt = TextLayer::new(
            1,
            2.0,
            vec![
                span("Hello ", 20.0, 200.0, 80.0),
                span("World", 110.0, 200.0, 72.0),
            ],
        );
        assert_eq!(engine.restore(&mut rebuilt), 1);
        assert!(rebuilt.wrapped_count(OverlayOwner::Highlights) > 0);
        assert_eq!(rebuilt.text_content(), "Hello World");
    }

    #[test]
    fn test_restore_after_capture_with_search_overlays() {
        let mut engine = SelectionHighlighter::new(EventDispatcher::default());
        let mut original = layer();
        // Live search overlays segment the spans before the highlight is
        // created; the stored range must not depend on that segmentation.
        original.spans[0].wrap(0, 5, OverlayOwner::Search, Some("0"), false);
        engine
            .create_from_range(&mut original, 0, 2, 1, 3, None)
            .unwrap();

        let mut rebuilt = layer();
        assert_eq!(engine.restore(&mut rebuilt), 1);
        assert!(rebuilt.wrapped_count(OverlayOwner::Highlights) > 0);
        assert_eq!(rebuilt.text_content(), "Hello World");
    }

    #[test]
    fn test_restore_skips_stale_anchor() {
        let mut engine = SelectionHighlighter::new(EventDispatcher::default());
        let mut original = layer();
        engine
            .create_from_range(&mut original, 0, 0, 0, 5, None)
            .unwrap();

        let mut drifted = TextLayer::new(1, 1.0, vec![span("Different text", 10.0, 100.0, 90.0)]);
        assert_eq!(engine.restore(&mut drifted), 0);
        assert_eq!(drifted.wrapped_count(OverlayOwner::Highlights), 0);
        // The record survives even though it no longer paints.
        assert_eq!(engine.highlights().len(), 1);
    }

    #[test]
    fn test_remove_unwraps_live_layer() {
        let (dispatcher, seen) = recorder();
        let mut engine = SelectionHighlighter::new(dispatcher);
        let mut layer = layer();
        let id = engine
            .create_from_range(&mut layer, 0, 0, 0, 5, None)
            .unwrap()
            .id
            .clone();

        let removed = engine.remove(&id, Some(&mut layer)).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(layer.wrapped_count(OverlayOwner::Highlights), 0);
        assert_eq!(layer.text_content(), "Hello World");
        assert_eq!(
            &*seen.lock().unwrap(),
            &[HighlightEventKind::Created, HighlightEventKind::Removed]
        );
    }

    #[test]
    fn test_set_color_emits_update() {
        let (dispatcher, seen) = recorder();
        let mut engine = SelectionHighlighter::new(dispatcher);
        let mut layer = layer();
        let id = engine
            .create_from_range(&mut layer, 0, 0, 0, 5, None)
            .unwrap()
            .id
            .clone();

        assert!(engine.set_color(&id, "#ff00ff"));
        assert_eq!(engine.get(&id).unwrap().color, "#ff00ff");
        assert!(!engine.set_color("missing", "#000000"));
        assert_eq!(
            &*seen.lock().unwrap(),
            &[HighlightEventKind::Created, HighlightEventKind::Updated]
        );
    }

    #[test]
    fn test_click_hit_test_uses_scale() {
        let mut engine = SelectionHighlighter::new(EventDispatcher::default());
        let mut layer = layer();
        let id = engine
            .create_from_range(&mut layer, 0, 0, 1, 5, None)
            .unwrap()
            .id
            .clone();

        // Stored at scale 1; hit at scale 2 doubles the rectangle.
        let hit = engine.handle_click(1, 100.0, 210.0, 2.0).unwrap();
        assert_eq!(hit.id, id);
        assert!(engine.handle_click(1, 100.0, 210.0, 1.0).is_none());
        assert!(engine.handle_click(2, 100.0, 210.0, 2.0).is_none());
    }

    #[test]
    fn test_clear_all() {
        let (dispatcher, seen) = recorder();
        let mut engine = SelectionHighlighter::new(dispatcher);
        let mut layer = layer();
        engine.create_from_range(&mut layer, 0, 0, 0, 5, None).unwrap();
        engine.create_from_range(&mut layer, 1, 0, 1, 5, None).unwrap();

        engine.clear_all(&mut [&mut layer]);
        assert!(engine.highlights().is_empty());
        assert_eq!(layer.wrapped_count(OverlayOwner::Highlights), 0);
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_multi_span_position_is_union() {
        let mut engine = SelectionHighlighter::new(EventDispatcher::default());
        let mut layer = layer();
        let highlight = engine
            .create_from_range(&mut layer, 0, 0, 1, 5, None)
            .unwrap();

        let rect = highlight.position.at_scale(1.0);
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.y, 100.0);
        assert_eq!(rect.width, 81.0);
    }
}
