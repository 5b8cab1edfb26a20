//! Ephemeral selection highlighter
//!
//! The single-active-highlight mode: a native selection becomes one
//! transient highlight made of normalized rectangles, cleared again on
//! outside click, Escape, or navigation. Nothing here is persisted.
//!
//! Input arrives routed from the viewer facade; this type never
//! subscribes to anything itself.

use tracing::{debug, warn};

use crate::geometry::{NormalizedRect, Rect};

use super::types::{now_millis, ActiveHighlight};

/// One element in a selection's ancestor chain, innermost first.
#[derive(Debug, Clone, Default)]
pub struct AncestorRef {
    pub id: Option<String>,
    pub data_page: Option<usize>,
}

/// Snapshot of a finished native selection, as captured by the host.
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    pub text: String,
    /// Ancestor chain of the selection's common ancestor, innermost first.
    pub ancestors: Vec<AncestorRef>,
    /// Page-relative client rectangles at the current scale.
    pub client_rects: Vec<Rect>,
}

/// Walk the ancestor chain for a page marker: a `data-page` attribute or
/// an id ending in `page-<n>`. The nearest match wins, so a selection
/// spanning two pages is silently attributed to one of them. Returns
/// `None` when no ancestor identifies a page.
pub fn resolve_page_number(ancestors: &[AncestorRef]) -> Option<usize> {
    for ancestor in ancestors {
        if let Some(page) = ancestor.data_page {
            return Some(page);
        }
        if let Some(id) = &ancestor.id {
            if let Some(rest) = id.rfind("page-").map(|i| &id[i + 5..]) {
                if let Ok(page) = rest.parse::<usize>() {
                    return Some(page);
                }
            }
        }
    }
    None
}

type ClipboardFn = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// State machine: Idle (no active highlight) or Active (exactly one).
pub struct EphemeralHighlighter {
    scale: f32,
    active: Option<ActiveHighlight>,
    /// Overlay rectangles at the current scale, rebuilt from the stored
    /// normalized rectangles whenever the scale changes.
    overlays: Vec<Rect>,
    /// Set after a capture: the host should clear the native selection
    /// after a short delay (the browser needs its rects until then).
    wants_selection_clear: bool,
    clipboard: Option<ClipboardFn>,
}

impl EphemeralHighlighter {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            active: None,
            overlays: Vec::new(),
            wants_selection_clear: false,
            clipboard: None,
        }
    }

    pub fn with_clipboard<F>(mut self, clipboard: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        self.clipboard = Some(Box::new(clipboard));
        self
    }

    /// Mouseup with a finished selection. Replaces any current highlight.
    /// Ignored when the selection is empty or no ancestor names a page.
    pub fn on_selection(&mut self, snapshot: &SelectionSnapshot) -> bool {
        if snapshot.text.trim().is_empty() {
            return false;
        }
        let Some(page_number) = resolve_page_number(&snapshot.ancestors) else {
            debug!("selection outside any recognized page, ignoring");
            return false;
        };
        if snapshot.client_rects.is_empty() {
            return false;
        }

        let rectangles: Vec<NormalizedRect> = snapshot
            .client_rects
            .iter()
            .map(|rect| rect.normalized(self.scale))
            .collect();

        self.overlays = snapshot.client_rects.clone();
        self.active = Some(ActiveHighlight {
            page_number,
            text: snapshot.text.clone(),
            rectangles,
            timestamp: now_millis(),
        });
        self.wants_selection_clear = true;
        true
    }

    /// Whether the host should clear the native selection now; resets the
    /// request.
    pub fn take_selection_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.wants_selection_clear)
    }

    /// Click outside the highlight (other page, or inside the page but
    /// outside both text layer and highlight elements).
    pub fn on_outside_click(&mut self) {
        self.deactivate();
    }

    pub fn on_escape(&mut self) {
        self.deactivate();
    }

    /// Ctrl/Cmd+C while active: copy the highlighted text. Clipboard
    /// failures are logged, never surfaced. Stays active either way.
    pub fn on_copy(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        match &self.clipboard {
            Some(clipboard) => match clipboard(&active.text) {
                Ok(()) => true,
                Err(message) => {
                    warn!(%message, "clipboard copy failed");
                    false
                }
            },
            None => false,
        }
    }

    /// Scale change: stored rectangles are already normalized, so the
    /// overlays are simply re-emitted at the new scale.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        if let Some(active) = &self.active {
            self.overlays = active
                .rectangles
                .iter()
                .map(|rect| rect.at_scale(scale))
                .collect();
        }
    }

    pub fn active(&self) -> Option<&ActiveHighlight> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Overlay rectangles at the current scale; empty when idle.
    pub fn overlays(&self) -> &[Rect] {
        &self.overlays
    }

    fn deactivate(&mut self) {
        self.active = None;
        self.overlays.clear();
        self.wants_selection_clear = false;
    }
}
