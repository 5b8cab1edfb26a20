//! Text-layer model
//!
//! A page's text layer is an owned tree: one [`Span`] per text run, each
//! holding a list of segments. A segment is either plain text or a wrapped
//! (highlighted) piece of text. Wrapping splits plain segments in place;
//! clearing unwraps and re-merges them, and must leave the span's text
//! content byte-identical.
//!
//! Every wrapper carries the [`OverlayOwner`] marker of the engine that
//! created it, and clear operations are scoped to one owner. No engine may
//! touch another engine's wrappers; there is no bulk container clearing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::geometry::{DomPosition, Rect};

/// Which engine owns an overlay or wrapped segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayOwner {
    /// Text-layer search engine.
    Search,
    /// Persistent selection highlights.
    Highlights,
    /// The single-active ephemeral highlighter.
    Ephemeral,
}

/// A wrapped (highlighted) piece of a span's text.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedSegment {
    pub owner: OverlayOwner,
    /// Highlight or match identifier, if the owner assigns one.
    pub highlight_id: Option<String>,
    /// Whether this wrapper is the currently selected match.
    pub selected: bool,
    pub text: String,
}

/// One child of a span: plain text or a highlight wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentNode {
    Text(String),
    Wrapped(WrappedSegment),
}

impl SegmentNode {
    pub fn text(&self) -> &str {
        match self {
            SegmentNode::Text(text) => text,
            SegmentNode::Wrapped(wrapped) => &wrapped.text,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// One positioned text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub position: DomPosition,
    /// Advance width in pixels at the layer's scale.
    pub width: f32,
    pub nodes: Vec<SegmentNode>,
}

impl Span {
    pub fn new(text: &str, position: DomPosition, width: f32) -> Self {
        Self {
            position,
            width,
            nodes: vec![SegmentNode::Text(text.to_string())],
        }
    }

    /// Full text of the span, wrappers included, in order.
    pub fn text_content(&self) -> String {
        self.nodes.iter().map(SegmentNode::text).collect()
    }

    pub fn char_len(&self) -> usize {
        self.nodes.iter().map(SegmentNode::char_len).sum()
    }

    /// Bounding rectangle at the layer's scale. Height is the font size;
    /// width is the run's advance width.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position.left,
            self.position.top,
            self.width,
            self.position.font_size,
        )
    }

    /// Wrap the `[start, end)` character range (offsets into the span's
    /// full text). Plain segments in range are split and wrapped; segments
    /// already wrapped by another owner are left untouched, so a region
    /// keeps its first owner. Returns the number of wrappers created.
    pub fn wrap(
        &mut self,
        start: usize,
        end: usize,
        owner: OverlayOwner,
        highlight_id: Option<&str>,
        selected: bool,
    ) -> usize {
        if start >= end {
            return 0;
        }

        let mut rebuilt = Vec::with_capacity(self.nodes.len() + 2);
        let mut cursor = 0usize;
        let mut created = 0usize;

        for node in self.nodes.drain(..) {
            let len = node.char_len();
            let node_start = cursor;
            let node_end = cursor + len;
            cursor = node_end;

            if node_end <= start || node_start >= end {
                rebuilt.push(node);
                continue;
            }

            match node {
                SegmentNode::Wrapped(wrapped) => {
                    rebuilt.push(SegmentNode::Wrapped(wrapped));
                }
                SegmentNode::Text(text) => {
                    let lo = start.saturating_sub(node_start).min(len);
                    let hi = (end - node_start).min(len);
                    let chars: Vec<char> = text.chars().collect();

                    let before: String = chars[..lo].iter().collect();
                    let middle: String = chars[lo..hi].iter().collect();
                    let after: String = chars[hi..].iter().collect();

                    if !before.is_empty() {
                        rebuilt.push(SegmentNode::Text(before));
                    }
                    if !middle.is_empty() {
                        rebuilt.push(SegmentNode::Wrapped(WrappedSegment {
                            owner,
                            highlight_id: highlight_id.map(str::to_string),
                            selected,
                            text: middle,
                        }));
                        created += 1;
                    }
                    if !after.is_empty() {
                        rebuilt.push(SegmentNode::Text(after));
                    }
                }
            }
        }

        self.nodes = rebuilt;
        created
    }

    /// Unwrap this owner's wrappers back into plain text, then merge
    /// adjacent plain segments. Inverse of [`Span::wrap`]: the span's text
    /// content is unchanged. Safe to call when nothing is wrapped.
    pub fn clear_wrapped(&mut self, owner: OverlayOwner) {
        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .map(|node| match node {
                SegmentNode::Wrapped(wrapped) if wrapped.owner == owner => {
                    SegmentNode::Text(wrapped.text)
                }
                other => other,
            })
            .collect();
        self.normalize();
    }

    /// Merge adjacent plain-text segments.
    pub fn normalize(&mut self) {
        let mut merged: Vec<SegmentNode> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            match (merged.last_mut(), node) {
                (Some(SegmentNode::Text(tail)), SegmentNode::Text(text)) => {
                    tail.push_str(&text);
                }
                (_, node) => merged.push(node),
            }
        }
        self.nodes = merged;
    }

    /// Set the selected flag on this owner's wrappers with the given id.
    pub fn set_selected_by_id(&mut self, owner: OverlayOwner, id: &str, selected: bool) -> usize {
        let mut changed = 0;
        for node in &mut self.nodes {
            if let SegmentNode::Wrapped(wrapped) = node {
                if wrapped.owner == owner && wrapped.highlight_id.as_deref() == Some(id) {
                    wrapped.selected = selected;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Clear the selected flag on all of this owner's wrappers.
    pub fn clear_selection(&mut self, owner: OverlayOwner) {
        for node in &mut self.nodes {
            if let SegmentNode::Wrapped(wrapped) = node {
                if wrapped.owner == owner {
                    wrapped.selected = false;
                }
            }
        }
    }

    pub fn wrapped_count(&self, owner: OverlayOwner) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, SegmentNode::Wrapped(w) if w.owner == owner))
            .count()
    }
}

/// The text layer of one rendered page, tagged with its page number.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    /// 1-based page number.
    pub page_number: usize,
    /// Scale the spans were positioned at.
    pub scale: f32,
    pub spans: Vec<Span>,
    content_hash: String,
}

impl TextLayer {
    pub fn new(page_number: usize, scale: f32, spans: Vec<Span>) -> Self {
        let text: String = spans.iter().map(|span| span.text_content()).collect();
        Self {
            page_number,
            scale,
            spans,
            content_hash: hash_text(&text),
        }
    }

    /// All span texts concatenated in order, no separator.
    pub fn text_content(&self) -> String {
        self.spans.iter().map(|span| span.text_content()).collect()
    }

    /// Hash of the concatenated page text at build time. Anchors captured
    /// against this layer embed it and refuse to resolve against a layer
    /// with different content.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Remove all of one owner's wrappers across the layer. Idempotent.
    pub fn clear_owner(&mut self, owner: OverlayOwner) {
        for span in &mut self.spans {
            span.clear_wrapped(owner);
        }
    }

    pub fn wrapped_count(&self, owner: OverlayOwner) -> usize {
        self.spans.iter().map(|span| span.wrapped_count(owner)).sum()
    }
}

fn hash_text(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}
