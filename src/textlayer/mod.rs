//! Text layers
//!
//! Construction and ownership model for per-page text layers, plus the
//! range anchors that let highlights survive a layer rebuild.

mod anchor;
mod builder;
mod model;

pub use anchor::{
    is_before, AnchorError, AnchorParseError, AnchorPoint, RangeAnchor, ResolvedRange,
};
pub use builder::{build_text_layer, layer_from_content};
pub use model::{OverlayOwner, SegmentNode, Span, TextLayer, WrappedSegment};
