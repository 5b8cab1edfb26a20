//! Highlight records

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedRect;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ffff00";

/// A persistent highlight.
///
/// `position` is stored scale-independent (divided by the capture-time
/// scale), so reapplying it at any scale is a multiplication.
/// `serialized_range` is the compact string form of a
/// [`crate::textlayer::RangeAnchor`], kept opaque here so exported records
/// survive format evolution; it is parsed again on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub text: String,
    pub color: String,
    pub position: NormalizedRect,
    /// 1-based page number.
    pub page_number: usize,
    /// Creation time, milliseconds since the epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialized_range: Option<String>,
}

/// The single ephemeral highlight driven by a live selection. At most one
/// exists at a time; it is replaced wholesale on every new selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveHighlight {
    /// 1-based page number the selection was attributed to.
    pub page_number: usize,
    pub text: String,
    /// One scale-independent rectangle per selection client rect.
    pub rectangles: Vec<NormalizedRect>,
    /// Capture time, milliseconds since the epoch.
    pub timestamp: i64,
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Collision-resistant (not cryptographic) highlight id: millisecond
/// timestamp plus a random suffix. Unique enough within a session.
pub fn generate_highlight_id() -> String {
    use rand::Rng;
    let suffix: u32 = rand::thread_rng().gen_range(0x10000..0xfffff);
    format!("hl-{}-{:x}", now_millis(), suffix)
}
