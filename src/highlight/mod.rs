//! Highlighting
//!
//! Two highlight lifetimes share this module: the ephemeral
//! single-active-selection highlighter and the persistent engine with
//! anchored, exportable records. Text matching and layer painting are
//! the shared machinery underneath both, plus search.

pub mod engine;
pub mod ephemeral;
pub mod export;
pub mod matcher;
pub mod painter;
pub mod types;

pub use engine::{HighlightError, SelectionHighlighter};
pub use ephemeral::{resolve_page_number, AncestorRef, EphemeralHighlighter, SelectionSnapshot};
pub use export::{export_csv, export_json, import_csv, import_json, ExportError};
pub use matcher::{find_text_in_layer, MatchOptions, MatchPoint, TextLayerMatch};
pub use painter::{
    clear_highlights, highlight_matches, select_match, unwrap_highlight, wrap_resolved_range,
    ScrollTarget,
};
pub use types::{
    generate_highlight_id, ActiveHighlight, Highlight, DEFAULT_HIGHLIGHT_COLOR,
};
