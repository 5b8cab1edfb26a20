//! folio-view
//!
//! Headless core of a document-viewer widget: coordinate mapping, text
//! layers, search, and highlighting for PDF-style paged documents. The
//! rasterizer/decoder is an external collaborator behind the `engine`
//! traits; rendering hosts consume positions and overlay rectangles and
//! draw them however they like.
//!
//! # Modules
//!
//! - `geometry`: affine transforms, viewports, normalized rectangles
//! - `engine`: the render-backend contract and its error taxonomy
//! - `textlayer`: the positioned span/segment model, builder, and
//!   serialized range anchors
//! - `highlight`: text matching, overlay painting, the ephemeral
//!   selection highlighter, the persistent highlight engine, import/export
//! - `search`: geometry-based and layer-based search engines
//! - `events`: highlight lifecycle event dispatch
//! - `viewer`: the stateful facade tying it all together

pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod highlight;
pub mod search;
pub mod textlayer;
pub mod viewer;

pub use error::{Result, ViewerError};
pub use viewer::{InputEvent, Viewer, ViewerConfig};
