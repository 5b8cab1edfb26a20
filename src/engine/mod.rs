//! Render engine contract
//!
//! The PDF decoder/rasterizer is an external collaborator. This module
//! defines the narrow interface the viewer core consumes: open a document,
//! get pages, get per-page text content, render to pixels. Everything else
//! about the engine (loading mechanism, decoding internals) is out of scope.

mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use types::{DocumentSource, RenderedPage, TextContent, TextItem};

use async_trait::async_trait;
use thiserror::Error;

use crate::geometry::Viewport;

/// Errors surfaced by the render engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Document failed to fetch or parse.
    #[error("failed to load document: {0}")]
    Load(String),

    /// Page index out of range.
    #[error("page {page} not found (document has {count} pages)")]
    PageNotFound { page: usize, count: usize },

    /// Rasterization failed.
    #[error("failed to render page: {0}")]
    Render(String),

    /// Text content extraction failed.
    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    /// An in-flight operation was superseded (e.g. by a newer load). This
    /// is an expected outcome of rapid successive loads and zooms; callers
    /// log it at warning level and move on rather than surfacing it.
    #[error("render cancelled: {0}")]
    Cancelled(String),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled(_))
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Entry point into the render engine: opens documents.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn open_document(&self, source: DocumentSource) -> EngineResult<Box<dyn DocumentHandle>>;
}

/// An open document.
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Total page count.
    fn page_count(&self) -> usize;

    /// Get a page by 1-based number.
    async fn page(&self, number: usize) -> EngineResult<Box<dyn PageHandle>>;
}

/// A single page of an open document.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Base page size in points (scale 1).
    fn size(&self) -> (f32, f32);

    /// Viewport for this page at the given scale.
    fn viewport(&self, scale: f32) -> Viewport {
        let (width, height) = self.size();
        Viewport::for_page(width, height, scale)
    }

    /// Extract the page's text runs with their content-stream transforms.
    async fn text_content(&self) -> EngineResult<TextContent>;

    /// Rasterize the page at the given viewport. May settle as
    /// [`EngineError::Cancelled`] when superseded by a newer load.
    async fn render(&self, viewport: &Viewport) -> EngineResult<RenderedPage>;
}
