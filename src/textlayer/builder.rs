//! Text-layer construction
//!
//! Projects a page's text runs into positioned spans. Extraction failures
//! propagate to the caller; there is no retry here.

use crate::engine::{EngineResult, PageHandle, TextContent};
use crate::geometry::{dom_position, Viewport};

use super::model::{Span, TextLayer};

/// Build the text layer for a page at the given scale.
pub async fn build_text_layer(
    page: &dyn PageHandle,
    page_number: usize,
    scale: f32,
) -> EngineResult<TextLayer> {
    let viewport = page.viewport(scale);
    let content = page.text_content().await?;
    Ok(layer_from_content(page_number, &content, &viewport))
}

/// Assemble a layer from already-extracted text content. One span per
/// non-empty text run, in content-stream order.
pub fn layer_from_content(
    page_number: usize,
    content: &TextContent,
    viewport: &Viewport,
) -> TextLayer {
    let spans: Vec<Span> = content
        .items
        .iter()
        .filter(|item| !item.text.is_empty())
        .map(|item| {
            Span::new(
                &item.text,
                dom_position(&item.transform, &viewport.transform),
                item.width * viewport.scale,
            )
        })
        .collect();

    TextLayer::new(page_number, viewport.scale, spans)
}
