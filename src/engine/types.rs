//! Engine data types
//!
//! Inputs and outputs of the render engine contract.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::geometry::Matrix;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Url(String),
}

impl From<&str> for DocumentSource {
    fn from(url: &str) -> Self {
        DocumentSource::Url(url.to_string())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        DocumentSource::Path(path)
    }
}

/// One text run from a page's content stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    /// The run's text.
    pub text: String,
    /// Content-stream transform placing the run on the page.
    pub transform: Matrix,
    /// Advance width of the run in text space.
    pub width: f32,
}

/// All text runs on a page, in content-stream order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

/// A rasterized page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page_number: usize,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// RGBA pixel data, row-major.
    pub pixels: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_url() {
        let source = DocumentSource::from("https://example.org/doc.pdf");
        assert_eq!(
            source,
            DocumentSource::Url("https://example.org/doc.pdf".to_string())
        );
    }

    #[test]
    fn test_text_item_serialization() {
        let item = TextItem {
            text: "Hello".to_string(),
            transform: Matrix::new(12.0, 0.0, 0.0, 12.0, 72.0, 700.0),
            width: 30.0,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"text\":\"Hello\""));
        let back: TextItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transform, item.transform);
    }
}
