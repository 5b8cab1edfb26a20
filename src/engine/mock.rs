//! Scripted render backend for tests.
//!
//! Pages are described up front; rendering returns blank pixels. Opening a
//! new document supersedes the previous one, and superseded pages settle
//! their renders as [`EngineError::Cancelled`], mirroring real engine
//! behavior under rapid successive loads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{
    DocumentHandle, DocumentSource, EngineError, EngineResult, PageHandle, RenderBackend,
    RenderedPage, TextContent, TextItem,
};
use crate::geometry::{Matrix, Viewport};

#[derive(Debug, Clone)]
pub struct MockPageSpec {
    pub width: f32,
    pub height: f32,
    pub items: Vec<TextItem>,
    pub fail_text: bool,
}

impl MockPageSpec {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
            fail_text: false,
        }
    }

    /// Add a horizontal text run at the given page position and font size.
    pub fn with_run(mut self, text: &str, font_size: f32, x: f32, y: f32, width: f32) -> Self {
        self.items.push(TextItem {
            text: text.to_string(),
            transform: Matrix::new(font_size, 0.0, 0.0, font_size, x, y),
            width,
        });
        self
    }

    pub fn failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }
}

pub struct MockBackend {
    pages: Vec<MockPageSpec>,
    fail_load: Option<String>,
    doc_counter: AtomicU64,
    current_doc: Arc<AtomicU64>,
}

impl MockBackend {
    pub fn new(pages: Vec<MockPageSpec>) -> Self {
        Self {
            pages,
            fail_load: None,
            doc_counter: AtomicU64::new(0),
            current_doc: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            pages: Vec::new(),
            fail_load: Some(message.to_string()),
            doc_counter: AtomicU64::new(0),
            current_doc: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A one-page backend with one text run per `(text, x, y)` entry,
    /// 12pt on a US-letter page.
    pub fn single_page(runs: &[(&str, f32, f32)]) -> Self {
        let mut spec = MockPageSpec::new(612.0, 792.0);
        for (text, x, y) in runs {
            let width = text.chars().count() as f32 * 6.0;
            spec = spec.with_run(text, 12.0, *x, *y, width);
        }
        Self::new(vec![spec])
    }
}

#[async_trait]
impl RenderBackend for MockBackend {
    async fn open_document(&self, _source: DocumentSource) -> EngineResult<Box<dyn DocumentHandle>> {
        if let Some(message) = &self.fail_load {
            return Err(EngineError::Load(message.clone()));
        }
        let id = self.doc_counter.fetch_add(1, Ordering::SeqCst) + 1;
        // Opening supersedes any previously open document.
        self.current_doc.store(id, Ordering::SeqCst);
        Ok(Box::new(MockDocument {
            id,
            pages: self.pages.clone(),
            current_doc: Arc::clone(&self.current_doc),
        }))
    }
}

struct MockDocument {
    id: u64,
    pages: Vec<MockPageSpec>,
    current_doc: Arc<AtomicU64>,
}

#[async_trait]
impl DocumentHandle for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page(&self, number: usize) -> EngineResult<Box<dyn PageHandle>> {
        if number < 1 || number > self.pages.len() {
            return Err(EngineError::PageNotFound {
                page: number,
                count: self.pages.len(),
            });
        }
        Ok(Box::new(MockPage {
            number,
            spec: self.pages[number - 1].clone(),
            doc_id: self.id,
            current_doc: Arc::clone(&self.current_doc),
        }))
    }
}

struct MockPage {
    number: usize,
    spec: MockPageSpec,
    doc_id: u64,
    current_doc: Arc<AtomicU64>,
}

#[async_trait]
impl PageHandle for MockPage {
    fn size(&self) -> (f32, f32) {
        (self.spec.width, self.spec.height)
    }

    async fn text_content(&self) -> EngineResult<TextContent> {
        if self.spec.fail_text {
            return Err(EngineError::TextExtraction("scripted failure".to_string()));
        }
        Ok(TextContent {
            items: self.spec.items.clone(),
        })
    }

    async fn render(&self, viewport: &Viewport) -> EngineResult<RenderedPage> {
        if self.current_doc.load(Ordering::SeqCst) != self.doc_id {
            return Err(EngineError::Cancelled(
                "superseded by a newer document".to_string(),
            ));
        }
        let width = viewport.width.round().max(1.0) as u32;
        let height = viewport.height.round().max(1.0) as u32;
        Ok(RenderedPage {
            page_number: self.number,
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_superseded_render_is_cancelled() {
        let backend = MockBackend::single_page(&[("Hello", 72.0, 700.0)]);
        let first = backend.open_document("a.pdf".into()).await.unwrap();
        let page = first.page(1).await.unwrap();
        let viewport = page.viewport(1.0);

        // A second open supersedes the first document.
        let _second = backend.open_document("b.pdf".into()).await.unwrap();

        let err = page.render(&viewport).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_page_bounds() {
        let backend = MockBackend::single_page(&[("x", 0.0, 0.0)]);
        let doc = backend.open_document("a.pdf".into()).await.unwrap();
        match doc.page(2).await {
            Err(EngineError::PageNotFound { page: 2, count: 1 }) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("page 2 should not exist"),
        }
    }
}
