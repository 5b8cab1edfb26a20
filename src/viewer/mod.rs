//! Viewer facade
//!
//! Ties the subsystems together behind one stateful entry point: document
//! loading with chunked text extraction, page navigation, clamped zoom
//! with an LRU text-layer cache, both search engines, both highlighters,
//! and centralized input routing. Engines never subscribe to input
//! themselves; every outside event enters through [`Viewer::handle_input`]
//! and is dispatched from there.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{
    DocumentHandle, DocumentSource, EngineError, RenderBackend, RenderedPage,
};
use crate::error::{Result, ViewerError};
use crate::events::{EventDispatcher, HighlightEvent, ListenerId};
use crate::geometry::{dom_position, Rect, Viewport};
use crate::highlight::{
    export_csv, export_json, import_csv, import_json, ActiveHighlight, EphemeralHighlighter,
    Highlight, ScrollTarget, SelectionHighlighter, SelectionSnapshot,
};
use crate::search::{
    GeometryItem, GeometrySearch, LayerSearch, PageGeometry, SearchOptions, SearchResult,
};
use crate::textlayer::{build_text_layer, TextLayer};

const ZOOM_FACTOR: f32 = 1.25;

fn default_min_scale() -> f32 {
    0.25
}
fn default_max_scale() -> f32 {
    4.0
}
fn default_scale() -> f32 {
    1.0
}
fn default_text_chunk_size() -> usize {
    5
}
fn default_cache_pages() -> usize {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    #[serde(default = "default_scale")]
    pub default_scale: f32,
    /// Pages per text-extraction batch during load.
    #[serde(default = "default_text_chunk_size")]
    pub text_chunk_size: usize,
    /// Text layers kept in the LRU cache.
    #[serde(default = "default_cache_pages")]
    pub cache_pages: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            default_scale: default_scale(),
            text_chunk_size: default_text_chunk_size(),
            cache_pages: default_cache_pages(),
        }
    }
}

/// Outside events, routed centrally by the facade.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// A native selection finished (mouseup with a non-collapsed range).
    SelectionFinished(SelectionSnapshot),
    Click {
        /// 1-based page number the click landed on.
        page_number: usize,
        x: f32,
        y: f32,
        within_text_layer: bool,
        within_highlight: bool,
    },
    ContextMenu {
        page_number: usize,
        x: f32,
        y: f32,
    },
    Escape,
    Copy,
    Resize {
        container_width: f32,
        container_height: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FitMode {
    Width,
    Height,
}

/// Cache key: page number plus scale as integer hundredths.
fn layer_key(page_number: usize, scale: f32) -> (usize, u32) {
    (page_number, (scale * 100.0).round() as u32)
}

pub struct Viewer {
    backend: Box<dyn RenderBackend>,
    config: ViewerConfig,
    document: Option<Box<dyn DocumentHandle>>,
    page_count: usize,
    current_page: usize,
    scale: f32,
    fit_mode: Option<FitMode>,
    /// Base (scale 1) page sizes captured at load; `None` for pages whose
    /// extraction failed.
    page_sizes: Vec<Option<(f32, f32)>>,
    layer_cache: Mutex<LruCache<(usize, u32), TextLayer>>,
    dispatcher: EventDispatcher,
    geometry_search: GeometrySearch,
    layer_search: LayerSearch,
    /// Live layer-search query, replayed onto layers rebuilt after a zoom
    /// change.
    active_layer_query: Option<(String, SearchOptions)>,
    highlighter: SelectionHighlighter,
    ephemeral: EphemeralHighlighter,
}

impl Viewer {
    pub fn new(backend: Box<dyn RenderBackend>, config: ViewerConfig) -> Self {
        let scale = config
            .default_scale
            .clamp(config.min_scale, config.max_scale);
        let capacity =
            NonZeroUsize::new(config.cache_pages.max(1)).unwrap_or(NonZeroUsize::MIN);
        let dispatcher = EventDispatcher::default();
        Self {
            backend,
            document: None,
            page_count: 0,
            current_page: 1,
            scale,
            fit_mode: None,
            page_sizes: Vec::new(),
            layer_cache: Mutex::new(LruCache::new(capacity)),
            geometry_search: GeometrySearch::new(),
            layer_search: LayerSearch::new(),
            active_layer_query: None,
            highlighter: SelectionHighlighter::new(dispatcher.clone()),
            ephemeral: EphemeralHighlighter::new(scale),
            dispatcher,
            config,
        }
    }

    /// Install the clipboard used for copy-from-highlight.
    pub fn with_clipboard<F>(mut self, clipboard: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.ephemeral = EphemeralHighlighter::new(self.scale).with_clipboard(clipboard);
        self
    }

    /// Open a document, replacing any currently loaded one. Outstanding
    /// renders against the old document settle as cancelled inside the
    /// backend and are swallowed where awaited. Text geometry is extracted
    /// in sequential chunks so early pages become searchable first; a page
    /// whose extraction fails is skipped, not fatal.
    ///
    /// Returns the page count.
    pub async fn load_document(&mut self, source: DocumentSource) -> Result<usize> {
        let document = self.backend.open_document(source).await?;
        let page_count = document.page_count();

        self.reset_document_state();

        let mut geometry = Vec::with_capacity(page_count);
        let mut page_sizes: Vec<Option<(f32, f32)>> = vec![None; page_count];
        let numbers: Vec<usize> = (1..=page_count).collect();
        for chunk in numbers.chunks(self.config.text_chunk_size.max(1)) {
            let extractions = chunk.iter().map(|&number| {
                let document = &document;
                async move {
                    let page = document.page(number).await?;
                    let size = page.size();
                    let content = page.text_content().await?;
                    Ok::<_, EngineError>((number, size, content))
                }
            });
            for outcome in futures::future::join_all(extractions).await {
                match outcome {
                    Ok((number, size, content)) => {
                        page_sizes[number - 1] = Some(size);
                        let viewport = Viewport::for_page(size.0, size.1, 1.0);
                        let items = content
                            .items
                            .iter()
                            .filter(|item| !item.text.is_empty())
                            .map(|item| {
                                let position = dom_position(&item.transform, &viewport.transform);
                                GeometryItem {
                                    text: item.text.clone(),
                                    x: position.left,
                                    y: position.top,
                                    width: item.width,
                                    height: position.font_size,
                                }
                            })
                            .collect();
                        geometry.push(PageGeometry {
                            page_number: number,
                            items,
                        });
                    }
                    Err(error) if error.is_cancelled() => {
                        warn!(%error, "text extraction superseded, skipping page");
                    }
                    Err(error) => {
                        warn!(%error, "text extraction failed, page will not be searchable");
                    }
                }
            }
        }

        self.geometry_search.set_pages(geometry);
        self.page_sizes = page_sizes;
        self.page_count = page_count;
        self.current_page = 1;
        self.document = Some(document);
        debug!(page_count, "document loaded");
        Ok(page_count)
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn go_to_page(&mut self, page_number: usize) -> Result<()> {
        if self.document.is_none() {
            return Err(ViewerError::NoDocument);
        }
        if page_number < 1 || page_number > self.page_count {
            return Err(ViewerError::Engine(EngineError::PageNotFound {
                page: page_number,
                count: self.page_count,
            }));
        }
        self.current_page = page_number;
        if self
            .ephemeral
            .active()
            .is_some_and(|active| active.page_number != page_number)
        {
            self.ephemeral.on_escape();
        }
        Ok(())
    }

    /// Rasterize a page at the current scale. A cancelled render (the
    /// document was replaced mid-flight) yields `Ok(None)`.
    pub async fn render_page(&self, page_number: usize) -> Result<Option<RenderedPage>> {
        let document = self.document.as_ref().ok_or(ViewerError::NoDocument)?;
        let page = document.page(page_number).await?;
        let viewport = page.viewport(self.scale);
        match page.render(&viewport).await {
            Ok(rendered) => Ok(Some(rendered)),
            Err(error) if error.is_cancelled() => {
                warn!(page_number, %error, "render cancelled");
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Build (or fetch cached) the page's text layer at the current scale
    /// and replay stored highlights onto it.
    pub async fn prepare_page(&mut self, page_number: usize) -> Result<()> {
        let key = layer_key(page_number, self.scale);
        if self.layer_cache.lock().contains(&key) {
            return Ok(());
        }
        let document = self.document.as_ref().ok_or(ViewerError::NoDocument)?;
        let page = document.page(page_number).await?;
        let mut layer = build_text_layer(page.as_ref(), page_number, self.scale).await?;
        self.highlighter.restore(&mut layer);
        self.layer_cache.lock().put(key, layer);
        if let Some((query, options)) = self.active_layer_query.clone() {
            let mut cache = self.layer_cache.lock();
            let mut layers: Vec<&mut TextLayer> =
                cache.iter_mut().map(|(_, layer)| layer).collect();
            layers.sort_by_key(|layer| layer.page_number);
            self.layer_search.search(&mut layers, &query, &options);
        }
        Ok(())
    }

    /// Run a function against the page's live text layer, if cached.
    pub fn with_layer<R>(
        &self,
        page_number: usize,
        f: impl FnOnce(&TextLayer) -> R,
    ) -> Option<R> {
        let mut cache = self.layer_cache.lock();
        cache.get(&layer_key(page_number, self.scale)).map(f)
    }

    // Zoom. All paths clamp; a change drops the layer cache (entries are
    // scale-keyed) and re-emits the ephemeral highlight's overlays.

    pub fn set_zoom(&mut self, scale: f32) -> Result<f32> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ViewerError::InvalidScale(scale));
        }
        let clamped = scale.clamp(self.config.min_scale, self.config.max_scale);
        if (clamped - self.scale).abs() > f32::EPSILON {
            self.scale = clamped;
            self.layer_cache.lock().clear();
            let mut no_layers: [&mut TextLayer; 0] = [];
            self.layer_search.clear(&mut no_layers);
            self.ephemeral.set_scale(clamped);
        }
        Ok(self.scale)
    }

    pub fn zoom_in(&mut self) -> Result<f32> {
        self.fit_mode = None;
        self.set_zoom(self.scale * ZOOM_FACTOR)
    }

    pub fn zoom_out(&mut self) -> Result<f32> {
        self.fit_mode = None;
        self.set_zoom(self.scale / ZOOM_FACTOR)
    }

    pub fn fit_to_width(&mut self, container_width: f32) -> Result<f32> {
        let (width, _) = self.page_base_size(self.current_page)?;
        self.fit_mode = Some(FitMode::Width);
        self.set_zoom(container_width / width)
    }

    pub fn fit_to_height(&mut self, container_height: f32) -> Result<f32> {
        let (_, height) = self.page_base_size(self.current_page)?;
        self.fit_mode = Some(FitMode::Height);
        self.set_zoom(container_height / height)
    }

    fn page_base_size(&self, page_number: usize) -> Result<(f32, f32)> {
        if self.document.is_none() {
            return Err(ViewerError::NoDocument);
        }
        self.page_sizes
            .get(page_number.saturating_sub(1))
            .copied()
            .flatten()
            .ok_or(ViewerError::Engine(EngineError::PageNotFound {
                page: page_number,
                count: self.page_count,
            }))
    }

    // Search.

    /// Geometry-based search over the whole document; available as soon
    /// as load finishes, no text layers required.
    pub fn search(&mut self, query: &str, options: &SearchOptions) -> &[SearchResult] {
        self.geometry_search.search(query, options)
    }

    /// Search overlay batch for one page at the current scale.
    pub fn search_overlays(&self, page_number: usize) -> Vec<Rect> {
        self.geometry_search.overlays_for_page(page_number, self.scale)
    }

    /// Layer-based search over every cached layer (the current page's
    /// layer is built on demand first). Pages without a live layer are
    /// skipped.
    pub async fn search_in_text_layer(
        &mut self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        self.active_layer_query = if query.trim().is_empty() {
            None
        } else {
            Some((query.to_string(), *options))
        };
        self.prepare_page(self.current_page).await?;
        let mut cache = self.layer_cache.lock();
        let mut layers: Vec<&mut TextLayer> = cache.iter_mut().map(|(_, layer)| layer).collect();
        layers.sort_by_key(|layer| layer.page_number);
        Ok(self.layer_search.search(&mut layers, query, options).to_vec())
    }

    pub fn search_next(&mut self) -> Option<ScrollTarget> {
        let mut cache = self.layer_cache.lock();
        let mut layers: Vec<&mut TextLayer> = cache.iter_mut().map(|(_, layer)| layer).collect();
        self.layer_search.next(&mut layers)
    }

    pub fn search_previous(&mut self) -> Option<ScrollTarget> {
        let mut cache = self.layer_cache.lock();
        let mut layers: Vec<&mut TextLayer> = cache.iter_mut().map(|(_, layer)| layer).collect();
        self.layer_search.previous(&mut layers)
    }

    pub fn search_display(&self) -> Option<crate::search::NavDisplay> {
        self.layer_search.display()
    }

    pub fn clear_search(&mut self) {
        self.active_layer_query = None;
        self.geometry_search.clear();
        let mut cache = self.layer_cache.lock();
        let mut layers: Vec<&mut TextLayer> = cache.iter_mut().map(|(_, layer)| layer).collect();
        self.layer_search.clear(&mut layers);
    }

    // Persistent highlights.

    /// Create a highlight from a span-level range on a page's live layer.
    /// The page must have been prepared first.
    pub fn create_highlight(
        &mut self,
        page_number: usize,
        start_span: usize,
        start_offset: usize,
        end_span: usize,
        end_offset: usize,
        color: Option<&str>,
    ) -> Result<Highlight> {
        let mut cache = self.layer_cache.lock();
        let layer = cache
            .get_mut(&layer_key(page_number, self.scale))
            .ok_or(ViewerError::NoDocument)?;
        Ok(self.highlighter.create_from_range(
            layer,
            start_span,
            start_offset,
            end_span,
            end_offset,
            color,
        )?)
    }

    pub fn remove_highlight(&mut self, id: &str) -> Option<Highlight> {
        let mut cache = self.layer_cache.lock();
        let page_number = self.highlighter.get(id)?.page_number;
        let layer = cache.get_mut(&layer_key(page_number, self.scale));
        self.highlighter.remove(id, layer)
    }

    pub fn set_highlight_color(&mut self, id: &str, color: &str) -> bool {
        self.highlighter.set_color(id, color)
    }

    pub fn highlights(&self) -> &[Highlight] {
        self.highlighter.highlights()
    }

    pub fn export_highlights_json(&self) -> Result<String> {
        Ok(export_json(self.highlighter.highlights())?)
    }

    pub fn export_highlights_csv(&self) -> Result<String> {
        Ok(export_csv(self.highlighter.highlights())?)
    }

    /// Replace the highlight store from a JSON export and replay the
    /// anchors onto every cached layer. Anchors that fail to resolve are
    /// skipped, not fatal.
    pub fn import_highlights_json(&mut self, data: &str) -> Result<usize> {
        let imported = import_json(data)?;
        self.install_highlights(imported)
    }

    /// Replace the highlight store from a CSV export. CSV rows carry no
    /// anchors, so nothing re-paints until ranges are re-created.
    pub fn import_highlights_csv(&mut self, data: &str) -> Result<usize> {
        let imported = import_csv(data)?;
        self.install_highlights(imported)
    }

    fn install_highlights(&mut self, highlights: Vec<Highlight>) -> Result<usize> {
        let count = highlights.len();
        self.highlighter.load(highlights);
        let mut cache = self.layer_cache.lock();
        for (_, layer) in cache.iter_mut() {
            layer.clear_owner(crate::textlayer::OverlayOwner::Highlights);
            self.highlighter.restore(layer);
        }
        Ok(count)
    }

    // Ephemeral selection highlight.

    pub fn active_highlight(&self) -> Option<&ActiveHighlight> {
        self.ephemeral.active()
    }

    pub fn selection_overlays(&self) -> &[Rect] {
        self.ephemeral.overlays()
    }

    /// Whether the host should clear the native selection now.
    pub fn take_selection_clear_request(&mut self) -> bool {
        self.ephemeral.take_selection_clear_request()
    }

    // Events.

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&HighlightEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.dispatcher.unsubscribe(id);
    }

    /// Central input routing. Engines never see raw input; each event is
    /// dispatched here to exactly the parties that want it.
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::SelectionFinished(snapshot) => {
                self.ephemeral.on_selection(&snapshot);
            }
            InputEvent::Click {
                page_number,
                x,
                y,
                within_text_layer,
                within_highlight,
            } => {
                // A click on any other page counts as outside the active
                // selection highlight, wherever on that page it lands.
                if self
                    .ephemeral
                    .active()
                    .is_some_and(|active| active.page_number != page_number)
                {
                    self.ephemeral.on_outside_click();
                }
                if within_highlight {
                    self.highlighter.handle_click(page_number, x, y, self.scale);
                } else if !within_text_layer {
                    self.ephemeral.on_outside_click();
                }
            }
            InputEvent::ContextMenu { page_number, x, y } => {
                self.highlighter
                    .handle_context_menu(page_number, x, y, self.scale);
            }
            InputEvent::Escape => {
                self.ephemeral.on_escape();
            }
            InputEvent::Copy => {
                self.ephemeral.on_copy();
            }
            InputEvent::Resize {
                container_width,
                container_height,
            } => {
                let refit = match self.fit_mode {
                    Some(FitMode::Width) => self.fit_to_width(container_width),
                    Some(FitMode::Height) => self.fit_to_height(container_height),
                    None => Ok(self.scale),
                };
                if let Err(error) = refit {
                    warn!(%error, "refit after resize failed");
                }
            }
        }
    }

    /// Tear everything down. Safe to call more than once.
    pub fn destroy(&mut self) {
        self.document = None;
        self.reset_document_state();
        self.dispatcher.clear();
        self.ephemeral.on_escape();
    }

    fn reset_document_state(&mut self) {
        self.page_count = 0;
        self.current_page = 1;
        self.page_sizes.clear();
        self.fit_mode = None;
        self.layer_cache.lock().clear();
        self.geometry_search.clear();
        self.active_layer_query = None;
        let mut no_layers: [&mut TextLayer; 0] = [];
        self.layer_search.clear(&mut no_layers);
        self.highlighter.load(Vec::new());
    }
}
