//! Extraction backends and their registry.
//!
//! Every extraction technique — in-crate or external — sits behind one of
//! two uniform traits, [`TableBackend`] and [`FigureBackend`]. The
//! orchestrator depends only on these traits and a priority-ordered
//! [`BackendRegistry`]; it never knows which concrete technique it is
//! driving.
//!
//! The outcome convention is deliberate: `Ok(vec![])` means the backend ran
//! fine and found nothing — the cue to try the next backend — while `Err`
//! means it could not run. The two are never conflated.

pub mod figure;
pub mod lattice;
pub mod stream;
pub mod structured;
pub mod vision;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Document, FigureCandidate, PageSelection, Rect, TableCandidate};
use crate::raster::PageRasterizer;

/// One extraction request as seen by backends.
///
/// The document is shared, not borrowed, so CPU-bound backends can move
/// their work onto blocking worker threads.
#[derive(Clone)]
pub struct ExtractRequest {
    /// The document under extraction
    pub document: Arc<Document>,

    /// Which pages to cover
    pub pages: PageSelection,

    /// Rasterizer collaborator, when the caller provides one
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl ExtractRequest {
    /// Create a request over a document and page selection.
    pub fn new(document: Arc<Document>, pages: PageSelection) -> Self {
        Self {
            document,
            pages,
            rasterizer: None,
        }
    }

    /// Attach a rasterizer collaborator.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Concrete page indices covered by this request, ascending.
    pub fn page_indices(&self) -> Vec<usize> {
        self.pages.resolve(self.document.page_count())
    }
}

/// A table extraction backend.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &'static str;

    /// Extract table candidates from the requested pages.
    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<TableCandidate>>;
}

/// A figure extraction backend.
#[async_trait]
pub trait FigureBackend: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &'static str;

    /// Extract figure candidates from the requested pages.
    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<FigureCandidate>>;
}

/// Black-box collaborator: a ruled-line table finder returning plain grids.
pub trait GridSource: Send + Sync {
    /// All table grids found on a page.
    fn tables(&self, document: &Document, page_index: usize) -> Result<Vec<Vec<Vec<String>>>>;
}

impl<F> GridSource for F
where
    F: Fn(&Document, usize) -> Result<Vec<Vec<Vec<String>>>> + Send + Sync,
{
    fn tables(&self, document: &Document, page_index: usize) -> Result<Vec<Vec<Vec<String>>>> {
        self(document, page_index)
    }
}

/// One table as reported by a [`StructuredSource`].
#[derive(Debug, Clone, Default)]
pub struct StructuredTable {
    /// Cell grid, possibly ragged
    pub grid: Vec<Vec<String>>,
    /// Table bounding box, when the finder reports one
    pub bbox: Option<Rect>,
    /// Finder-reported accuracy, when available
    pub accuracy: Option<f32>,
    /// Per-cell bounding boxes, row-major, when available
    pub cell_boxes: Option<Vec<Vec<Rect>>>,
}

/// Black-box collaborator: a structure-aware table finder that reports
/// grids together with geometry and its own accuracy estimate.
pub trait StructuredSource: Send + Sync {
    /// All tables found on a page.
    fn tables(&self, document: &Document, page_index: usize) -> Result<Vec<StructuredTable>>;
}

impl<F> StructuredSource for F
where
    F: Fn(&Document, usize) -> Result<Vec<StructuredTable>> + Send + Sync,
{
    fn tables(&self, document: &Document, page_index: usize) -> Result<Vec<StructuredTable>> {
        self(document, page_index)
    }
}

/// Priority-ordered backend lists for one orchestrator.
///
/// Registration order is invocation order; first-success semantics depend
/// on it.
#[derive(Default)]
pub struct BackendRegistry {
    tables: Vec<Arc<dyn TableBackend>>,
    figures: Vec<Arc<dyn FigureBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table backend at the end of the priority list.
    pub fn register_table(&mut self, backend: Arc<dyn TableBackend>) {
        log::debug!("registered table backend: {}", backend.name());
        self.tables.push(backend);
    }

    /// Append a figure backend at the end of the priority list.
    pub fn register_figure(&mut self, backend: Arc<dyn FigureBackend>) {
        log::debug!("registered figure backend: {}", backend.name());
        self.figures.push(backend);
    }

    /// Table backends in priority order.
    pub fn tables(&self) -> &[Arc<dyn TableBackend>] {
        &self.tables
    }

    /// Figure backends in priority order.
    pub fn figures(&self) -> &[Arc<dyn FigureBackend>] {
        &self.figures
    }

    /// Look up a table backend by name.
    pub fn table(&self, name: &str) -> Option<Arc<dyn TableBackend>> {
        self.tables.iter().find(|b| b.name() == name).cloned()
    }

    /// Look up a figure backend by name.
    pub fn figure(&self, name: &str) -> Option<Arc<dyn FigureBackend>> {
        self.figures.iter().find(|b| b.name() == name).cloned()
    }

    /// Names of the registered table backends, in priority order.
    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.iter().map(|b| b.name()).collect()
    }

    /// Names of the registered figure backends, in priority order.
    pub fn figure_names(&self) -> Vec<&'static str> {
        self.figures.iter().map(|b| b.name()).collect()
    }
}
