//! # clinpdf
//!
//! Multi-strategy table and figure extraction from clinical-study PDFs.
//!
//! No single extraction technique survives contact with real papers:
//! ruled-line finders want bordered tables, text-alignment analysis wants
//! borderless ones, scanned pages want a vision model. This library runs a
//! priority-ordered list of extraction backends over a document, commits to
//! the first backend whose result is non-empty and policy-accepted, and
//! normalizes every backend's output — raw grids, HTML markup, delimited
//! markdown, rendered regions — into one canonical representation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use clinpdf::{Extractor, PageSelection};
//!
//! #[tokio::main]
//! async fn main() -> clinpdf::Result<()> {
//!     let document = clinpdf::load_file("study.pdf")?;
//!
//!     let extractor = Extractor::builder().build()?;
//!     let report = extractor
//!         .extract_tables(Arc::new(document), PageSelection::All, None)
//!         .await;
//!
//!     for table in &report.tables {
//!         println!("page {}: {} rows\n{}", table.page, table.rows, table.markdown);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Fallback orchestration**: first-success across structured, stream,
//!   lattice, and vision backends, with the full attempt trail returned
//! - **Region detection**: caption-anchored and cluster-based figure
//!   regions from page primitives
//! - **Canonical tables**: ragged-free grids plus pipe-delimited markdown,
//!   whatever the source format
//! - **Confidence scoring**: structural plausibility scores and clinical
//!   table classification, exposed for caller-side filtering

pub mod backend;
pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod raster;
pub mod score;

// Re-export commonly used types
pub use backend::stream::StreamConfig;
pub use backend::{
    BackendRegistry, ExtractRequest, GridSource, StructuredSource, StructuredTable,
};
pub use config::{RetryPolicy, VisionConfig, VisionProvider};
pub use detect::{DetectionMethod, DetectorConfig, Region, RegionDetector};
pub use error::{Error, Result};
pub use model::{
    AttemptOutcome, Document, ExtractionAttempt, ExtractionTrail, FigureCandidate, Page,
    PageSelection, PlacedImage, Rect, TableCandidate, TableKind, Word,
};
pub use orchestrator::{AcceptPolicy, FigureExtraction, Orchestrator, TableExtraction};
pub use parser::{load_bytes, load_file, LoadOptions, PdfLoader};
pub use raster::{PageRasterizer, RenderedImage};
pub use score::ConfidenceScorer;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use backend::figure::{EmbeddedImageBackend, RegionRenderBackend};
use backend::lattice::LatticeTableBackend;
use backend::stream::StreamTableBackend;
use backend::structured::StructuredTableBackend;
use backend::vision::VisionTableBackend;

/// Configures and builds an [`Extractor`].
///
/// The collaborator slots mirror the backend priority order: a structured
/// finder first when present, the in-crate stream detector always, a
/// ruled-line grid finder next, the vision model last. Figure extraction
/// registers the region-render backend ahead of the embedded-object
/// fallback.
pub struct ExtractorBuilder {
    structured: Option<Arc<dyn StructuredSource>>,
    grid: Option<Arc<dyn GridSource>>,
    vision: Option<VisionConfig>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    stream_config: StreamConfig,
    detector_config: DetectorConfig,
    policy: AcceptPolicy,
    backend_timeout: Option<Duration>,
    render_dpi: u32,
}

impl ExtractorBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self {
            structured: None,
            grid: None,
            vision: None,
            rasterizer: None,
            stream_config: StreamConfig::default(),
            detector_config: DetectorConfig::default(),
            policy: AcceptPolicy::default(),
            backend_timeout: None,
            render_dpi: 150,
        }
    }

    /// Register a structure-aware table finder collaborator.
    pub fn with_structured_source(mut self, source: Arc<dyn StructuredSource>) -> Self {
        self.structured = Some(source);
        self
    }

    /// Register a ruled-line grid finder collaborator.
    pub fn with_grid_source(mut self, source: Arc<dyn GridSource>) -> Self {
        self.grid = Some(source);
        self
    }

    /// Enable the vision backend with the given configuration.
    pub fn with_vision(mut self, config: VisionConfig) -> Self {
        self.vision = Some(config);
        self
    }

    /// Register the page rasterizer collaborator (required for figure
    /// extraction and the vision backend).
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Set the acceptance policy.
    pub fn with_policy(mut self, policy: AcceptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound each backend invocation.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = Some(timeout);
        self
    }

    /// Tune the stream (alignment-analysis) backend.
    pub fn with_stream_config(mut self, config: StreamConfig) -> Self {
        self.stream_config = config;
        self
    }

    /// Tune region detection.
    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector_config = config;
        self
    }

    /// Set the figure render resolution.
    pub fn with_render_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }

    /// Build the extractor, registering backends in priority order.
    pub fn build(self) -> Result<Extractor> {
        let mut registry = BackendRegistry::new();

        if let Some(source) = self.structured {
            registry.register_table(Arc::new(StructuredTableBackend::new(source)));
        }
        registry.register_table(Arc::new(StreamTableBackend::with_config(
            self.stream_config,
        )));
        if let Some(source) = self.grid {
            registry.register_table(Arc::new(LatticeTableBackend::new(source)));
        }
        if let Some(config) = self.vision {
            registry.register_table(Arc::new(VisionTableBackend::new(config)?));
        }

        registry.register_figure(Arc::new(RegionRenderBackend::with_config(
            self.detector_config,
            self.render_dpi,
        )));
        registry.register_figure(Arc::new(EmbeddedImageBackend::with_dpi(self.render_dpi)));

        let mut orchestrator = Orchestrator::new(registry).with_policy(self.policy);
        if let Some(timeout) = self.backend_timeout {
            orchestrator = orchestrator.with_backend_timeout(timeout);
        }

        Ok(Extractor {
            orchestrator,
            rasterizer: self.rasterizer,
        })
    }
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled extraction pipeline: registry, orchestrator, and the
/// shared rasterizer collaborator.
pub struct Extractor {
    orchestrator: Orchestrator,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl Extractor {
    /// Start building an extractor.
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    /// Extract tables from the selected pages.
    pub async fn extract_tables(
        &self,
        document: Arc<Document>,
        pages: PageSelection,
        preferred_method: Option<&str>,
    ) -> TableExtraction {
        let request = self.request(document, pages);
        self.orchestrator
            .extract_tables(&request, preferred_method)
            .await
    }

    /// Extract figures from the selected pages.
    pub async fn extract_figures(
        &self,
        document: Arc<Document>,
        pages: PageSelection,
        preferred_method: Option<&str>,
    ) -> FigureExtraction {
        let request = self.request(document, pages);
        self.orchestrator
            .extract_figures(&request, preferred_method)
            .await
    }

    /// The underlying orchestrator.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    fn request(&self, document: Arc<Document>, pages: PageSelection) -> ExtractRequest {
        let mut request = ExtractRequest::new(document, pages);
        if let Some(rasterizer) = &self.rasterizer {
            request = request.with_rasterizer(Arc::clone(rasterizer));
        }
        request
    }
}

/// Load a PDF and extract tables with the default backend set.
///
/// Convenience wrapper for one-shot use; build an [`Extractor`] directly to
/// reuse backends across documents or to register collaborators.
pub async fn extract_tables<P: AsRef<Path>>(
    path: P,
    pages: PageSelection,
) -> Result<TableExtraction> {
    let path = path.as_ref().to_path_buf();
    let document = tokio::task::spawn_blocking(move || parser::load_file(path))
        .await
        .map_err(|e| Error::Backend(format!("load task failed: {e}")))??;

    let extractor = Extractor::builder().build()?;
    Ok(extractor
        .extract_tables(Arc::new(document), pages, None)
        .await)
}
