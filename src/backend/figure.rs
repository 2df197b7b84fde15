//! Figure extraction backends.
//!
//! [`RegionRenderBackend`] renders detected figure regions — whole figures,
//! not the individual raster objects they are assembled from. Rendering the
//! page region captures vector chart elements and overlaid text that raw
//! object extraction would lose. [`EmbeddedImageBackend`] is the plain
//! fallback: each placed raster object, rendered through its own rectangle.

use std::sync::Arc;

use async_trait::async_trait;

use crate::detect::{DetectionMethod, DetectorConfig, RegionDetector};
use crate::error::{Error, Result};
use crate::model::FigureCandidate;
use crate::raster::PageRasterizer;

use super::{ExtractRequest, FigureBackend};

/// Registry name of the region-render backend.
pub const RENDER_METHOD: &str = "render";

/// Registry name of the embedded-object backend.
pub const EMBEDDED_METHOD: &str = "embedded";

/// Figure backend rendering detected regions.
pub struct RegionRenderBackend {
    detector: Arc<RegionDetector>,
    dpi: u32,
}

impl RegionRenderBackend {
    /// Create a backend with the default detector at 150 dpi.
    pub fn new() -> Self {
        Self::with_detector(RegionDetector::new(), 150)
    }

    /// Create a backend with a custom detector configuration.
    pub fn with_config(config: DetectorConfig, dpi: u32) -> Self {
        Self::with_detector(RegionDetector::with_config(config), dpi)
    }

    fn with_detector(detector: RegionDetector, dpi: u32) -> Self {
        Self {
            detector: Arc::new(detector),
            dpi,
        }
    }
}

impl Default for RegionRenderBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FigureBackend for RegionRenderBackend {
    fn name(&self) -> &'static str {
        RENDER_METHOD
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<FigureCandidate>> {
        let rasterizer = require_rasterizer(request)?;
        let detector = Arc::clone(&self.detector);
        let document = Arc::clone(&request.document);
        let indices = request.page_indices();
        let dpi = self.dpi;

        tokio::task::spawn_blocking(move || {
            let mut figures = Vec::new();

            for index in indices {
                let Some(page) = document.page(index) else {
                    continue;
                };

                let regions = detector.detect(page);
                let mut figure_index = 0usize;

                for region in regions {
                    let rendered =
                        match rasterizer.render(&document, index, Some(region.bbox), dpi) {
                            Ok(img) => img,
                            Err(e) => {
                                log::warn!(
                                    "failed to render region on page {}: {}",
                                    index,
                                    e
                                );
                                continue;
                            }
                        };

                    let method = match region.method {
                        DetectionMethod::Caption => "render_by_caption",
                        DetectionMethod::Cluster => "render_by_cluster",
                    };

                    figures.push(FigureCandidate {
                        page: index,
                        figure_index,
                        bbox: region.bbox,
                        width: rendered.width,
                        height: rendered.height,
                        image: rendered.data,
                        caption: region.caption,
                        extraction_method: method.to_string(),
                        description: None,
                    });
                    figure_index += 1;
                }

                log::info!("render: {} figure(s) on page {}", figure_index, index);
            }

            Ok::<_, Error>(figures)
        })
        .await
        .map_err(|e| Error::Backend(format!("figure render task failed: {e}")))?
    }
}

/// Figure backend extracting each placed raster object as-is.
pub struct EmbeddedImageBackend {
    dpi: u32,
}

impl EmbeddedImageBackend {
    /// Create a backend rendering at 150 dpi.
    pub fn new() -> Self {
        Self { dpi: 150 }
    }

    /// Create a backend with a custom render resolution.
    pub fn with_dpi(dpi: u32) -> Self {
        Self { dpi }
    }
}

impl Default for EmbeddedImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FigureBackend for EmbeddedImageBackend {
    fn name(&self) -> &'static str {
        EMBEDDED_METHOD
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<FigureCandidate>> {
        let rasterizer = require_rasterizer(request)?;
        let document = Arc::clone(&request.document);
        let indices = request.page_indices();
        let dpi = self.dpi;

        tokio::task::spawn_blocking(move || {
            let mut figures = Vec::new();

            for index in indices {
                let Some(page) = document.page(index) else {
                    continue;
                };

                let mut figure_index = 0usize;
                for placed in &page.images {
                    if placed.bbox.is_degenerate() {
                        continue;
                    }

                    let rendered =
                        match rasterizer.render(&document, index, Some(placed.bbox), dpi) {
                            Ok(img) => img,
                            Err(e) => {
                                log::warn!(
                                    "failed to render image {} on page {}: {}",
                                    placed.name,
                                    index,
                                    e
                                );
                                continue;
                            }
                        };

                    figures.push(FigureCandidate {
                        page: index,
                        figure_index,
                        bbox: placed.bbox,
                        width: rendered.width,
                        height: rendered.height,
                        image: rendered.data,
                        caption: None,
                        extraction_method: EMBEDDED_METHOD.to_string(),
                        description: None,
                    });
                    figure_index += 1;
                }
            }

            Ok::<_, Error>(figures)
        })
        .await
        .map_err(|e| Error::Backend(format!("embedded image task failed: {e}")))?
    }
}

fn require_rasterizer(request: &ExtractRequest) -> Result<Arc<dyn PageRasterizer>> {
    request.rasterizer.clone().ok_or_else(|| {
        Error::BackendUnavailable("figure backends require a page rasterizer".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Page, PageSelection, PlacedImage, Rect, Word};
    use crate::raster::RenderedImage;

    /// Rasterizer stub returning a fixed-size blank image.
    struct StubRasterizer;

    impl PageRasterizer for StubRasterizer {
        fn render(
            &self,
            _document: &Document,
            _page_index: usize,
            clip: Option<Rect>,
            dpi: u32,
        ) -> Result<RenderedImage> {
            let scale = dpi as f32 / 72.0;
            let clip = clip.unwrap_or(Rect::new(0.0, 0.0, 612.0, 792.0));
            Ok(RenderedImage {
                width: (clip.width() * scale) as u32,
                height: (clip.height() * scale) as u32,
                data: vec![0u8; 16],
            })
        }
    }

    fn caption_doc() -> Arc<Document> {
        let mut page = Page::new(0, 612.0, 792.0);
        let mut cursor = 72.0;
        for token in ["Figure", "1.", "Enrollment", "flow"] {
            let width = token.chars().count() as f32 * 5.0;
            page.words.push(Word::new(
                token,
                Rect::new(cursor, 400.0, cursor + width, 410.0),
                10.0,
            ));
            cursor += width + 5.0;
        }
        let mut doc = Document::new();
        doc.add_page(page);
        Arc::new(doc)
    }

    #[tokio::test]
    async fn test_render_backend_produces_figure() {
        let backend = RegionRenderBackend::new();
        let request = ExtractRequest::new(caption_doc(), PageSelection::All)
            .with_rasterizer(Arc::new(StubRasterizer));

        let figures = backend.extract(&request).await.unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].extraction_method, "render_by_caption");
        assert!(figures[0].caption.as_deref().unwrap().starts_with("Figure 1."));
        assert!(figures[0].width > 0);
    }

    #[tokio::test]
    async fn test_render_backend_requires_rasterizer() {
        let backend = RegionRenderBackend::new();
        let request = ExtractRequest::new(caption_doc(), PageSelection::All);

        assert!(matches!(
            backend.extract(&request).await,
            Err(Error::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_embedded_backend_extracts_placed_images() {
        let mut page = Page::new(0, 612.0, 792.0);
        page.images.push(PlacedImage {
            name: "Im1".to_string(),
            bbox: Rect::new(100.0, 100.0, 300.0, 250.0),
        });
        let mut doc = Document::new();
        doc.add_page(page);

        let backend = EmbeddedImageBackend::new();
        let request = ExtractRequest::new(Arc::new(doc), PageSelection::All)
            .with_rasterizer(Arc::new(StubRasterizer));

        let figures = backend.extract(&request).await.unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].extraction_method, EMBEDDED_METHOD);
        assert!(figures[0].caption.is_none());
    }

    #[tokio::test]
    async fn test_empty_page_yields_nothing() {
        let mut doc = Document::new();
        doc.add_page(Page::new(0, 612.0, 792.0));

        let backend = RegionRenderBackend::new();
        let request = ExtractRequest::new(Arc::new(doc), PageSelection::All)
            .with_rasterizer(Arc::new(StubRasterizer));

        assert!(backend.extract(&request).await.unwrap().is_empty());
    }
}
