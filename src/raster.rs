//! Page rasterization boundary.
//!
//! Rendering PDF pages to bitmaps is a collaborator concern: the core only
//! decides *what* to render (a page, or a clipped region of one) and hands
//! the result through unchanged. Figure backends and the vision backend are
//! unavailable unless the caller supplies an implementation.

use crate::error::Result;
use crate::model::{Document, Rect};

/// A rendered bitmap, PNG-encoded.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// PNG bytes
    pub data: Vec<u8>,
}

/// Collaborator interface for rendering page regions.
///
/// `clip` is in page-point coordinates (top-left origin); `None` renders the
/// whole page. `dpi` scales the output: 72 dpi maps one point to one pixel.
/// Implementations must be thread-safe — calls happen on blocking worker
/// threads.
pub trait PageRasterizer: Send + Sync {
    /// Render a page, or a clipped region of it, to a PNG bitmap.
    fn render(
        &self,
        document: &Document,
        page_index: usize,
        clip: Option<Rect>,
        dpi: u32,
    ) -> Result<RenderedImage>;
}
