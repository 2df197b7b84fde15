//! Document and page views the extraction core operates on.
//!
//! A [`Document`] is an ordered sequence of read-only [`Page`]s. Each page
//! exposes its text primitives (words with bounding boxes) and image
//! primitives (placed raster objects). The core never mutates a document;
//! it is built once by the loader (or directly by a caller) and shared into
//! the orchestrator for the duration of one extraction request.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Rect;

/// A word on a page with position and font information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    /// The text content
    pub text: String,
    /// Bounding box in page points (top-left origin)
    pub bbox: Rect,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl Word {
    /// Create a new word.
    pub fn new(text: impl Into<String>, bbox: Rect, font_size: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            font_size,
            font_name: String::new(),
        }
    }
}

/// A raster object placed on a page.
///
/// The bytes themselves stay inside the PDF; only the placement rectangle is
/// carried here. Region detection clusters these rectangles to find figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedImage {
    /// XObject resource name
    pub name: String,
    /// Placement rectangle in page points (top-left origin)
    pub bbox: Rect,
}

/// A single page in the document. Read-only to the extraction core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based)
    pub index: usize,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Words with bounding boxes
    pub words: Vec<Word>,

    /// Placed raster objects
    pub images: Vec<PlacedImage>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            words: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Page boundary rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Check if the page carries no primitives at all.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.images.is_empty()
    }

    /// Words whose center point falls inside `clip`.
    pub fn words_in(&self, clip: &Rect) -> Vec<&Word> {
        self.words
            .iter()
            .filter(|w| {
                let (cx, cy) = w.bbox.center();
                clip.contains_point(cx, cy)
            })
            .collect()
    }

    /// Reconstruct the text inside `clip` in reading order.
    ///
    /// Words are grouped into lines by vertical proximity, lines sorted top
    /// to bottom, words within a line left to right. Lines are joined with
    /// newlines and words with single spaces.
    pub fn text_in(&self, clip: &Rect) -> String {
        let words = self.words_in(clip);
        lines_of(&words)
            .into_iter()
            .map(|line| {
                line.iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full page text in reading order.
    pub fn text(&self) -> String {
        self.text_in(&self.bounds())
    }
}

/// Group words into lines by vertical proximity.
///
/// Tolerance scales with each word's font size, matching how tightly lines
/// pack at different text sizes.
fn lines_of<'a>(words: &[&'a Word]) -> Vec<Vec<&'a Word>> {
    if words.is_empty() {
        return vec![];
    }

    let mut sorted: Vec<&Word> = words.to_vec();
    sorted.sort_by(|a, b| {
        let y_cmp = a
            .bbox
            .y0
            .partial_cmp(&b.bbox.y0)
            .unwrap_or(std::cmp::Ordering::Equal);
        if y_cmp == std::cmp::Ordering::Equal {
            a.bbox
                .x0
                .partial_cmp(&b.bbox.x0)
                .unwrap_or(std::cmp::Ordering::Equal)
        } else {
            y_cmp
        }
    });

    let mut lines: Vec<Vec<&Word>> = Vec::new();
    let mut current: Vec<&Word> = Vec::new();
    let mut current_y: Option<f32> = None;

    for word in sorted {
        let tolerance = (word.font_size * 0.4).max(3.0);
        match current_y {
            Some(y) if (word.bbox.y0 - y).abs() <= tolerance => current.push(word),
            _ => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_y = Some(word.bbox.y0);
                current.push(word);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    // Words within a line sorted left to right
    for line in &mut lines {
        line.sort_by(|a, b| {
            a.bbox
                .x0
                .partial_cmp(&b.bbox.x0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    lines
}

/// A loaded PDF document: an ordered sequence of pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Pages in document order
    pub pages: Vec<Page>,

    /// Source path when loaded from disk. Collaborator backends that reopen
    /// the file themselves (subprocess-style finders) read it from here.
    pub path: Option<PathBuf>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the source path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get a page by 0-based index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Source path as `&Path`, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Which pages an extraction request covers. Indices are 0-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// An inclusive index range
    Range(RangeInclusive<usize>),
    /// An explicit index list
    Pages(Vec<usize>),
}

impl PageSelection {
    /// Select a single page.
    pub fn single(index: usize) -> Self {
        PageSelection::Pages(vec![index])
    }

    /// Check if a page index is selected.
    pub fn includes(&self, index: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&index),
            PageSelection::Pages(pages) => pages.contains(&index),
        }
    }

    /// Resolve the selection into concrete page indices for a document with
    /// `page_count` pages, in ascending order, out-of-range indices dropped.
    pub fn resolve(&self, page_count: usize) -> Vec<usize> {
        (0..page_count).filter(|i| self.includes(*i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x: f32, y: f32) -> Word {
        Word::new(
            text,
            Rect::new(x, y, x + text.len() as f32 * 6.0, y + 10.0),
            10.0,
        )
    }

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
        assert!(doc.page(0).is_none());
    }

    #[test]
    fn test_page_bounds() {
        let page = Page::new(0, 612.0, 792.0);
        assert_eq!(page.bounds(), Rect::new(0.0, 0.0, 612.0, 792.0));
        assert!(page.is_empty());
    }

    #[test]
    fn test_text_in_reading_order() {
        let mut page = Page::new(0, 612.0, 792.0);
        // Second line first to check sorting
        page.words.push(word("world", 50.0, 120.0));
        page.words.push(word("hello", 10.0, 120.0));
        page.words.push(word("Title", 10.0, 100.0));

        assert_eq!(page.text(), "Title\nhello world");
    }

    #[test]
    fn test_text_in_clip() {
        let mut page = Page::new(0, 612.0, 792.0);
        page.words.push(word("inside", 10.0, 100.0));
        page.words.push(word("outside", 10.0, 500.0));

        let clip = Rect::new(0.0, 90.0, 612.0, 200.0);
        assert_eq!(page.text_in(&clip), "inside");
    }

    #[test]
    fn test_page_selection() {
        assert!(PageSelection::All.includes(42));
        assert!(PageSelection::Range(1..=3).includes(3));
        assert!(!PageSelection::Range(1..=3).includes(4));
        assert!(PageSelection::single(2).includes(2));

        let sel = PageSelection::Pages(vec![0, 2, 99]);
        assert_eq!(sel.resolve(4), vec![0, 2]);
    }
}
