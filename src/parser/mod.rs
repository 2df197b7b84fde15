//! PDF loading: builds the read-only document model the extraction core
//! operates on.
//!
//! The loader walks each page's content stream and collects word and
//! placed-image primitives. Callers that already have primitives from some
//! other source can skip this module entirely and construct
//! [`Document`](crate::model::Document) values directly.

pub mod backend;
pub mod layout;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::model::{Document, Page, PageSelection};

use backend::{LopdfBackend, PageId, PdfBackend};
use layout::PrimitiveExtractor;

/// Options for loading PDF documents.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Skip pages that fail to parse instead of failing the whole load
    pub lenient: bool,

    /// Parse pages in parallel
    pub parallel: bool,

    /// Which pages to load
    pub pages: PageSelection,
}

impl LoadOptions {
    /// Create new load options with defaults.
    pub fn new() -> Self {
        Self {
            lenient: false,
            parallel: true,
            pages: PageSelection::All,
        }
    }

    /// Enable lenient mode (skip invalid pages).
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Disable parallel page parsing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }
}

/// Loads PDF files into [`Document`] values.
pub struct PdfLoader {
    backend: LopdfBackend,
    options: LoadOptions,
    path: Option<PathBuf>,
}

impl PdfLoader {
    /// Open a PDF file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, LoadOptions::new())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        let backend = LopdfBackend::load_file(path.as_ref())?;
        Ok(Self {
            backend,
            options,
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Load a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, LoadOptions::new())
    }

    /// Load a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: LoadOptions) -> Result<Self> {
        let backend = LopdfBackend::load_bytes(data)?;
        Ok(Self {
            backend,
            options,
            path: None,
        })
    }

    /// Parse the selected pages into a document.
    pub fn load(&self) -> Result<Document> {
        // lopdf numbers pages from 1; the model is 0-based
        let entries: Vec<(usize, PageId)> = self
            .backend
            .pages()
            .into_iter()
            .map(|(number, id)| ((number - 1) as usize, id))
            .filter(|(index, _)| self.options.pages.includes(*index))
            .collect();

        let pages: Result<Vec<Page>> = if self.options.parallel {
            entries
                .par_iter()
                .map(|(index, id)| self.load_page(*index, *id))
                .collect()
        } else {
            entries
                .iter()
                .map(|(index, id)| self.load_page(*index, *id))
                .collect()
        };

        let mut document = Document::new();
        document.pages = pages?;
        document.path = self.path.clone();
        Ok(document)
    }

    /// Parse a single page.
    fn load_page(&self, index: usize, id: PageId) -> Result<Page> {
        let (width, height) = self.backend.page_dimensions(id)?;
        let mut page = Page::new(index, width, height);

        let extractor = PrimitiveExtractor::new(&self.backend);
        match extractor.extract_page(id, height) {
            Ok((words, images)) => {
                page.words = words;
                page.images = images;
            }
            Err(e) => {
                if !self.options.lenient {
                    return Err(e);
                }
                // Lenient mode keeps the page, with its dimensions, empty
                log::warn!("failed to extract primitives from page {}: {}", index, e);
            }
        }

        Ok(page)
    }
}

/// Parse a PDF file into a document with default options.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    PdfLoader::open(path)?.load()
}

/// Parse a PDF from bytes into a document with default options.
pub fn load_bytes(data: &[u8]) -> Result<Document> {
    PdfLoader::from_bytes(data)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_options_builder() {
        let options = LoadOptions::new()
            .lenient()
            .sequential()
            .with_pages(PageSelection::single(3));

        assert!(options.lenient);
        assert!(!options.parallel);
        assert!(options.pages.includes(3));
        assert!(!options.pages.includes(2));
    }

    #[test]
    fn test_load_bytes_invalid() {
        assert!(load_bytes(b"not a pdf").is_err());
    }

    #[test]
    fn test_load_bytes_truncated_header() {
        assert!(load_bytes(b"%PDF").is_err());
    }
}
