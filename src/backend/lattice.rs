//! Ruled-line table backend.
//!
//! Wraps a [`GridSource`] collaborator — a finder that follows drawn table
//! borders and returns plain cell grids. The finder's algorithm is opaque;
//! this adapter only normalizes its grids into canonical candidates.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::TableCandidate;
use crate::normalize::grid::candidate_from_grid;

use super::{ExtractRequest, GridSource, TableBackend};

/// Registry name of this backend.
pub const METHOD: &str = "lattice";

/// Table backend adapting a ruled-line grid finder.
pub struct LatticeTableBackend {
    source: Arc<dyn GridSource>,
}

impl LatticeTableBackend {
    /// Create a backend over a grid source.
    pub fn new(source: Arc<dyn GridSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl TableBackend for LatticeTableBackend {
    fn name(&self) -> &'static str {
        METHOD
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<TableCandidate>> {
        let document = Arc::clone(&request.document);
        let source = Arc::clone(&self.source);
        let indices = request.page_indices();

        tokio::task::spawn_blocking(move || {
            let mut candidates = Vec::new();
            for index in indices {
                let grids = source.tables(&document, index)?;
                let mut page_count = 0usize;
                for grid in grids {
                    if let Some(candidate) =
                        candidate_from_grid(index, page_count, grid, METHOD)
                    {
                        candidates.push(candidate);
                        page_count += 1;
                    }
                }
                log::debug!("lattice: {} table(s) on page {}", page_count, index);
            }
            Ok(candidates)
        })
        .await
        .map_err(|e| Error::Backend(format!("lattice task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Page, PageSelection};

    fn doc_with_pages(n: usize) -> Arc<Document> {
        let mut doc = Document::new();
        for i in 0..n {
            doc.add_page(Page::new(i, 612.0, 792.0));
        }
        Arc::new(doc)
    }

    fn grid(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_grids_become_candidates() {
        let source: Arc<dyn GridSource> = Arc::new(|_: &Document, page: usize| {
            if page == 0 {
                Ok(vec![grid(&[&["a", "b"], &["c", "d"]])])
            } else {
                Ok(vec![])
            }
        });
        let backend = LatticeTableBackend::new(source);
        let request = ExtractRequest::new(doc_with_pages(2), PageSelection::All);

        let candidates = backend.extract(&request).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].page, 0);
        assert_eq!(candidates[0].extraction_method, METHOD);
    }

    #[tokio::test]
    async fn test_empty_grids_skipped() {
        // A 0-row grid is "nothing found", never a candidate
        let source: Arc<dyn GridSource> =
            Arc::new(|_: &Document, _: usize| Ok(vec![grid(&[])]));
        let backend = LatticeTableBackend::new(source);
        let request = ExtractRequest::new(doc_with_pages(1), PageSelection::All);

        let candidates = backend.extract(&request).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let source: Arc<dyn GridSource> = Arc::new(|_: &Document, _: usize| {
            Err::<Vec<Vec<Vec<String>>>, _>(Error::Backend("finder crashed".to_string()))
        });
        let backend = LatticeTableBackend::new(source);
        let request = ExtractRequest::new(doc_with_pages(1), PageSelection::All);

        assert!(backend.extract(&request).await.is_err());
    }
}
