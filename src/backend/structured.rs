//! Structure-aware table backend.
//!
//! Wraps a [`StructuredSource`] collaborator — a finder that reports cell
//! grids together with table geometry and its own accuracy estimate. First
//! in the default priority order: when it finds anything, its geometry makes
//! the result the most useful one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::TableCandidate;
use crate::normalize::grid::candidate_from_grid;

use super::{ExtractRequest, StructuredSource, TableBackend};

/// Registry name of this backend.
pub const METHOD: &str = "structured";

/// Table backend adapting a structure-aware finder.
pub struct StructuredTableBackend {
    source: Arc<dyn StructuredSource>,
}

impl StructuredTableBackend {
    /// Create a backend over a structured source.
    pub fn new(source: Arc<dyn StructuredSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl TableBackend for StructuredTableBackend {
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
                let tables = source.tables(&document, index)?;
                let mut page_count = 0usize;
                for table in tables {
                    if let Some(mut candidate) =
                        candidate_from_grid(index, page_count, table.grid, METHOD)
                    {
                        candidate.bbox = table.bbox;
                        candidate.accuracy = table.accuracy;
                        candidate.cell_boxes = table.cell_boxes;
                        candidates.push(candidate);
                        page_count += 1;
                    }
                }
                log::debug!("structured: {} table(s) on page {}", page_count, index);
            }
            Ok(candidates)
        })
        .await
        .map_err(|e| Error::Backend(format!("structured task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StructuredTable;
    use crate::model::{Document, Page, PageSelection, Rect};

    fn one_page_doc() -> Arc<Document> {
        let mut doc = Document::new();
        doc.add_page(Page::new(0, 612.0, 792.0));
        Arc::new(doc)
    }

    #[tokio::test]
    async fn test_geometry_carried_through() {
        let source: Arc<dyn StructuredSource> = Arc::new(|_: &Document, _: usize| {
            Ok(vec![StructuredTable {
                grid: vec![
                    vec!["Name".to_string(), "Age".to_string()],
                    vec!["Alice".to_string(), "30".to_string()],
                ],
                bbox: Some(Rect::new(50.0, 100.0, 400.0, 200.0)),
                accuracy: Some(0.97),
                cell_boxes: None,
            }])
        });
        let backend = StructuredTableBackend::new(source);
        let request = ExtractRequest::new(one_page_doc(), PageSelection::All);

        let candidates = backend.extract(&request).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bbox, Some(Rect::new(50.0, 100.0, 400.0, 200.0)));
        assert_eq!(candidates[0].accuracy, Some(0.97));
        assert_eq!(candidates[0].extraction_method, METHOD);
    }

    #[tokio::test]
    async fn test_empty_source_result() {
        let source: Arc<dyn StructuredSource> =
            Arc::new(|_: &Document, _: usize| Ok(Vec::<StructuredTable>::new()));
        let backend = StructuredTableBackend::new(source);
        let request = ExtractRequest::new(one_page_doc(), PageSelection::All);

        assert!(backend.extract(&request).await.unwrap().is_empty());
    }
}
