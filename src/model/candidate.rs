//! Extraction candidates — unconfirmed table and figure results.
//!
//! A candidate is what a backend proposes before the orchestrator commits to
//! it. Whatever the backend produced (raw grid, HTML, delimited markdown,
//! rendered region), the normalizer reduces it to these two records, so
//! downstream consumers never see backend-specific shapes.

use serde::{Deserialize, Serialize};

use super::Rect;

/// Heuristic classification of what a table reports.
///
/// Derived from header-row keywords; advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Patient baseline / demographics tables
    BaselineCharacteristics,
    /// Outcome, mortality, survival tables
    Outcomes,
    /// Intervention / treatment / procedure tables
    Intervention,
    /// Statistical analysis tables (p-values, confidence intervals)
    Statistical,
    /// Anything else
    #[default]
    General,
}

/// A candidate table in canonical form.
///
/// Invariant: every row of `grid` has exactly `cols` cells — ragged backend
/// output is right-padded during normalization and never escapes. `grid[0]`
/// is the header row when `has_header` is set; otherwise the first row has
/// no special meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCandidate {
    /// Page index (0-based)
    pub page: usize,

    /// Table index within the page (0-based)
    pub table_index: usize,

    /// Table title or caption, when one was found near the table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Canonical pipe-delimited markdown rendering
    pub markdown: String,

    /// Number of data-bearing rows (markdown separator lines excluded)
    pub rows: usize,

    /// Number of columns
    pub cols: usize,

    /// Table bounding box, when the backend provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,

    /// Per-cell bounding boxes, row-major, when the backend provided them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_boxes: Option<Vec<Vec<Rect>>>,

    /// Name of the backend that produced this candidate
    pub extraction_method: String,

    /// Accuracy as reported by the backend itself, when it reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,

    /// Confidence score assigned by the scorer, 0.0–1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Heuristic table classification
    pub kind: TableKind,

    /// Whether `grid[0]` looks like a header row
    pub has_header: bool,

    /// Whether the backend's raw grid already had uniform row lengths,
    /// before padding. Padding makes every stored grid rectangular, so
    /// structural regularity has to be remembered from the source.
    #[serde(skip)]
    pub source_uniform: bool,

    /// The cell grid (rows × cols). Not serialized; `markdown` is the wire
    /// representation.
    #[serde(skip)]
    pub grid: Vec<Vec<String>>,
}

impl TableCandidate {
    /// Fraction of non-empty cells, 0.0 for an empty grid.
    pub fn fill_ratio(&self) -> f32 {
        let total: usize = self.grid.iter().map(|r| r.len()).sum();
        if total == 0 {
            return 0.0;
        }
        let filled = self
            .grid
            .iter()
            .flat_map(|r| r.iter())
            .filter(|c| !c.trim().is_empty())
            .count();
        filled as f32 / total as f32
    }

    /// Whether every row has the same length.
    pub fn has_uniform_rows(&self) -> bool {
        let mut lengths = self.grid.iter().map(|r| r.len());
        match lengths.next() {
            Some(first) => lengths.all(|l| l == first),
            None => false,
        }
    }

    /// Header row cells, when header detection succeeded.
    pub fn header(&self) -> Option<&[String]> {
        if self.has_header {
            self.grid.first().map(|r| r.as_slice())
        } else {
            None
        }
    }
}

/// A candidate figure: a rendered page region plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureCandidate {
    /// Page index (0-based)
    pub page: usize,

    /// Figure index within the page (0-based)
    pub figure_index: usize,

    /// Region of the page that was rendered
    pub bbox: Rect,

    /// Rendered image width in pixels
    pub width: u32,

    /// Rendered image height in pixels
    pub height: u32,

    /// Rendered image bytes (PNG), base64 on the wire
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,

    /// Caption text, when one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Name of the backend strategy that produced this candidate
    pub extraction_method: String,

    /// Free-text description produced by a downstream vision collaborator.
    /// Never filled by this crate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Serde adapter: `Vec<u8>` as a base64 string.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_candidate(grid: Vec<Vec<&str>>) -> TableCandidate {
        let grid: Vec<Vec<String>> = grid
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect();
        let cols = grid.iter().map(|r| r.len()).max().unwrap_or(0);
        TableCandidate {
            page: 0,
            table_index: 0,
            title: None,
            markdown: String::new(),
            rows: grid.len(),
            cols,
            bbox: None,
            cell_boxes: None,
            extraction_method: "test".to_string(),
            accuracy: None,
            confidence: None,
            kind: TableKind::General,
            has_header: false,
            source_uniform: false,
            grid,
        }
    }

    #[test]
    fn test_fill_ratio() {
        let c = grid_candidate(vec![vec!["a", ""], vec!["", "b"]]);
        assert!((c.fill_ratio() - 0.5).abs() < 1e-6);

        let empty = grid_candidate(vec![]);
        assert_eq!(empty.fill_ratio(), 0.0);
    }

    #[test]
    fn test_uniform_rows() {
        assert!(grid_candidate(vec![vec!["a", "b"], vec!["c", "d"]]).has_uniform_rows());
        assert!(!grid_candidate(vec![vec!["a", "b"], vec!["c"]]).has_uniform_rows());
        assert!(!grid_candidate(vec![]).has_uniform_rows());
    }

    #[test]
    fn test_header_accessor() {
        let mut c = grid_candidate(vec![vec!["Name", "Age"], vec!["A", "1"]]);
        assert!(c.header().is_none());
        c.has_header = true;
        assert_eq!(c.header().unwrap(), ["Name", "Age"]);
    }

    #[test]
    fn test_figure_image_roundtrip() {
        let fig = FigureCandidate {
            page: 1,
            figure_index: 0,
            bbox: Rect::new(0.0, 0.0, 100.0, 100.0),
            width: 200,
            height: 200,
            image: vec![0x89, 0x50, 0x4E, 0x47],
            caption: Some("Figure 1. Flow diagram".to_string()),
            extraction_method: "render_by_caption".to_string(),
            description: None,
        };

        let json = serde_json::to_string(&fig).unwrap();
        assert!(json.contains("iVBORw")); // base64 of the PNG magic
        let back: FigureCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image, fig.image);
    }
}
