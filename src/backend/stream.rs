//! Geometry-heuristic table backend (text alignment analysis).
//!
//! Detects tables that have no ruling lines by analyzing word positions:
//! words are grouped into rows by baseline proximity, column boundaries are
//! found where left edges align across rows, and contiguous runs of
//! well-aligned rows become table candidates. This is the one table backend
//! implemented fully in-crate; it needs nothing but the page's word
//! primitives.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{Page, TableCandidate, Word};
use crate::normalize::grid::candidate_from_grid;

use super::{ExtractRequest, TableBackend};

/// Registry name of this backend.
pub const METHOD: &str = "stream";

/// Alignment-analysis configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping words into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 8,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Table backend detecting borderless tables from word alignment.
pub struct StreamTableBackend {
    config: StreamConfig,
}

impl StreamTableBackend {
    /// Create a backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: StreamConfig::default(),
        }
    }

    /// Create a backend with custom configuration.
    pub fn with_config(config: StreamConfig) -> Self {
        Self { config }
    }
}

impl Default for StreamTableBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableBackend for StreamTableBackend {
    fn name(&self) -> &'static str {
        METHOD
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<TableCandidate>> {
        let document = Arc::clone(&request.document);
        let indices = request.page_indices();
        let config = self.config.clone();

        // Alignment analysis is CPU-bound; keep it off the async executor
        tokio::task::spawn_blocking(move || {
            let mut candidates = Vec::new();
            for index in indices {
                if let Some(page) = document.page(index) {
                    candidates.extend(detect_tables(page, &config));
                }
            }
            candidates
        })
        .await
        .map_err(|e| Error::Backend(format!("stream detection task failed: {e}")))
    }
}

/// A row of words grouped by baseline.
#[derive(Debug, Clone)]
struct RowData<'a> {
    y: f32,
    words: Vec<&'a Word>,
}

/// Detect table candidates on one page.
pub fn detect_tables(page: &Page, config: &StreamConfig) -> Vec<TableCandidate> {
    log::debug!(
        "stream: page {} with {} words",
        page.index,
        page.words.len()
    );

    if page.words.len() < config.min_rows * config.min_columns {
        return vec![];
    }

    let rows = group_into_rows(&page.words, config);
    if rows.len() < config.min_rows {
        log::debug!("stream: not enough rows ({})", rows.len());
        return vec![];
    }

    let columns = detect_columns(&rows, config);
    if columns.len() < config.min_columns {
        log::debug!("stream: not enough columns ({})", columns.len());
        return vec![];
    }

    let regions = find_table_regions(&rows, &columns, config);
    log::debug!("stream: {} aligned row region(s)", regions.len());

    let mut candidates = Vec::new();

    for (start, end) in regions {
        let run = &rows[start..=end];

        // Re-detect columns for this specific region
        let run_columns = detect_columns(run, config);

        if run_columns.len() < config.min_columns {
            continue;
        }
        if run_columns.len() > config.max_columns {
            log::debug!(
                "stream: skipping region with {} columns (> {})",
                run_columns.len(),
                config.max_columns
            );
            continue;
        }
        if is_list_pattern(run, &run_columns) {
            log::debug!("stream: skipping region detected as list pattern");
            continue;
        }

        if let Some(candidate) = region_to_candidate(page, run, &run_columns, candidates.len()) {
            candidates.push(candidate);
        }
    }

    log::info!(
        "stream: {} table candidate(s) on page {}",
        candidates.len(),
        page.index
    );
    candidates
}

/// Group words into rows by vertical proximity.
fn group_into_rows<'a>(words: &'a [Word], config: &StreamConfig) -> Vec<RowData<'a>> {
    if words.is_empty() {
        return vec![];
    }

    let mut sorted: Vec<&Word> = words.iter().collect();
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

    let mut rows: Vec<RowData> = Vec::new();
    let mut current: Vec<&Word> = Vec::new();
    let mut current_y: Option<f32> = None;

    for word in sorted {
        let tolerance = word.font_size * config.y_tolerance_factor;
        match current_y {
            Some(y) if (word.bbox.y0 - y).abs() <= tolerance => current.push(word),
            _ => {
                if !current.is_empty() {
                    let avg_y =
                        current.iter().map(|w| w.bbox.y0).sum::<f32>() / current.len() as f32;
                    rows.push(RowData {
                        y: avg_y,
                        words: std::mem::take(&mut current),
                    });
                }
                current_y = Some(word.bbox.y0);
                current.push(word);
            }
        }
    }
    if !current.is_empty() {
        let avg_y = current.iter().map(|w| w.bbox.y0).sum::<f32>() / current.len() as f32;
        rows.push(RowData {
            y: avg_y,
            words: current,
        });
    }

    rows
}

/// Detect column boundaries from left-edge alignment.
///
/// Left edges are bucketed to 5pt; a bucket that appears in enough
/// multi-word rows is a column edge. Edges closer together than the minimum
/// column gap are merged.
fn detect_columns(rows: &[RowData], config: &StreamConfig) -> Vec<f32> {
    if rows.is_empty() {
        return vec![];
    }

    let multi_word: Vec<&RowData> = rows.iter().filter(|r| r.words.len() >= 2).collect();
    let all_rows: Vec<&RowData>;
    let counted: &[&RowData] = if multi_word.len() >= config.min_rows {
        &multi_word
    } else {
        // Too few multi-word rows; count every row instead
        all_rows = rows.iter().collect();
        &all_rows
    };

    let bucket_size = 5.0f32;
    let mut edge_counts: HashMap<i32, usize> = HashMap::new();

    for row in counted {
        // Count each bucket once per row
        let mut row_buckets: HashSet<i32> = HashSet::new();
        for word in &row.words {
            row_buckets.insert((word.bbox.x0 / bucket_size).round() as i32);
        }
        for bucket in row_buckets {
            *edge_counts.entry(bucket).or_insert(0) += 1;
        }
    }

    let min_occurrences =
        ((counted.len() as f32 * config.min_alignment_ratio) as usize).max(2);

    let mut edges: Vec<f32> = edge_counts
        .iter()
        .filter(|(_, count)| **count >= min_occurrences)
        .map(|(bucket, _)| *bucket as f32 * bucket_size)
        .collect();
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // Merge close edges
    let mut merged: Vec<f32> = Vec::new();
    for edge in edges {
        match merged.last() {
            Some(last) if edge - last < config.min_column_gap => {}
            _ => merged.push(edge),
        }
    }

    log::debug!("stream: column edges {:?}", merged);
    merged
}

/// Find contiguous row runs whose words align with the column edges.
fn find_table_regions(
    rows: &[RowData],
    columns: &[f32],
    config: &StreamConfig,
) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut run_len = 0usize;

    for (i, row) in rows.iter().enumerate() {
        if alignment_score(row, columns) >= config.min_alignment_ratio {
            if run_start.is_none() {
                run_start = Some(i);
            }
            run_len += 1;
        } else {
            if let Some(start) = run_start {
                if run_len >= config.min_rows {
                    regions.push((start, i - 1));
                }
            }
            run_start = None;
            run_len = 0;
        }
    }
    if let Some(start) = run_start {
        if run_len >= config.min_rows {
            regions.push((start, rows.len() - 1));
        }
    }

    regions
}

/// Fraction of a row's words whose left edge sits on a column boundary.
fn alignment_score(row: &RowData, columns: &[f32]) -> f32 {
    if row.words.is_empty() || columns.is_empty() {
        return 0.0;
    }

    let tolerance = 5.0;
    let aligned = row
        .words
        .iter()
        .filter(|w| columns.iter().any(|col| (w.bbox.x0 - col).abs() <= tolerance))
        .count();

    aligned as f32 / row.words.len() as f32
}

/// Convert an aligned row run into a table candidate.
fn region_to_candidate(
    page: &Page,
    run: &[RowData],
    columns: &[f32],
    table_index: usize,
) -> Option<TableCandidate> {
    let right_x = run
        .iter()
        .flat_map(|r| r.words.iter())
        .map(|w| w.bbox.x1)
        .fold(f32::MIN, f32::max);

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(run.len());
    for row in run {
        let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
        for word in &row.words {
            let col = column_for(word.bbox.x0, columns, right_x);
            if col < cells.len() {
                cells[col].push(word.text.trim());
            }
        }
        grid.push(cells.into_iter().map(|c| c.join(" ")).collect());
    }

    let bbox = run
        .iter()
        .flat_map(|r| r.words.iter())
        .map(|w| w.bbox)
        .reduce(|a, b| a.union(&b))?;

    let mut candidate = candidate_from_grid(page.index, table_index, grid, METHOD)?;
    candidate.bbox = Some(bbox);
    Some(candidate)
}

/// Which column a word belongs to, from its left edge.
fn column_for(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // Allow slight overhang to the left of the column start
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    // No band matched; take the closest edge
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Whether aligned rows are actually a bulleted or numbered list.
///
/// List markers become separate words at their own X position, which looks
/// like a two-column table to the alignment analysis.
fn is_list_pattern(rows: &[RowData], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let mut bullets = 0usize;
    let mut numbers = 0usize;

    for row in rows {
        let first = row.words.iter().min_by(|a, b| {
            a.bbox
                .x0
                .partial_cmp(&b.bbox.x0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(word) = first {
            let text = word.text.trim();
            if is_bullet_marker(text) {
                bullets += 1;
            } else if is_number_marker(text) {
                numbers += 1;
            }
        }
    }

    let bullet_ratio = bullets as f32 / rows.len() as f32;
    let total_ratio = (bullets + numbers) as f32 / rows.len() as f32;

    // Bullet markers are almost never real table data
    if bullet_ratio >= 0.5 {
        return true;
    }

    // Numbered markers only veto 2-column regions; real tables often carry
    // a numbered first column
    columns.len() == 2 && total_ratio >= 0.5
}

/// Check if text is a bullet marker.
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let prefix = &cleaned[..pos];
        let suffix = &cleaned[pos..];
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    if cleaned.len() == 2 {
        let chars: Vec<char> = cleaned.chars().collect();
        if chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')') {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn word(text: &str, x: f32, y: f32) -> Word {
        Word::new(
            text,
            Rect::new(x, y, x + text.len() as f32 * 6.0, y + 10.0),
            12.0,
        )
    }

    fn page_with(words: Vec<Word>) -> Page {
        let mut page = Page::new(0, 612.0, 792.0);
        page.words = words;
        page
    }

    #[test]
    fn test_detect_simple_table() {
        let page = page_with(vec![
            word("Endpoint", 10.0, 100.0),
            word("HR", 100.0, 100.0),
            word("Death", 10.0, 115.0),
            word("0.82", 100.0, 115.0),
            word("Stroke", 10.0, 130.0),
            word("0.91", 100.0, 130.0),
        ]);

        let tables = detect_tables(&page, &StreamConfig::default());
        assert_eq!(tables.len(), 1);

        let t = &tables[0];
        assert_eq!(t.rows, 3);
        assert_eq!(t.cols, 2);
        assert_eq!(t.grid[0], vec!["Endpoint", "HR"]);
        assert_eq!(t.grid[2], vec!["Stroke", "0.91"]);
        assert_eq!(t.extraction_method, METHOD);
        assert!(t.bbox.is_some());
    }

    #[test]
    fn test_single_column_not_a_table() {
        let page = page_with(vec![
            word("Line", 10.0, 100.0),
            word("Line", 10.0, 115.0),
            word("Line", 10.0, 130.0),
            word("Line", 10.0, 145.0),
        ]);

        assert!(detect_tables(&page, &StreamConfig::default()).is_empty());
    }

    #[test]
    fn test_numbered_list_rejected() {
        let page = page_with(vec![
            word("1.", 50.0, 100.0),
            word("Introduction", 80.0, 100.0),
            word("2.", 50.0, 115.0),
            word("Methods", 80.0, 115.0),
            word("3.", 50.0, 130.0),
            word("Results", 80.0, 130.0),
            word("4.", 50.0, 145.0),
            word("Discussion", 80.0, 145.0),
        ]);

        assert!(detect_tables(&page, &StreamConfig::default()).is_empty());
    }

    #[test]
    fn test_bullet_list_rejected() {
        let page = page_with(vec![
            word("-", 50.0, 100.0),
            word("Management", 80.0, 100.0),
            word("-", 50.0, 115.0),
            word("Monitoring", 80.0, 115.0),
            word("-", 50.0, 130.0),
            word("Follow-up", 80.0, 130.0),
        ]);

        assert!(detect_tables(&page, &StreamConfig::default()).is_empty());
    }

    #[test]
    fn test_group_into_rows() {
        let words = vec![
            word("A1", 10.0, 100.0),
            word("B1", 60.0, 100.0),
            word("A2", 10.0, 115.0),
            word("B2", 60.0, 115.0),
        ];
        let rows = group_into_rows(&words, &StreamConfig::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].words.len(), 2);
    }

    #[test]
    fn test_number_markers() {
        assert!(is_number_marker("1."));
        assert!(is_number_marker("12)"));
        assert!(is_number_marker("3"));
        assert!(is_number_marker("a."));
        assert!(!is_number_marker("Name"));
        assert!(!is_number_marker("0.82"));
    }

    #[test]
    fn test_empty_page() {
        let page = Page::new(0, 612.0, 792.0);
        assert!(detect_tables(&page, &StreamConfig::default()).is_empty());
    }
}
