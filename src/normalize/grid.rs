//! Canonical grid handling shared by every grid-producing backend.

use crate::model::{TableCandidate, TableKind};

/// Right-pad ragged rows with empty cells so every row has the widest row's
/// length. Returns the resulting column count.
pub fn pad_ragged(grid: &mut [Vec<String>]) -> usize {
    let cols = grid.iter().map(|r| r.len()).max().unwrap_or(0);
    for row in grid.iter_mut() {
        while row.len() < cols {
            row.push(String::new());
        }
    }
    cols
}

/// Render a grid as pipe-delimited markdown.
///
/// A `| --- |` separator follows the first row when the grid has at least
/// two rows, marking the header boundary for markdown consumers.
pub fn to_markdown(grid: &[Vec<String>]) -> String {
    if grid.is_empty() {
        return String::new();
    }

    let cols = grid.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut lines = Vec::with_capacity(grid.len() + 1);

    for (i, row) in grid.iter().enumerate() {
        lines.push(format!("| {} |", row.join(" | ")));
        if i == 0 && grid.len() > 1 {
            lines.push(format!("| {} |", vec!["---"; cols].join(" | ")));
        }
    }

    lines.join("\n")
}

/// Build a canonical table candidate from a raw grid.
///
/// Returns `None` for an empty grid (0 rows): an empty grid is the same as
/// "no table found" and must never surface as a candidate.
pub fn candidate_from_grid(
    page: usize,
    table_index: usize,
    mut grid: Vec<Vec<String>>,
    method: &str,
) -> Option<TableCandidate> {
    if grid.is_empty() {
        return None;
    }

    // Regularity of the source grid, before padding erases it
    let source_uniform = {
        let first = grid[0].len();
        grid.iter().all(|r| r.len() == first)
    };

    let cols = pad_ragged(&mut grid);
    if cols == 0 {
        return None;
    }

    let markdown = to_markdown(&grid);

    Some(TableCandidate {
        page,
        table_index,
        title: None,
        markdown,
        rows: grid.len(),
        cols,
        bbox: None,
        cell_boxes: None,
        extraction_method: method.to_string(),
        accuracy: None,
        confidence: None,
        kind: TableKind::General,
        has_header: false,
        source_uniform,
        grid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_pad_ragged() {
        let mut grid = rows(&[&["a", "b", "c"], &["d"], &["e", "f"]]);
        let cols = pad_ragged(&mut grid);

        assert_eq!(cols, 3);
        for row in &grid {
            assert_eq!(row.len(), 3);
        }
        assert_eq!(grid[1], vec!["d", "", ""]);
    }

    #[test]
    fn test_markdown_separator_after_header() {
        let grid = rows(&[&["Name", "Age"], &["Alice", "30"]]);
        let markdown = to_markdown(&grid);
        assert_eq!(
            markdown,
            "| Name | Age |\n| --- | --- |\n| Alice | 30 |"
        );
    }

    #[test]
    fn test_markdown_single_row_no_separator() {
        let grid = rows(&[&["only", "row"]]);
        assert_eq!(to_markdown(&grid), "| only | row |");
    }

    #[test]
    fn test_empty_grid_yields_no_candidate() {
        assert!(candidate_from_grid(0, 0, vec![], "lattice").is_none());
        assert!(candidate_from_grid(0, 0, vec![vec![], vec![]], "lattice").is_none());
    }

    #[test]
    fn test_candidate_invariant() {
        let candidate =
            candidate_from_grid(2, 1, rows(&[&["a", "b"], &["c"]]), "lattice").unwrap();

        assert_eq!(candidate.page, 2);
        assert_eq!(candidate.table_index, 1);
        assert_eq!(candidate.cols, 2);
        assert_eq!(candidate.rows, 2);
        for row in &candidate.grid {
            assert_eq!(row.len(), candidate.cols);
        }
    }
}
