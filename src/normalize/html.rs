//! HTML table parsing.
//!
//! Vision-language models frequently answer with `<table>` markup instead of
//! markdown. Each `<table>` element becomes one candidate; `colspan` cells
//! are expanded with synthetic empty cells so column alignment survives the
//! conversion to a rectangular grid.

use scraper::{ElementRef, Html, Selector};

use crate::model::TableCandidate;

use super::grid;

/// Parse all `<table>` elements out of an HTML blob.
///
/// Malformed or table-free input yields an empty list, never an error.
pub fn parse(html: &str, page: usize, method: &str) -> Vec<TableCandidate> {
    let document = Html::parse_document(html);

    let table_sel = Selector::parse("table").expect("static selector");
    let row_sel = Selector::parse("tr").expect("static selector");
    let cell_sel = Selector::parse("td, th").expect("static selector");

    let mut tables = Vec::new();

    for table_el in document.select(&table_sel) {
        let mut grid_rows: Vec<Vec<String>> = Vec::new();

        for row_el in table_el.select(&row_sel) {
            let mut cells: Vec<String> = Vec::new();
            for cell_el in row_el.select(&cell_sel) {
                let text = cell_text(&cell_el);
                let colspan = cell_el
                    .value()
                    .attr("colspan")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(1)
                    .max(1);

                cells.push(text);
                // Spanned columns become empty cells, preserving alignment
                for _ in 1..colspan {
                    cells.push(String::new());
                }
            }
            if !cells.is_empty() {
                grid_rows.push(cells);
            }
        }

        if let Some(mut candidate) =
            grid::candidate_from_grid(page, tables.len(), grid_rows, method)
        {
            candidate.title = find_title(&table_el);
            tables.push(candidate);
        }
    }

    log::debug!("parsed {} HTML table(s)", tables.len());
    tables
}

/// Concatenated, whitespace-trimmed text content of a cell.
fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Look for a table title in the nearest preceding sibling element.
///
/// Only short heading-like elements that actually mention "table" qualify.
fn find_title(table_el: &ElementRef) -> Option<String> {
    for sibling in table_el.prev_siblings() {
        if let Some(el) = ElementRef::wrap(sibling) {
            let name = el.value().name();
            if matches!(name, "p" | "div" | "h1" | "h2" | "h3" | "h4") {
                let text = cell_text(&el);
                if text.to_lowercase().contains("table") {
                    return Some(text);
                }
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_table() {
        let html = "\
<table>
  <tr><th>Endpoint</th><th>Hazard ratio</th></tr>
  <tr><td>Death</td><td>0.82</td></tr>
</table>";

        let tables = parse(html, 1, "vision");
        assert_eq!(tables.len(), 1);

        let t = &tables[0];
        assert_eq!(t.rows, 2);
        assert_eq!(t.cols, 2);
        assert_eq!(t.grid[0][0], "Endpoint");
        assert_eq!(t.grid[1][1], "0.82");
        assert!(t.markdown.contains("| --- | --- |"));
    }

    #[test]
    fn test_colspan_expansion() {
        let html = "\
<table>
  <tr><th colspan=\"2\">Outcomes</th></tr>
  <tr><td>Death</td><td>0.82</td></tr>
</table>";

        let tables = parse(html, 0, "vision");
        assert_eq!(tables.len(), 1);

        let t = &tables[0];
        assert_eq!(t.cols, 2);
        for row in &t.grid {
            assert_eq!(row.len(), 2);
        }
        assert_eq!(t.grid[0][0], "Outcomes");
        assert_eq!(t.grid[0][1], "");
    }

    #[test]
    fn test_title_from_preceding_sibling() {
        let html = "\
<p>Table 3. Adverse events</p>
<table><tr><td>a</td><td>b</td></tr></table>";

        let tables = parse(html, 0, "vision");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title.as_deref(), Some("Table 3. Adverse events"));
    }

    #[test]
    fn test_sibling_without_table_keyword_ignored() {
        let html = "\
<p>Some unrelated paragraph</p>
<table><tr><td>a</td><td>b</td></tr></table>";

        let tables = parse(html, 0, "vision");
        assert_eq!(tables.len(), 1);
        assert!(tables[0].title.is_none());
    }

    #[test]
    fn test_multiple_tables() {
        let html = "\
<table><tr><td>a</td></tr></table>
<table><tr><td>x</td><td>y</td></tr></table>";

        let tables = parse(html, 0, "vision");
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_index, 0);
        assert_eq!(tables[1].table_index, 1);
    }

    #[test]
    fn test_malformed_input() {
        assert!(parse("", 0, "vision").is_empty());
        assert!(parse("<table></table>", 0, "vision").is_empty());
        assert!(parse("<table><tr></tr></table>", 0, "vision").is_empty());
        // Unclosed tags still parse leniently; no panic either way
        let _ = parse("<table><tr><td>a", 0, "vision");
    }
}
