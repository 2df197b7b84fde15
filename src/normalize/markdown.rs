//! Pipe-delimited markdown table parsing.
//!
//! Vision-model backends answer with free-form markdown; tables in it are
//! runs of consecutive `|`-bearing lines. Each run becomes one candidate.

use crate::model::TableCandidate;

use super::grid;

/// Parse all pipe-delimited tables out of a markdown blob.
///
/// Malformed or table-free input yields an empty list, never an error.
pub fn parse(markdown: &str, page: usize, method: &str) -> Vec<TableCandidate> {
    let lines: Vec<&str> = markdown.lines().collect();

    let mut tables = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut title: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.contains('|') {
            if current.is_empty() {
                title = find_title(&lines, i);
            }
            current.push(line);
        } else if !current.is_empty() {
            finish_run(&current, title.take(), page, method, &mut tables);
            current.clear();
        }
    }
    if !current.is_empty() {
        finish_run(&current, title.take(), page, method, &mut tables);
    }

    log::debug!("parsed {} table(s) from markdown", tables.len());
    tables
}

/// Look back up to 3 lines before a table run for a title line.
fn find_title(lines: &[&str], table_start: usize) -> Option<String> {
    let from = table_start.saturating_sub(3);
    for line in lines[from..table_start].iter().rev() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('|') {
            continue;
        }
        if line.to_lowercase().contains("table") {
            return Some(line.to_string());
        }
    }
    None
}

/// Convert one run of `|` lines into a candidate.
fn finish_run(
    run: &[&str],
    title: Option<String>,
    page: usize,
    method: &str,
    tables: &mut Vec<TableCandidate>,
) {
    // Separator rows are part of the canonical markdown but carry no data
    let data_lines: Vec<&str> = run
        .iter()
        .filter(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with("|---") && !t.starts_with("| ---")
        })
        .copied()
        .collect();

    if data_lines.is_empty() {
        return;
    }

    let grid_rows: Vec<Vec<String>> = data_lines.iter().map(|l| split_cells(l)).collect();

    if let Some(mut candidate) = grid::candidate_from_grid(page, tables.len(), grid_rows, method) {
        // Keep the backend's own rendering, separator lines included
        candidate.markdown = run.join("\n");
        candidate.title = title;
        tables.push(candidate);
    }
}

/// Split a `| a | b |` line into trimmed cell strings.
///
/// Leading and trailing empty segments come from the border pipes and are
/// dropped; interior empty cells are kept.
fn split_cells(line: &str) -> Vec<String> {
    let mut segments: Vec<&str> = line.split('|').collect();

    if segments.first().map(|s| s.trim().is_empty()).unwrap_or(false) {
        segments.remove(0);
    }
    if segments.last().map(|s| s.trim().is_empty()).unwrap_or(false) {
        segments.pop();
    }

    segments.iter().map(|s| s.trim().to_string()).collect()
}
