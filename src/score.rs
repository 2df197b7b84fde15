//! Confidence scoring and table-kind classification.
//!
//! The score is advisory metadata: the orchestrator's default first-success
//! policy commits to a backend's result regardless of it, and callers filter
//! on it downstream. Gating happens only when an explicit
//! [`AcceptPolicy::MinConfidence`](crate::orchestrator::AcceptPolicy)
//! threshold is configured.

use crate::model::{TableCandidate, TableKind};

/// Scores and classifies table candidates from structural signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    /// Create a new scorer.
    pub fn new() -> Self {
        Self
    }

    /// Plausibility score in `[0.0, 1.0]`.
    ///
    /// Base 0.5, +0.2 for a bounding box, +0.15 for uniform row lengths,
    /// +up to 0.15 proportional to the non-empty cell fraction; clamped.
    /// An empty grid scores 0.0.
    pub fn score(&self, candidate: &TableCandidate) -> f32 {
        if candidate.grid.is_empty() {
            return 0.0;
        }

        let mut score = 0.5f32;

        if candidate.bbox.is_some() {
            score += 0.2;
        }

        if candidate.source_uniform {
            score += 0.15;
        }

        score += candidate.fill_ratio() * 0.15;

        score.min(1.0)
    }

    /// Classify a table from its header-row keywords.
    ///
    /// Pure case-insensitive containment; the first matching category in the
    /// listed priority order wins. Heuristic, not authoritative.
    pub fn classify(&self, candidate: &TableCandidate) -> TableKind {
        let Some(header) = candidate.grid.first() else {
            return TableKind::General;
        };
        if candidate.grid.len() < 2 {
            return TableKind::General;
        }

        let header_text = header.join(" ").to_lowercase();
        let contains_any =
            |keywords: &[&str]| keywords.iter().any(|k| header_text.contains(k));

        if contains_any(&["baseline", "characteristics", "demographics"]) {
            TableKind::BaselineCharacteristics
        } else if contains_any(&["outcome", "result", "mortality", "survival"]) {
            TableKind::Outcomes
        } else if contains_any(&["intervention", "treatment", "procedure"]) {
            TableKind::Intervention
        } else if contains_any(&["statistical", "analysis", "p-value", "ci"]) {
            TableKind::Statistical
        } else {
            TableKind::General
        }
    }

    /// Whether the first row looks like a header.
    ///
    /// Needs at least two rows and any non-empty cell in the first.
    pub fn has_header_row(&self, candidate: &TableCandidate) -> bool {
        if candidate.grid.len() < 2 {
            return false;
        }
        candidate.grid[0].iter().any(|c| !c.trim().is_empty())
    }

    /// Fill in the computed fields of a candidate in place.
    pub fn annotate(&self, candidate: &mut TableCandidate) {
        candidate.confidence = Some(self.score(candidate));
        candidate.kind = self.classify(candidate);
        candidate.has_header = self.has_header_row(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;
    use crate::normalize::grid::candidate_from_grid;

    fn candidate(rows: &[&[&str]]) -> TableCandidate {
        let grid = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        candidate_from_grid(0, 0, grid, "test").unwrap()
    }

    #[test]
    fn test_perfect_candidate_scores_one() {
        let mut c = candidate(&[&["Endpoint", "HR"], &["Death", "0.82"]]);
        c.bbox = Some(Rect::new(0.0, 0.0, 100.0, 50.0));

        let scorer = ConfidenceScorer::new();
        // 0.5 + 0.2 + 0.15 + 0.15 = 1.0 exactly, after clamping
        assert_eq!(scorer.score(&c), 1.0);
    }

    #[test]
    fn test_score_without_bbox() {
        let c = candidate(&[&["a", "b"], &["c", "d"]]);
        let score = ConfidenceScorer::new().score(&c);
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_score_bounds() {
        // Sparse ragged grid stays within [0, 1]
        let c = candidate(&[&["a", "", ""], &[""]]);
        let score = ConfidenceScorer::new().score(&c);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_classification_priority() {
        let scorer = ConfidenceScorer::new();

        let c = candidate(&[&["Baseline characteristics", "N"], &["Age", "63"]]);
        assert_eq!(scorer.classify(&c), TableKind::BaselineCharacteristics);

        let c = candidate(&[&["Primary outcome", "HR"], &["Death", "0.8"]]);
        assert_eq!(scorer.classify(&c), TableKind::Outcomes);

        let c = candidate(&[&["Treatment arm", "n"], &["Drug", "120"]]);
        assert_eq!(scorer.classify(&c), TableKind::Intervention);

        let c = candidate(&[&["p-value", "95% CI"], &["0.03", "0.7-0.9"]]);
        assert_eq!(scorer.classify(&c), TableKind::Statistical);

        let c = candidate(&[&["Fruit", "Color"], &["Apple", "Red"]]);
        assert_eq!(scorer.classify(&c), TableKind::General);

        // "Baseline" beats "outcome" when both appear: listed priority order
        let c = candidate(&[&["Baseline outcome", "x"], &["a", "b"]]);
        assert_eq!(scorer.classify(&c), TableKind::BaselineCharacteristics);
    }

    #[test]
    fn test_header_detection() {
        let scorer = ConfidenceScorer::new();

        assert!(scorer.has_header_row(&candidate(&[&["Name", "Age"], &["A", "1"]])));
        // Single-row tables have no header
        assert!(!scorer.has_header_row(&candidate(&[&["Name", "Age"]])));
        // All-empty first row is not a header
        assert!(!scorer.has_header_row(&candidate(&[&["", ""], &["A", "1"]])));
    }

    #[test]
    fn test_annotate() {
        let mut c = candidate(&[&["Survival", "HR"], &["1 yr", "0.9"]]);
        ConfidenceScorer::new().annotate(&mut c);

        assert!(c.confidence.is_some());
        assert_eq!(c.kind, TableKind::Outcomes);
        assert!(c.has_header);
    }
}
