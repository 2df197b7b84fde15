//! Figure region detection from page primitives.
//!
//! Two independent strategies run in order:
//!
//! 1. **Caption-anchored** — find "Figure N." captions in the page text and
//!    expand a region upward to capture the artwork the caption describes.
//! 2. **Cluster-based** — group placed raster images by transitive center
//!    proximity and wrap each cluster in a padded bounding box. Used only
//!    when the caption strategy finds nothing.
//!
//! Regions come back in **discovery order**, not reading order: the caption
//! strategy follows document text order, the cluster strategy follows
//! arbitrary cluster-discovery order. Do not assume top-to-bottom output —
//! re-sort explicitly if spatial order matters.

mod caption;
mod cluster;

pub use cluster::cluster_rectangles;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Page, Rect};

/// How a region was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Anchored to a "Figure N." caption
    Caption,
    /// Grouped from nearby image placements
    Cluster,
}

/// A page region hypothesized to contain a figure.
///
/// Transient: produced and consumed within one extraction call.
#[derive(Debug, Clone)]
pub struct Region {
    /// Region rectangle in page points
    pub bbox: Rect,
    /// Caption text, when one was found
    pub caption: Option<String>,
    /// Strategy that produced the region
    pub method: DetectionMethod,
}

/// Tunable constants for both detection strategies.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Vertical reach above a caption, where the artwork is assumed to sit
    pub caption_above: f32,
    /// Vertical reach below a caption, covering the caption text itself
    pub caption_below: f32,
    /// Horizontal pad to the left of the caption anchor
    pub caption_left_pad: f32,
    /// Horizontal extension to the right of the caption anchor
    pub caption_right_extend: f32,
    /// Maximum center distance for two image placements to share a cluster
    pub cluster_distance: f32,
    /// Margin added around a cluster's bounding box
    pub cluster_padding: f32,
    /// Minimum padded width for a cluster region; smaller ones are icons
    pub min_region_width: f32,
    /// Minimum padded height for a cluster region
    pub min_region_height: f32,
    /// Vertical window below a cluster searched for a caption
    pub caption_window_below: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            caption_above: 200.0,
            caption_below: 50.0,
            caption_left_pad: 10.0,
            caption_right_extend: 400.0,
            cluster_distance: 50.0,
            cluster_padding: 10.0,
            min_region_width: 100.0,
            min_region_height: 100.0,
            caption_window_below: 100.0,
        }
    }
}

/// Detects figure regions on a single page.
pub struct RegionDetector {
    config: DetectorConfig,
    caption_pattern: Regex,
}

impl RegionDetector {
    /// Create a detector with default configuration.
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Create a detector with custom configuration.
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            // "Figure 3." / "Figure 2A." — keyword is case-sensitive
            caption_pattern: Regex::new(r"^Figure\s+\d+[A-Z]?\.").expect("static pattern"),
        }
    }

    /// Detect figure regions on a page.
    ///
    /// Tries the caption strategy first; falls back to clustering when no
    /// caption-anchored region is found. Output is in discovery order (see
    /// module docs).
    pub fn detect(&self, page: &Page) -> Vec<Region> {
        let regions = self.detect_by_caption(page);
        if !regions.is_empty() {
            log::info!(
                "found {} figure region(s) by caption on page {}",
                regions.len(),
                page.index
            );
            return regions;
        }

        log::info!(
            "no caption-anchored regions on page {}, trying image clusters",
            page.index
        );
        self.detect_by_clusters(page)
    }

    /// Caption-anchored strategy only.
    pub fn detect_by_caption(&self, page: &Page) -> Vec<Region> {
        caption::detect(page, &self.config, &self.caption_pattern)
    }

    /// Cluster-based strategy only.
    pub fn detect_by_clusters(&self, page: &Page) -> Vec<Region> {
        cluster::detect(page, &self.config)
    }
}

impl Default for RegionDetector {
    fn default() -> Self {
        Self::new()
    }
}
