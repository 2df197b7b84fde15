//! Cluster-based region detection.
//!
//! Multi-panel figures are often emitted as many small raster placements.
//! Grouping placements whose centers sit within a fixed distance — taking
//! the transitive closure, so any chain of pairwise-close rectangles joins
//! one cluster — recovers the full figure extent without any caption.

use crate::model::{Page, Rect};

use super::{DetectionMethod, DetectorConfig, Region};

/// Detect regions by clustering placed images.
pub(super) fn detect(page: &Page, config: &DetectorConfig) -> Vec<Region> {
    if page.images.is_empty() {
        return vec![];
    }

    let rects: Vec<Rect> = page.images.iter().map(|img| img.bbox).collect();
    let clusters = cluster_rectangles(&rects, config.cluster_distance);

    let mut regions = Vec::new();

    for members in clusters {
        let enclosing = members
            .iter()
            .map(|&i| rects[i])
            .reduce(|a, b| a.union(&b))
            .expect("clusters are non-empty");

        let padded = enclosing.padded(config.cluster_padding);

        // Stray icons and bullets produce tiny clusters
        if padded.width() <= config.min_region_width || padded.height() <= config.min_region_height
        {
            log::debug!(
                "discarding small cluster on page {}: {:.0}x{:.0}",
                page.index,
                padded.width(),
                padded.height()
            );
            continue;
        }

        let caption = caption_below(page, &enclosing, config);

        regions.push(Region {
            bbox: padded,
            caption,
            method: DetectionMethod::Cluster,
        });
    }

    log::debug!(
        "cluster strategy found {} region(s) on page {}",
        regions.len(),
        page.index
    );

    regions
}

/// Group rectangles by transitive center proximity.
///
/// Two rectangles share a cluster when the Euclidean distance between their
/// centers is below `threshold`; grouping is the connected components of
/// that relation. The partition is independent of input order — only the
/// order of the returned clusters and of indices within them may vary.
pub fn cluster_rectangles(rects: &[Rect], threshold: f32) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut visited = vec![false; rects.len()];

    for start in 0..rects.len() {
        if visited[start] {
            continue;
        }

        let mut members = vec![start];
        visited[start] = true;
        let mut queue = vec![start];

        while let Some(current) = queue.pop() {
            for (other, seen) in visited.iter_mut().enumerate() {
                if !*seen && rects[current].center_distance(&rects[other]) < threshold {
                    *seen = true;
                    members.push(other);
                    queue.push(other);
                }
            }
        }

        clusters.push(members);
    }

    clusters
}

/// Look for a caption in the text directly below a cluster.
///
/// Accepted only when it starts with a figure/table keyword or carries a
/// digit within its first few characters — arbitrary body text below an
/// image is not a caption.
fn caption_below(page: &Page, cluster_box: &Rect, config: &DetectorConfig) -> Option<String> {
    let window = Rect::new(
        cluster_box.x0,
        cluster_box.y1,
        cluster_box.x1,
        (cluster_box.y1 + config.caption_window_below).min(page.height),
    );

    let text = page.text_in(&window);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let first_line = text.lines().next().unwrap_or("").trim();
    let keyword = first_line.starts_with("Figure")
        || first_line.starts_with("Fig")
        || first_line.starts_with("Table");
    let early_digit = first_line
        .chars()
        .take(8)
        .any(|c| c.is_ascii_digit());

    if keyword || early_digit {
        Some(first_line.to_string())
    } else {
        None
    }
}
