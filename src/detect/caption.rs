//! Caption-anchored region detection.
//!
//! Figure artwork in clinical papers sits directly above its caption, so a
//! validated "Figure N." caption is a reliable anchor: reach a fixed distance
//! up from the caption line and the artwork is inside the box.

use regex::Regex;

use crate::model::{Page, Rect};

use super::{DetectionMethod, DetectorConfig, Region};

/// Detect regions anchored to "Figure N." captions.
pub(super) fn detect(page: &Page, config: &DetectorConfig, pattern: &Regex) -> Vec<Region> {
    let mut regions = Vec::new();
    let bounds = page.bounds();

    for word in &page.words {
        // Cheap pre-filter; the window re-check below does the real work
        if !word.text.starts_with("Figure") {
            continue;
        }

        let anchor = word.bbox;

        // Caption window: rightward and slightly down from the anchor,
        // covering the full caption line
        let caption_window = Rect::new(
            anchor.x0,
            anchor.y0,
            anchor.x1 + config.caption_right_extend,
            anchor.y1 + config.caption_below,
        )
        .clipped_to(&bounds);

        let caption_text = page.text_in(&caption_window);
        let caption_text = caption_text.trim();

        // Guard against stray "Figure" occurrences in body text: the window
        // content itself must read like a caption
        if !pattern.is_match(caption_text) {
            continue;
        }

        let region_box = Rect::new(
            anchor.x0 - config.caption_left_pad,
            anchor.y0 - config.caption_above,
            anchor.x1 + config.caption_right_extend,
            anchor.y1 + config.caption_below,
        )
        .clipped_to(&bounds);

        log::debug!(
            "caption region on page {}: {:?} ({:?})",
            page.index,
            region_box,
            caption_text.lines().next()
        );

        regions.push(Region {
            bbox: region_box,
            caption: Some(caption_text.replace('\n', " ")),
            method: DetectionMethod::Caption,
        });
    }

    regions
}
