/// Greedy non-maximum suppression over candidate regions
use crate::models::{Rect, Region};

/// Intersection over union of two rectangles; 0 when disjoint or degenerate
pub fn iou(a: &Rect, b: &Rect) -> f32 {
    let Some(inter) = a.intersection(b) else {
        return 0.0;
    };
    let intersection = inter.area() as f64;
    let union = a.area() as f64 + b.area() as f64 - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    (intersection / union) as f32
}

/// Keep the most confident region of every overlapping cluster
///
/// Candidates are stable-sorted by descending confidence, so ties keep their
/// input order. A candidate survives when its IoU with every region kept so
/// far is at most `iou_threshold`. Survivors come back in descending
/// confidence order.
pub fn suppress(mut regions: Vec<Region>, iou_threshold: f32) -> Vec<Region> {
    regions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Region> = Vec::new();
    for candidate in regions {
        let overlaps = kept
            .iter()
            .any(|k| iou(&candidate.rect, &k.rect) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
