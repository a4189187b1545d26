/// Guaranteed-coverage tiling used when the grid search is off or empty
///
/// Tiles are squares of side `min(width, height) / 3` stepping by
/// `side - floor(side * overlap)`. The last tile on each axis is pinned to the
/// far edge, so every pixel is covered at least once and no tile leaves the
/// image.
///
/// [`subframe_regions`] gives the coarser fixed partitions the whole-frame
/// pass decodes: quadrants, or the center and top half for live use.
use crate::config::SubframeSet;
use crate::models::{Rect, Region};

/// Tile start offsets along one axis of length `len`
fn tile_starts(len: usize, side: usize, step: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut pos = 0;
    loop {
        if pos + side >= len {
            starts.push(len - side);
            break;
        }
        starts.push(pos);
        pos += step;
    }
    starts
}

/// Fixed overlapping tiling of a `width x height` image
pub fn fallback_regions(width: usize, height: usize, overlap: f32, confidence: f32) -> Vec<Region> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let side = width.min(height) / 3;
    if side == 0 {
        // Too small to tile; hand over the whole frame
        return vec![Region::fallback(Rect::new(0, 0, width, height), confidence)];
    }

    let overlap = if overlap.is_finite() { overlap.clamp(0.0, 0.9) } else { 0.0 };
    let step = (side - (side as f64 * overlap as f64).floor() as usize).max(1);

    let xs = tile_starts(width, side, step);
    let ys = tile_starts(height, side, step);

    let mut regions = Vec::with_capacity(xs.len() * ys.len());
    for &y in &ys {
        for &x in &xs {
            regions.push(Region::fallback(Rect::square(x, y, side), confidence));
        }
    }
    regions
}

/// Fixed sub-frames of a `width x height` image; empty ones are skipped
///
/// With odd sides the last column or row falls outside the quadrants.
pub fn subframe_regions(
    set: SubframeSet,
    width: usize,
    height: usize,
    confidence: f32,
) -> Vec<Region> {
    let (hw, hh) = (width / 2, height / 2);
    let rects = match set {
        SubframeSet::Off => Vec::new(),
        SubframeSet::Quadrants => vec![
            Rect::new(0, 0, hw, hh),
            Rect::new(hw, 0, hw, hh),
            Rect::new(0, hh, hw, hh),
            Rect::new(hw, hh, hw, hh),
        ],
        SubframeSet::CenterTop => vec![
            Rect::new(width / 4, height / 4, hw, hh),
            Rect::new(0, 0, width, hh),
        ],
    };
    rects
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(|r| Region::subframe(r, confidence))
        .collect()
}
