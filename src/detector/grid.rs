/// Exhaustive fixed-grid candidate search
///
/// The image is split into `grid_size x grid_size` cells of
/// `floor(width / grid_size) x floor(height / grid_size)` pixels. Remainder
/// pixels on the right and bottom edges belong to no cell and are never
/// covered by a heuristic window; the fallback tiling covers them when the
/// search comes back empty.
///
/// Inside each cell, square windows of `floor(scale * shorter_cell_side)`
/// pixels slide with a step of `step_fraction` of the window side and every
/// position is scored. Windows scoring strictly above the confidence
/// threshold are emitted in image coordinates, in cell-major order.
use crate::config::DetectorConfig;
use crate::detector::scorer::PatternScorer;
use crate::models::{LumaImage, Rect, Region};
use rayon::prelude::*;
use tracing::trace;

/// Cell rectangles, row-major, remainder dropped
pub fn grid_cells(width: usize, height: usize, grid_size: usize) -> Vec<Rect> {
    if grid_size == 0 {
        return Vec::new();
    }
    let cell_w = width / grid_size;
    let cell_h = height / grid_size;
    if cell_w == 0 || cell_h == 0 {
        return Vec::new();
    }

    let mut cells = Vec::with_capacity(grid_size * grid_size);
    for gy in 0..grid_size {
        for gx in 0..grid_size {
            cells.push(Rect::new(gx * cell_w, gy * cell_h, cell_w, cell_h));
        }
    }
    cells
}

/// Window sides used in a cell, skipping those below the minimum pattern size
pub fn window_sides(cell: &Rect, config: &DetectorConfig) -> Vec<usize> {
    let base = cell.min_side() as f64;
    config
        .scales
        .iter()
        .map(|&s| (base * s as f64).floor() as usize)
        .filter(|&side| side >= config.min_pattern_size && side <= cell.min_side())
        .collect()
}

/// Slide step for a window of `side` pixels (at least 1)
pub fn window_step(side: usize, step_fraction: f32) -> usize {
    ((side as f64 * step_fraction as f64).floor() as usize).max(1)
}

/// Score every window of one cell
pub fn search_cell(image: &LumaImage, cell: &Rect, config: &DetectorConfig) -> Vec<Region> {
    let mut detections = Vec::new();

    for side in window_sides(cell, config) {
        let step = window_step(side, config.step_fraction);
        for dy in (0..=cell.height - side).step_by(step) {
            for dx in (0..=cell.width - side).step_by(step) {
                let rect = Rect::square(cell.x + dx, cell.y + dy, side);
                let confidence = PatternScorer::score(image, &rect);
                if confidence > config.confidence_threshold {
                    detections.push(Region::heuristic(rect, confidence));
                }
            }
        }
    }

    detections
}

/// Run the grid search over the whole image
pub fn search(image: &LumaImage, config: &DetectorConfig) -> Vec<Region> {
    let cells = grid_cells(image.width(), image.height(), config.grid_size);

    let per_cell: Vec<Vec<Region>> = if config.parallel {
        cells
            .par_iter()
            .map(|cell| search_cell(image, cell, config))
            .collect()
    } else {
        cells
            .iter()
            .map(|cell| search_cell(image, cell, config))
            .collect()
    };

    let regions: Vec<Region> = per_cell.into_iter().flatten().collect();
    trace!(
        cells = cells.len(),
        candidates = regions.len(),
        "grid search complete"
    );
    regions
}
