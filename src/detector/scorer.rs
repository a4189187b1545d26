/// Heuristic pattern scoring for a candidate rectangle
///
/// The confidence is the unweighted mean of five sub-scores, each in [0, 1]:
/// three finder-marker matches (top-left, top-right, bottom-left corners),
/// a quiet-zone check on the margin around the rectangle, and a variance
/// check on the central data area. A sub-check with nothing to sample
/// contributes 0, which biases against tiny or clipped rectangles.
use crate::models::region::clamp_unit;
use crate::models::{LumaImage, Rect};

/// Finder sub-square side as a fraction of the rectangle side
const FINDER_FRACTION: f64 = 0.14;
/// Smallest finder sub-square that still has one pixel per module
const MIN_FINDER_SIZE: usize = 7;
/// Quiet-zone margin as a fraction of the rectangle side
const QUIET_ZONE_FRACTION: f64 = 0.05;
/// Pixels brighter than this count as light
const LIGHT_LEVEL: u8 = 128;
/// Data area spans [20%, 80%) of each axis
const DATA_START: f64 = 0.2;
const DATA_END: f64 = 0.8;
const DATA_STRIDE: usize = 2;
/// Variance that saturates the variation score
const FULL_VARIANCE: f64 = 128.0 * 128.0;

/// Per-check scores for one rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    /// Finder match at the top-left corner
    pub top_left: f32,
    /// Finder match at the top-right corner
    pub top_right: f32,
    /// Finder match at the bottom-left corner
    pub bottom_left: f32,
    /// Fraction of light pixels in the surrounding margin
    pub quiet_zone: f32,
    /// Normalized variance of the central data area
    pub variation: f32,
}

impl ScoreBreakdown {
    /// Mean of the five sub-scores, clamped to [0, 1]
    pub fn confidence(&self) -> f32 {
        let sum = self.top_left as f64
            + self.top_right as f64
            + self.bottom_left as f64
            + self.quiet_zone as f64
            + self.variation as f64;
        clamp_unit((sum / 5.0) as f32)
    }
}

/// Stateless scorer; every method is a pure function of its inputs
pub struct PatternScorer;

impl PatternScorer {
    /// Confidence in [0, 1] that `rect` holds a scannable pattern
    pub fn score(image: &LumaImage, rect: &Rect) -> f32 {
        Self::breakdown(image, rect).confidence()
    }

    /// All five sub-scores for `rect`
    pub fn breakdown(image: &LumaImage, rect: &Rect) -> ScoreBreakdown {
        if rect.is_empty() {
            return ScoreBreakdown::default();
        }

        let finder = (rect.min_side() as f64 * FINDER_FRACTION).floor() as usize;
        let (top_left, top_right, bottom_left) = if finder < MIN_FINDER_SIZE {
            (0.0, 0.0, 0.0)
        } else {
            let far_x = rect.right() - finder;
            let far_y = rect.bottom() - finder;
            (
                Self::finder_match(image, rect.x, rect.y, finder),
                Self::finder_match(image, far_x, rect.y, finder),
                Self::finder_match(image, rect.x, far_y, finder),
            )
        };

        ScoreBreakdown {
            top_left,
            top_right,
            bottom_left,
            quiet_zone: Self::quiet_zone(image, rect),
            variation: Self::data_variation(image, rect),
        }
    }

    /// Compare the midline profiles of a `size x size` corner square against
    /// the 1:1:3:1:1 dark-light-dark-light-dark finder profile
    pub fn finder_match(image: &LumaImage, start_x: usize, start_y: usize, size: usize) -> f32 {
        if size < MIN_FINDER_SIZE {
            return 0.0;
        }

        let unit = size / 7;
        let mut score = 0.0f64;
        let mut checks = 0usize;

        // Horizontal scan through middle
        let mid_y = start_y + size / 2;
        if mid_y < image.height() {
            for dx in (0..size).step_by(unit) {
                let x = start_x + dx;
                if x >= image.width() {
                    break;
                }
                score += profile_match(image.get(x, mid_y), dx, size);
                checks += 1;
            }
        }

        // Vertical scan through middle
        let mid_x = start_x + size / 2;
        if mid_x < image.width() {
            for dy in (0..size).step_by(unit) {
                let y = start_y + dy;
                if y >= image.height() {
                    break;
                }
                score += profile_match(image.get(mid_x, y), dy, size);
                checks += 1;
            }
        }

        if checks == 0 {
            return 0.0;
        }
        clamp_unit((score / checks as f64) as f32)
    }

    /// Fraction of light pixels in the margin just outside `rect`, clipped
    /// to the image
    pub fn quiet_zone(image: &LumaImage, rect: &Rect) -> f32 {
        let border = ((rect.min_side() as f64 * QUIET_ZONE_FRACTION).floor() as usize).max(1);

        let outer_x0 = rect.x.saturating_sub(border);
        let outer_y0 = rect.y.saturating_sub(border);
        let outer_x1 = (rect.right() + border).min(image.width());
        let outer_y1 = (rect.bottom() + border).min(image.height());

        let mut light = 0usize;
        let mut total = 0usize;
        for y in outer_y0..outer_y1 {
            let inside_rows = y >= rect.y && y < rect.bottom();
            for x in outer_x0..outer_x1 {
                if inside_rows && x >= rect.x && x < rect.right() {
                    continue;
                }
                if image.get(x, y) > LIGHT_LEVEL {
                    light += 1;
                }
                total += 1;
            }
        }

        if total == 0 {
            return 0.0;
        }
        clamp_unit(light as f32 / total as f32)
    }

    /// `min(1, variance / 128^2)` over the central 60% of `rect`, sampled on a
    /// stride-2 grid
    pub fn data_variation(image: &LumaImage, rect: &Rect) -> f32 {
        let x_start = rect.x + (rect.width as f64 * DATA_START).floor() as usize;
        let x_end = (rect.x + (rect.width as f64 * DATA_END).floor() as usize).min(image.width());
        let y_start = rect.y + (rect.height as f64 * DATA_START).floor() as usize;
        let y_end = (rect.y + (rect.height as f64 * DATA_END).floor() as usize).min(image.height());

        let mut sum = 0u64;
        let mut count = 0usize;
        for y in (y_start..y_end).step_by(DATA_STRIDE) {
            for x in (x_start..x_end).step_by(DATA_STRIDE) {
                sum += image.get(x, y) as u64;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }

        let mean = sum as f64 / count as f64;
        let mut variance = 0.0f64;
        for y in (y_start..y_end).step_by(DATA_STRIDE) {
            for x in (x_start..x_end).step_by(DATA_STRIDE) {
                let diff = image.get(x, y) as f64 - mean;
                variance += diff * diff;
            }
        }
        variance /= count as f64;

        clamp_unit((variance / FULL_VARIANCE).min(1.0) as f32)
    }
}

/// Expected luminance at `position` along a finder of side `size`
///
/// Finder pattern: dark-light-dark-light-dark (1:1:3:1:1 ratio)
pub fn expected_finder_value(position: usize, size: usize) -> u8 {
    let unit = size as f64 / 7.0;
    let pos = position as f64 / unit;
    if !(1.0..6.0).contains(&pos) {
        0
    } else if pos < 2.0 {
        255
    } else if pos < 5.0 {
        0
    } else {
        255
    }
}

#[inline]
fn profile_match(brightness: u8, position: usize, size: usize) -> f64 {
    let expected = expected_finder_value(position, size);
    1.0 - (brightness as f64 - expected as f64).abs() / 255.0
}
