/// Outward padding of surviving candidates
use crate::models::{Rect, Region};

/// Pad `rect` by `floor(min(width, height) * fraction)` per side, clamped to
/// a `width x height` image
pub fn expand_rect(rect: &Rect, fraction: f32, width: usize, height: usize) -> Rect {
    let pad = (rect.min_side() as f64 * fraction.max(0.0) as f64).floor() as usize;

    let x0 = rect.x.saturating_sub(pad).min(width);
    let y0 = rect.y.saturating_sub(pad).min(height);
    let x1 = (rect.right() + pad).min(width).max(x0);
    let y1 = (rect.bottom() + pad).min(height).max(y0);

    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

/// Pad every region; confidence and kind are carried through
pub fn expand_regions(
    regions: &[Region],
    fraction: f32,
    width: usize,
    height: usize,
) -> Vec<Region> {
    regions
        .iter()
        .map(|r| r.with_rect(expand_rect(&r.rect, fraction, width, height)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionKind;

    #[test]
    fn test_interior_padding() {
        let r = expand_rect(&Rect::new(50, 50, 40, 30), 0.1, 200, 200);
        // pad = floor(30 * 0.1) = 3
        assert_eq!(r, Rect::new(47, 47, 46, 36));
    }

    #[test]
    fn test_clamped_at_edges() {
        let r = expand_rect(&Rect::square(2, 95, 50), 0.1, 120, 140);
        assert_eq!(r.x, 0);
        assert_eq!(r.y, 90);
        assert_eq!(r.right(), 57);
        assert_eq!(r.bottom(), 140);
    }

    #[test]
    fn test_always_within_bounds() {
        let (w, h) = (97, 61);
        for x in (0..w).step_by(7) {
            for y in (0..h).step_by(5) {
                for side in [1, 21, 40, 60] {
                    let rect = Rect::square(x, y, side).clip(w, h);
                    let out = expand_rect(&rect, 0.1, w, h);
                    assert!(out.fits_within(w, h));
                }
            }
        }
    }

    #[test]
    fn test_carries_metadata() {
        let regions = vec![Region::fallback(Rect::square(10, 10, 30), 0.5)];
        let out = expand_regions(&regions, 0.1, 100, 100);
        assert_eq!(out[0].kind, RegionKind::Fallback);
        assert_eq!(out[0].confidence, 0.5);
        assert_eq!(out[0].rect, Rect::square(7, 7, 36));
    }
}
