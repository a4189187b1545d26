/// Axis-aligned rectangle in integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge
    pub x: usize,
    /// Top edge
    pub y: usize,
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square rectangle with the given side
    pub fn square(x: usize, y: usize, side: usize) -> Self {
        Self::new(x, y, side, side)
    }

    /// Exclusive right edge
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Area in pixels
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Shorter side
    pub fn min_side(&self) -> usize {
        self.width.min(self.height)
    }

    /// True when width or height is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlapping rectangle, if any
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// True when the rectangles share at least one pixel
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// True when the rectangle lies entirely within a `width x height` image
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Clip to a `width x height` image
    pub fn clip(&self, width: usize, height: usize) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// How a candidate region was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Scored by the grid search
    Heuristic,
    /// Fixed coverage tile from the degraded mode
    Fallback,
    /// Quadrant or other fixed sub-frame of the whole-frame pass
    Subframe,
}

impl RegionKind {
    /// Short label used in logs and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Heuristic => "heuristic",
            RegionKind::Fallback => "fallback",
            RegionKind::Subframe => "subframe",
        }
    }
}

/// A rectangle hypothesized to contain a scannable pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Pixel bounds relative to the full image
    pub rect: Rect,
    /// Heuristic score in [0, 1]
    pub confidence: f32,
    /// Origin of the candidate
    pub kind: RegionKind,
}

impl Region {
    /// Create a region; confidence is clamped to [0, 1] and NaN becomes 0
    pub fn new(rect: Rect, confidence: f32, kind: RegionKind) -> Self {
        Self {
            rect,
            confidence: clamp_unit(confidence),
            kind,
        }
    }

    /// Region found by the grid search
    pub fn heuristic(rect: Rect, confidence: f32) -> Self {
        Self::new(rect, confidence, RegionKind::Heuristic)
    }

    /// Coverage tile from the fallback generator
    pub fn fallback(rect: Rect, confidence: f32) -> Self {
        Self::new(rect, confidence, RegionKind::Fallback)
    }

    /// Fixed sub-frame of the whole-frame pass
    pub fn subframe(rect: Rect, confidence: f32) -> Self {
        Self::new(rect, confidence, RegionKind::Subframe)
    }

    /// Same region with different bounds
    pub fn with_rect(&self, rect: Rect) -> Self {
        Self { rect, ..*self }
    }
}

pub(crate) fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 5, 5)));

        // Touching edges do not overlap
        let c = Rect::new(10, 0, 5, 5);
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_overlaps() {
        let a = Rect::square(0, 0, 10);
        assert!(a.overlaps(&Rect::square(9, 9, 5)));
        assert!(!a.overlaps(&Rect::square(10, 0, 5)));
        assert!(!a.overlaps(&Rect::new(3, 3, 0, 4)));
    }

    #[test]
    fn test_clip() {
        let r = Rect::new(90, 90, 20, 20);
        assert_eq!(r.clip(100, 100), Rect::new(90, 90, 10, 10));
        assert_eq!(Rect::new(120, 0, 5, 5).clip(100, 100).area(), 0);
    }

    #[test]
    fn test_confidence_clamped() {
        let rect = Rect::square(0, 0, 21);
        assert_eq!(Region::heuristic(rect, 1.7).confidence, 1.0);
        assert_eq!(Region::heuristic(rect, -0.2).confidence, 0.0);
        assert_eq!(Region::fallback(rect, f32::NAN).confidence, 0.0);
    }
}
