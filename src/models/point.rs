/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Translate point by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// The four corners of a located code, clockwise from top-left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Corners {
    /// Top-left corner
    pub top_left: Point,
    /// Top-right corner
    pub top_right: Point,
    /// Bottom-right corner
    pub bottom_right: Point,
    /// Bottom-left corner
    pub bottom_left: Point,
}

impl Corners {
    /// Build corners from a clockwise array starting at top-left
    pub fn from_clockwise(points: [Point; 4]) -> Self {
        Self {
            top_left: points[0],
            top_right: points[1],
            bottom_right: points[2],
            bottom_left: points[3],
        }
    }

    /// Shift every corner by (dx, dy), e.g. from crop space back to the full frame
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            top_left: self.top_left.translate(dx, dy),
            top_right: self.top_right.translate(dx, dy),
            bottom_right: self.bottom_right.translate(dx, dy),
            bottom_left: self.bottom_left.translate(dx, dy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_corners_offset() {
        let corners = Corners::from_clockwise([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        let moved = corners.offset(5.0, 7.0);
        assert_eq!(moved.top_left, Point::new(5.0, 7.0));
        assert_eq!(moved.bottom_right, Point::new(15.0, 17.0));
    }
}
