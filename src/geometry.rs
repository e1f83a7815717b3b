//! Points and axis-aligned frames in page millimetres (origin top-left,
//! y growing downwards).

use serde::{Deserialize, Serialize};

/// A point on the page in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The frame spanned by two corner points, in any drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Grow each side up to `min`. Non-finite sizes become `min`.
    pub fn with_min_size(&self, min: f64) -> Self {
        let fix = |v: f64| if v.is_finite() { v.max(min) } else { min };
        Self {
            width: fix(self.width),
            height: fix(self.height),
            ..*self
        }
    }

    /// Shift the frame so it lies inside a `page_width` × `page_height` page.
    /// A frame larger than the page is pinned to the top-left edge.
    pub fn clamped_to_page(&self, page_width: f64, page_height: f64) -> Self {
        let x = self.x.min(page_width - self.width).max(0.0);
        let y = self.y.min(page_height - self.height).max(0.0);
        Self { x, y, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes_direction() {
        let f = Frame::from_corners(Point::new(50.0, 40.0), Point::new(20.0, 10.0));
        assert_eq!(f, Frame::new(20.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn test_clamp_to_page() {
        let f = Frame::new(200.0, -5.0, 20.0, 10.0).clamped_to_page(210.0, 297.0);
        assert_eq!(f, Frame::new(190.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_min_size() {
        let f = Frame::new(0.0, 0.0, -3.0, f64::NAN).with_min_size(5.0);
        assert_eq!(f.width, 5.0);
        assert_eq!(f.height, 5.0);
    }
}
