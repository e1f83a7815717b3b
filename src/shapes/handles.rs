//! Resize handles and the per-frame move/resize arithmetic.
//!
//! These run on every pointer move, so they are plain arithmetic on page
//! millimetres: no allocation, no I/O.

use serde::{Deserialize, Serialize};

use crate::geometry::{Frame, Point};

use super::MIN_SHAPE_SIZE;

/// One of the eight handles around a selected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    fn moves_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::Left | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::TopRight | Self::Right | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::Top | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::Bottom | Self::BottomRight)
    }

    /// Where the handle sits on `frame`.
    pub fn position(self, frame: &Frame) -> Point {
        let x = if self.moves_left() {
            frame.x
        } else if self.moves_right() {
            frame.right()
        } else {
            frame.x + frame.width / 2.0
        };
        let y = if self.moves_top() {
            frame.y
        } else if self.moves_bottom() {
            frame.bottom()
        } else {
            frame.y + frame.height / 2.0
        };
        Point::new(x, y)
    }
}

/// The handle of `frame` within `tolerance` of `p`, if any.
pub fn handle_at(frame: &Frame, p: Point, tolerance: f64) -> Option<ResizeHandle> {
    ResizeHandle::ALL.into_iter().find(|h| {
        let hp = h.position(frame);
        (hp.x - p.x).abs() <= tolerance && (hp.y - p.y).abs() <= tolerance
    })
}

/// Resize `start` by dragging `handle` by `(dx, dy)`.
///
/// Edges the handle does not own stay put. The result never drops below
/// [`MIN_SHAPE_SIZE`] on either side and never leaves the page.
pub fn resize_frame(
    start: Frame,
    handle: ResizeHandle,
    dx: f64,
    dy: f64,
    page_width: f64,
    page_height: f64,
) -> Frame {
    let mut left = start.x;
    let mut right = start.right();
    let mut top = start.y;
    let mut bottom = start.bottom();

    if handle.moves_left() {
        left = (start.x + dx).min(right - MIN_SHAPE_SIZE).max(0.0);
    }
    if handle.moves_right() {
        right = (right + dx).max(left + MIN_SHAPE_SIZE).min(page_width);
    }
    if handle.moves_top() {
        top = (start.y + dy).min(bottom - MIN_SHAPE_SIZE).max(0.0);
    }
    if handle.moves_bottom() {
        bottom = (bottom + dy).max(top + MIN_SHAPE_SIZE).min(page_height);
    }

    Frame::new(left, top, right - left, bottom - top).with_min_size(MIN_SHAPE_SIZE)
}

/// Translate `start` by `(dx, dy)`, kept fully on the page.
pub fn move_frame(start: Frame, dx: f64, dy: f64, page_width: f64, page_height: f64) -> Frame {
    start.translated(dx, dy).clamped_to_page(page_width, page_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: (f64, f64) = (210.0, 297.0);

    fn start() -> Frame {
        Frame::new(50.0, 50.0, 40.0, 20.0)
    }

    #[test]
    fn test_bottom_right_grows() {
        let f = resize_frame(start(), ResizeHandle::BottomRight, 10.0, 5.0, PAGE.0, PAGE.1);
        assert_eq!(f, Frame::new(50.0, 50.0, 50.0, 25.0));
    }

    #[test]
    fn test_edge_handle_only_moves_its_edge() {
        let f = resize_frame(start(), ResizeHandle::Top, 30.0, -10.0, PAGE.0, PAGE.1);
        assert_eq!(f, Frame::new(50.0, 40.0, 40.0, 30.0));
        let f = resize_frame(start(), ResizeHandle::Left, -5.0, 99.0, PAGE.0, PAGE.1);
        assert_eq!(f, Frame::new(45.0, 50.0, 45.0, 20.0));
    }

    #[test]
    fn test_minimum_enforced_mid_gesture() {
        // dragging the left edge past the right edge stops at the floor
        let f = resize_frame(start(), ResizeHandle::Left, 100.0, 0.0, PAGE.0, PAGE.1);
        assert_eq!(f.width, MIN_SHAPE_SIZE);
        assert_eq!(f.right(), 90.0);
        let f = resize_frame(start(), ResizeHandle::BottomRight, -200.0, -200.0, PAGE.0, PAGE.1);
        assert_eq!((f.width, f.height), (MIN_SHAPE_SIZE, MIN_SHAPE_SIZE));
        assert_eq!((f.x, f.y), (50.0, 50.0));
    }

    #[test]
    fn test_resize_stays_on_page() {
        let f = resize_frame(start(), ResizeHandle::TopLeft, -500.0, -500.0, PAGE.0, PAGE.1);
        assert_eq!((f.x, f.y), (0.0, 0.0));
        let f = resize_frame(start(), ResizeHandle::Right, 500.0, 0.0, PAGE.0, PAGE.1);
        assert_eq!(f.right(), 210.0);
    }

    #[test]
    fn test_move_clamped() {
        let f = move_frame(start(), 500.0, -500.0, PAGE.0, PAGE.1);
        assert_eq!(f, Frame::new(170.0, 0.0, 40.0, 20.0));
    }

    #[test]
    fn test_handle_hit() {
        let frame = start();
        assert_eq!(
            handle_at(&frame, Point::new(90.5, 70.5), 1.0),
            Some(ResizeHandle::BottomRight)
        );
        assert_eq!(
            handle_at(&frame, Point::new(70.0, 50.0), 1.0),
            Some(ResizeHandle::Top)
        );
        assert_eq!(handle_at(&frame, Point::new(70.0, 60.0), 1.0), None);
    }
}
