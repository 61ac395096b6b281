//! Rectangles.

use cgmath::{Point2, Vector2, Zero};

/// A rectangle in device-independent integer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point2<i32>,

    /// Rectangle size.
    pub size: Vector2<i32>,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<i32>, size: Vector2<i32>) -> Rect {
        Rect { origin, size }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect {
            origin: Point2::new(0, 0),
            size: Vector2::zero(),
        }
    }

    /// Returns true if the point is inside the rectangle.
    pub fn contains(&self, point: Point2<i32>) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.x
            && point.y < self.origin.y + self.size.y
    }

    /// Returns true if the two rectangles intersect.
    pub fn intersects(&self, rect: Rect) -> bool {
        let own_opposite = self.origin + self.size;
        let rect_opposite = rect.origin + rect.size;

        self.origin.x < rect_opposite.x
            && self.origin.y < rect_opposite.y
            && rect.origin.x < own_opposite.x
            && rect.origin.y < own_opposite.y
    }

    /// Returns a new rectangle with the given origin.
    pub fn with_origin(&self, origin: Point2<i32>) -> Rect {
        Rect {
            origin,
            size: self.size,
        }
    }

    /// Returns a new rectangle with the given size.
    pub fn with_size(&self, size: Vector2<i32>) -> Rect {
        Rect {
            origin: self.origin,
            size,
        }
    }
}

#[test]
fn test_contains_is_half_open() {
    let rect = Rect::new(Point2::new(10, 10), Vector2::new(20, 20));
    assert!(rect.contains(Point2::new(10, 10)));
    assert!(rect.contains(Point2::new(29, 29)));
    assert!(!rect.contains(Point2::new(30, 10)));
    assert!(!rect.contains(Point2::new(10, 30)));
    assert!(!rect.contains(Point2::new(9, 15)));
}
