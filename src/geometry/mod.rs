//! Geometric primitives for page layout.
//!
//! All values are in points unless a caller converts them explicitly.
//! Rectangles are stored as an origin plus size; whether the origin is the
//! top-left (caller space) or bottom-left (PDF space) corner depends on
//! where the rectangle came from.

use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pagesmith::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle given by its origin corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X coordinate of the origin corner
    pub x: f64,
    /// Y coordinate of the origin corner
    pub y: f64,
    /// Width of rectangle
    pub width: f64,
    /// Height of rectangle
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pagesmith::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.right(), 100.0);
    /// assert_eq!(rect.bottom(), 50.0);
    /// ```
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two opposite corners, in any order.
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Same rectangle with non-negative width and height.
    pub fn normalized(&self) -> Self {
        Self::from_points(
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y + self.height),
        )
    }

    /// Minimum x.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Maximum x.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Minimum y.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Maximum y.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check whether a point lies inside or on the edge.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Check whether another rectangle lies entirely inside this one.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-9;
        other.left() >= self.left() - EPS
            && other.right() <= self.right() + EPS
            && other.top() >= self.top() - EPS
            && other.bottom() <= self.bottom() + EPS
    }

    /// Overlapping region, if the rectangles share any area or edge.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Distances inward from each edge of a box (margins, crop insets).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Insets {
    /// Inset from the left edge
    pub left: f64,
    /// Inset from the top edge
    pub top: f64,
    /// Inset from the right edge
    pub right: f64,
    /// Inset from the bottom edge
    pub bottom: f64,
}

impl Insets {
    /// Create insets from explicit values.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same inset on all four sides.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    /// Sum of left and right.
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    /// Sum of top and bottom.
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    /// Every inset multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.left * factor,
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.center(), Point::new(25.0, 40.0));
    }

    #[test]
    fn test_normalized_flips_negative_sizes() {
        let r = Rect::new(50.0, 50.0, -20.0, -10.0).normalized();
        assert_eq!(r, Rect::new(30.0, 40.0, 20.0, 10.0));
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 80.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 80.0, 50.0, 20.0)));

        let far = Rect::new(200.0, 200.0, 10.0, 10.0);
        assert_eq!(a.intersection(&far), None);
    }

    #[test]
    fn test_contains() {
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(area.contains_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(!area.contains_rect(&Rect::new(10.0, 10.0, 100.0, 10.0)));
        assert!(area.contains_point(Point::new(100.0, 0.0)));
        assert!(!area.contains_point(Point::new(-0.1, 0.0)));
    }

    #[test]
    fn test_insets() {
        let m = Insets::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(m.horizontal(), 4.0);
        assert_eq!(m.vertical(), 6.0);
        assert_eq!(Insets::uniform(72.0).scaled(0.5), Insets::uniform(36.0));
    }
}
