//! Measurement units and writable-area clamping.
//!
//! Pages store every length in points. Public drawing calls accept values in
//! the page's current [`Unit`] and convert on entry.

use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Measurement unit for caller-supplied lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// 1/72 inch
    #[default]
    Point,
    /// 72 points
    Inch,
    /// 72/2.54 points
    Centimeter,
    /// 72/25.4 points
    Millimeter,
    /// 12 points
    Pica,
    /// 1/20 point
    Twip,
    /// 1/96 inch
    Pixel,
}

impl Unit {
    /// Number of points in one unit.
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Point => 1.0,
            Unit::Inch => 72.0,
            Unit::Centimeter => 72.0 / 2.54,
            Unit::Millimeter => 72.0 / 25.4,
            Unit::Pica => 12.0,
            Unit::Twip => 1.0 / 20.0,
            Unit::Pixel => 72.0 / 96.0,
        }
    }

    /// Convert a value in this unit to points.
    ///
    /// ```
    /// use pdf_pagesmith::writer::Unit;
    ///
    /// assert_eq!(Unit::Inch.to_internal(1.5), 108.0);
    /// ```
    pub fn to_internal(self, value: f64) -> f64 {
        value * self.points_per_unit()
    }

    /// Convert points to a value in this unit.
    pub fn to_external(self, points: f64) -> f64 {
        points / self.points_per_unit()
    }

    /// Convert a point whose coordinates are in this unit.
    pub fn point_to_internal(self, p: Point) -> Point {
        Point::new(self.to_internal(p.x), self.to_internal(p.y))
    }

    /// Convert a rectangle whose fields are in this unit.
    pub fn rect_to_internal(self, r: Rect) -> Rect {
        Rect::new(
            self.to_internal(r.x),
            self.to_internal(r.y),
            self.to_internal(r.width),
            self.to_internal(r.height),
        )
    }
}

/// Outcome of fitting a rectangle into the writable area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClampResult {
    /// The rectangle was already inside
    Fits(Rect),
    /// The rectangle was shrunk to its overlap with the area
    Shrunk(Rect),
    /// No overlap at all
    OutOfArea,
}

impl ClampResult {
    /// The usable rectangle, if any.
    pub fn rect(&self) -> Option<Rect> {
        match self {
            ClampResult::Fits(r) | ClampResult::Shrunk(r) => Some(*r),
            ClampResult::OutOfArea => None,
        }
    }

    /// True only when no shrinking was necessary.
    pub fn fits(&self) -> bool {
        matches!(self, ClampResult::Fits(_))
    }
}

/// Push a point to the nearest edge of `area` if it lies outside.
pub fn clamp_point(area: &Rect, p: Point) -> Point {
    Point::new(
        p.x.clamp(area.left(), area.right().max(area.left())),
        p.y.clamp(area.top(), area.bottom().max(area.top())),
    )
}

/// Shrink a rectangle to the part inside `area`; never enlarges.
pub fn clamp_rect(area: &Rect, r: Rect) -> ClampResult {
    let r = r.normalized();
    if area.contains_rect(&r) {
        return ClampResult::Fits(r);
    }
    match area.intersection(&r) {
        Some(clipped) if !clipped.is_empty() || r.is_empty() => ClampResult::Shrunk(clipped),
        _ => ClampResult::OutOfArea,
    }
}
