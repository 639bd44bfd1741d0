//! Vector path construction.
//!
//! [`PathEncoder`] turns shapes into path operators in PDF user space
//! (origin bottom-left, y up, angles counter-clockwise in degrees). Curved
//! shapes are approximated with cubic Béziers:
//!
//! - quarter ellipses use `k = 4/3·(√2−1)`
//! - arcs are split into chunks of at most 90° with
//!   `k = 4/3·(1−cos(Δ/2))/sin(Δ/2)`

use super::content_stream::ContentStreamOp;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};

/// Control-point factor for a quarter ellipse, `4/3·(√2−1)`.
pub const ELLIPSE_KAPPA: f64 = 0.552_284_749_830_793_4;

/// How a constructed path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    /// End the path without painting (n)
    None,
    /// Fill only (f)
    Fill,
    /// Stroke only (S)
    #[default]
    Stroke,
    /// Fill, then stroke (B)
    FillStroke,
}

impl PaintMode {
    /// Mode from independent fill and stroke flags.
    pub fn from_flags(fill: bool, stroke: bool) -> Self {
        match (fill, stroke) {
            (true, true) => PaintMode::FillStroke,
            (true, false) => PaintMode::Fill,
            (false, true) => PaintMode::Stroke,
            (false, false) => PaintMode::None,
        }
    }

    /// Whether the brush is used.
    pub fn fills(self) -> bool {
        matches!(self, PaintMode::Fill | PaintMode::FillStroke)
    }

    /// Whether the pen is used.
    pub fn strokes(self) -> bool {
        matches!(self, PaintMode::Stroke | PaintMode::FillStroke)
    }

    /// The painting operator.
    pub fn op(self) -> ContentStreamOp {
        match self {
            PaintMode::None => ContentStreamOp::EndPath,
            PaintMode::Fill => ContentStreamOp::Fill,
            PaintMode::Stroke => ContentStreamOp::Stroke,
            PaintMode::FillStroke => ContentStreamOp::FillStroke,
        }
    }
}

/// Builds path construction and painting operators.
#[derive(Debug, Clone, Default)]
pub struct PathEncoder {
    ops: Vec<ContentStreamOp>,
    open_path: bool,
}

impl PathEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: ContentStreamOp) {
        self.ops.push(op);
        self.open_path = true;
    }

    /// Straight line between two points.
    pub fn line(&mut self, from: Point, to: Point) -> &mut Self {
        self.push(ContentStreamOp::MoveTo(from.x, from.y));
        self.push(ContentStreamOp::LineTo(to.x, to.y));
        self
    }

    /// Connected segments through `points`, optionally closed.
    pub fn polyline(&mut self, points: &[Point], close: bool) -> Result<&mut Self> {
        let (first, rest) = match points.split_first() {
            Some((first, rest)) if !rest.is_empty() => (first, rest),
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "a polyline needs at least 2 points, got {}",
                    points.len()
                )))
            },
        };
        self.push(ContentStreamOp::MoveTo(first.x, first.y));
        for p in rest {
            self.push(ContentStreamOp::LineTo(p.x, p.y));
        }
        if close {
            self.push(ContentStreamOp::ClosePath);
        }
        Ok(self)
    }

    /// Axis-aligned rectangle with its origin at the lower-left corner.
    ///
    /// Zero-area rectangles produce nothing.
    pub fn rect(&mut self, r: Rect) -> &mut Self {
        if r.is_empty() {
            return self;
        }
        self.push(ContentStreamOp::Rectangle(r.x, r.y, r.width, r.height));
        self
    }

    /// Rectangle with circular corners of `radius`.
    pub fn rounded_rect(&mut self, r: Rect, radius: f64) -> &mut Self {
        if r.is_empty() {
            return self;
        }
        let rad = radius.min(r.width / 2.0).min(r.height / 2.0);
        if rad <= 0.0 {
            return self.rect(r);
        }
        let k = rad * ELLIPSE_KAPPA;
        let (l, b, rt, t) = (r.left(), r.top(), r.right(), r.bottom());

        self.push(ContentStreamOp::MoveTo(l + rad, b));
        self.push(ContentStreamOp::LineTo(rt - rad, b));
        self.push(ContentStreamOp::CurveTo(rt - rad + k, b, rt, b + rad - k, rt, b + rad));
        self.push(ContentStreamOp::LineTo(rt, t - rad));
        self.push(ContentStreamOp::CurveTo(rt, t - rad + k, rt - rad + k, t, rt - rad, t));
        self.push(ContentStreamOp::LineTo(l + rad, t));
        self.push(ContentStreamOp::CurveTo(l + rad - k, t, l, t - rad + k, l, t - rad));
        self.push(ContentStreamOp::LineTo(l, b + rad));
        self.push(ContentStreamOp::CurveTo(l, b + rad - k, l + rad - k, b, l + rad, b));
        self.push(ContentStreamOp::ClosePath);
        self
    }

    /// Ellipse inscribed in `bounds`, as four Béziers.
    pub fn ellipse(&mut self, bounds: Rect) -> &mut Self {
        if bounds.is_empty() {
            return self;
        }
        let c = bounds.center();
        let (rx, ry) = (bounds.width / 2.0, bounds.height / 2.0);
        let (kx, ky) = (rx * ELLIPSE_KAPPA, ry * ELLIPSE_KAPPA);

        self.push(ContentStreamOp::MoveTo(c.x + rx, c.y));
        self.push(ContentStreamOp::CurveTo(c.x + rx, c.y + ky, c.x + kx, c.y + ry, c.x, c.y + ry));
        self.push(ContentStreamOp::CurveTo(c.x - kx, c.y + ry, c.x - rx, c.y + ky, c.x - rx, c.y));
        self.push(ContentStreamOp::CurveTo(c.x - rx, c.y - ky, c.x - kx, c.y - ry, c.x, c.y - ry));
        self.push(ContentStreamOp::CurveTo(c.x + kx, c.y - ry, c.x + rx, c.y - ky, c.x + rx, c.y));
        self.push(ContentStreamOp::ClosePath);
        self
    }

    /// Circle around `center`.
    pub fn circle(&mut self, center: Point, radius: f64) -> &mut Self {
        self.ellipse(Rect::new(
            center.x - radius,
            center.y - radius,
            radius * 2.0,
            radius * 2.0,
        ))
    }

    /// Open elliptical arc on the ellipse inscribed in `bounds`.
    ///
    /// A zero sweep produces nothing. Sweeps beyond a full turn are capped.
    pub fn arc(&mut self, bounds: Rect, start_deg: f64, sweep_deg: f64) -> &mut Self {
        if let Some(start) = arc_start(&bounds, start_deg, sweep_deg) {
            self.push(ContentStreamOp::MoveTo(start.x, start.y));
            self.arc_segments(&bounds, start_deg, sweep_deg);
        }
        self
    }

    /// Arc closed back to the ellipse center.
    pub fn pie(&mut self, bounds: Rect, start_deg: f64, sweep_deg: f64) -> &mut Self {
        if let Some(start) = arc_start(&bounds, start_deg, sweep_deg) {
            let c = bounds.center();
            self.push(ContentStreamOp::MoveTo(start.x, start.y));
            self.arc_segments(&bounds, start_deg, sweep_deg);
            self.push(ContentStreamOp::LineTo(c.x, c.y));
            self.push(ContentStreamOp::ClosePath);
        }
        self
    }

    /// Single cubic Bézier.
    pub fn bezier(&mut self, p0: Point, c1: Point, c2: Point, p3: Point) -> &mut Self {
        self.push(ContentStreamOp::MoveTo(p0.x, p0.y));
        self.push(ContentStreamOp::CurveTo(c1.x, c1.y, c2.x, c2.y, p3.x, p3.y));
        self
    }

    fn arc_segments(&mut self, bounds: &Rect, start_deg: f64, sweep_deg: f64) {
        let sweep = sweep_deg.clamp(-360.0, 360.0);
        let count = arc_segment_count(sweep);
        let delta = (sweep / count as f64).to_radians();
        let c = bounds.center();
        let (rx, ry) = (bounds.width / 2.0, bounds.height / 2.0);
        let k = 4.0 / 3.0 * (1.0 - (delta / 2.0).cos()) / (delta / 2.0).sin();

        let mut a1 = start_deg.to_radians();
        for _ in 0..count {
            let a2 = a1 + delta;
            let (s1, c1) = a1.sin_cos();
            let (s2, c2) = a2.sin_cos();
            self.push(ContentStreamOp::CurveTo(
                c.x + rx * (c1 - k * s1),
                c.y + ry * (s1 + k * c1),
                c.x + rx * (c2 + k * s2),
                c.y + ry * (s2 - k * c2),
                c.x + rx * c2,
                c.y + ry * s2,
            ));
            a1 = a2;
        }
    }

    /// Finish the current path with a painting operator.
    ///
    /// Does nothing when no path has been started since the last paint.
    pub fn paint(&mut self, mode: PaintMode) -> &mut Self {
        if self.open_path {
            self.ops.push(mode.op());
            self.open_path = false;
        }
        self
    }

    /// Number of Bézier segments emitted so far.
    pub fn curve_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_curve()).count()
    }

    /// True when nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Take the collected operators.
    pub fn finish(self) -> Vec<ContentStreamOp> {
        self.ops
    }
}

/// Number of ≤90° chunks for a sweep, `ceil(|sweep| / 90)`.
pub fn arc_segment_count(sweep_deg: f64) -> usize {
    let s = sweep_deg.abs().min(360.0);
    if s == 0.0 {
        return 0;
    }
    // Tolerance keeps exact multiples of 90 from rounding up
    ((s / 90.0) - 1e-9).ceil().max(1.0) as usize
}

fn arc_start(bounds: &Rect, start_deg: f64, sweep_deg: f64) -> Option<Point> {
    if arc_segment_count(sweep_deg) == 0 || bounds.is_empty() {
        return None;
    }
    let c = bounds.center();
    let (s, co) = start_deg.to_radians().sin_cos();
    Some(Point::new(c.x + bounds.width / 2.0 * co, c.y + bounds.height / 2.0 * s))
}
