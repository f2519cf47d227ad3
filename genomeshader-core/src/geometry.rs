//! Small pixel-space value types shared by layout and rendering.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn to_f32(self) -> [f32; 2] {
        [self.x as f32, self.y as f32]
    }
}

/// Closed interval along one axis with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    /// Builds a span from two endpoints in either order.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }

    pub fn mid(&self) -> f64 {
        (self.start + self.end) * 0.5
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Shrink symmetrically toward the midpoint by `fraction` of the length.
    pub fn tapered(&self, fraction: f64) -> Span {
        let inset = self.len() * fraction * 0.5;
        Span {
            start: self.start + inset,
            end: self.end - inset,
        }
    }
}

/// Axis-aligned rectangle in pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn from_spans(x: Span, y: Span) -> Self {
        Self {
            x: x.start,
            y: y.start,
            width: x.len(),
            height: y.len(),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and positive, i.e. the track has been laid out.
    pub fn is_ready(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Cubic bezier with four control points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CubicBezier {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicBezier {
    pub fn eval(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point {
            x: b0 * self.p0.x + b1 * self.p1.x + b2 * self.p2.x + b3 * self.p3.x,
            y: b0 * self.p0.y + b1 * self.p1.y + b2 * self.p2.y + b3 * self.p3.y,
        }
    }

    pub fn points(&self) -> [Point; 4] {
        [self.p0, self.p1, self.p2, self.p3]
    }

    pub fn is_finite(&self) -> bool {
        self.points().iter().all(Point::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_orders_endpoints() {
        let s = Span::new(10.0, 4.0);
        assert_eq!(s.start, 4.0);
        assert_eq!(s.len(), 6.0);
        assert_eq!(s.mid(), 7.0);
    }

    #[test]
    fn taper_keeps_midpoint() {
        let s = Span::new(0.0, 100.0).tapered(0.06);
        assert!((s.start - 3.0).abs() < 1e-12);
        assert!((s.end - 97.0).abs() < 1e-12);
        assert_eq!(s.mid(), 50.0);
    }

    #[test]
    fn bezier_hits_endpoints() {
        let c = CubicBezier {
            p0: Point::new(0.0, 0.0),
            p1: Point::new(10.0, 0.0),
            p2: Point::new(20.0, 5.0),
            p3: Point::new(30.0, 5.0),
        };
        assert_eq!(c.eval(0.0), c.p0);
        assert_eq!(c.eval(1.0), c.p3);
        let mid = c.eval(0.5);
        assert!((mid.x - 15.0).abs() < 1e-9);
        assert!((mid.y - 2.5).abs() < 1e-9);
    }

    #[test]
    fn size_readiness() {
        assert!(Size::new(800.0, 200.0).is_ready());
        assert!(!Size::new(0.0, 200.0).is_ready());
        assert!(!Size::new(f64::NAN, 200.0).is_ready());
    }
}
