//! Orientation of the genomic axis.
//!
//! The *flow* axis carries genomic position (and ribbons flow along it); the
//! *stack* axis is perpendicular and carries the stacked allele nodes. All
//! orientation-dependent code goes through [`Axis`] instead of branching on
//! x/y itself.

use crate::geometry::{Point, Rect, Size, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Position increases left to right.
    #[default]
    Horizontal,
    /// Position increases bottom to top, i.e. pixel values decrease.
    Vertical,
}

impl Axis {
    /// Increasing genomic position maps to decreasing pixels.
    pub fn is_inverted(self) -> bool {
        matches!(self, Axis::Vertical)
    }

    pub fn flow(self, p: Point) -> f64 {
        match self {
            Axis::Horizontal => p.x,
            Axis::Vertical => p.y,
        }
    }

    pub fn stack(self, p: Point) -> f64 {
        match self {
            Axis::Horizontal => p.y,
            Axis::Vertical => p.x,
        }
    }

    pub fn point(self, flow: f64, stack: f64) -> Point {
        match self {
            Axis::Horizontal => Point::new(flow, stack),
            Axis::Vertical => Point::new(stack, flow),
        }
    }

    pub fn rect(self, flow: Span, stack: Span) -> Rect {
        match self {
            Axis::Horizontal => Rect::from_spans(flow, stack),
            Axis::Vertical => Rect::from_spans(stack, flow),
        }
    }

    pub fn flow_extent(self, size: Size) -> f64 {
        match self {
            Axis::Horizontal => size.width,
            Axis::Vertical => size.height,
        }
    }

    pub fn stack_extent(self, size: Size) -> f64 {
        match self {
            Axis::Horizontal => size.height,
            Axis::Vertical => size.width,
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Axis::Horizontal),
            "vertical" | "v" => Ok(Axis::Vertical),
            other => Err(format!("unknown orientation '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_swap_with_orientation() {
        let p = Axis::Vertical.point(5.0, 9.0);
        assert_eq!(p, Point::new(9.0, 5.0));
        assert_eq!(Axis::Vertical.flow(p), 5.0);
        assert_eq!(Axis::Vertical.stack(p), 9.0);

        let p = Axis::Horizontal.point(5.0, 9.0);
        assert_eq!(Axis::Horizontal.flow(p), 5.0);
        assert_eq!(Axis::Horizontal.stack(p), 9.0);
    }

    #[test]
    fn extents_follow_axis() {
        let size = Size::new(800.0, 300.0);
        assert_eq!(Axis::Horizontal.flow_extent(size), 800.0);
        assert_eq!(Axis::Vertical.flow_extent(size), 300.0);
        assert_eq!(Axis::Vertical.stack_extent(size), 800.0);
    }

    #[test]
    fn rect_from_axis_spans() {
        let r = Axis::Vertical.rect(Span::new(10.0, 20.0), Span::new(0.0, 4.0));
        assert_eq!(r, Rect { x: 0.0, y: 10.0, width: 4.0, height: 10.0 });
    }
}
