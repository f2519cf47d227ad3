//! Genomic position ↔ pixel mapping with expandable insertion gaps.

use crate::axis::Axis;
use crate::gaps::{GapEntry, GapIndex};
use crate::types::{GenomicPos, GenomicWindow, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fixed-point steps taken by [`CoordinateMapper::to_genomic`] before it
/// falls back to bisection.
pub const INVERSE_ITERATIONS: usize = 5;
const BISECTION_STEPS: usize = 80;

/// How variant columns are placed along the flow axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantOrdering {
    /// Each column sits at its mapped genomic position.
    #[default]
    Genomic,
    /// Columns are spread evenly across the track regardless of position.
    EqualSpacing,
}

impl std::str::FromStr for VariantOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "genomic" => Ok(VariantOrdering::Genomic),
            "equal" | "equal-spacing" | "equal_spacing" => Ok(VariantOrdering::EqualSpacing),
            other => Err(format!("unknown variant ordering '{}'", other)),
        }
    }
}

/// Maps between genomic coordinates and pixels along the flow axis.
///
/// Built per frame. Expanded insertion gaps widen the effective span, so
/// every base after an expanded insertion shifts by the gap width.
#[derive(Debug, Clone)]
pub struct CoordinateMapper<'a> {
    window: GenomicWindow,
    extent: f64,
    padding: f64,
    axis: Axis,
    gaps: &'a GapIndex,
    expanded: &'a HashSet<VariantId>,
    total_gap_bp: u64,
    valid: bool,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(
        window: GenomicWindow,
        extent: f64,
        padding: f64,
        axis: Axis,
        gaps: &'a GapIndex,
        expanded: &'a HashSet<VariantId>,
    ) -> Self {
        let valid = extent.is_finite()
            && extent > 0.0
            && padding.is_finite()
            && padding >= 0.0
            && extent - 2.0 * padding > 0.0
            && !window.is_empty();
        if !valid {
            log::warn!(
                "invalid coordinate mapping (window {}, extent {}, padding {}); clamping to padding edge",
                window,
                extent,
                padding
            );
        }
        let total_gap_bp = if valid { gaps.total_expanded(&window, expanded) } else { 0 };

        Self {
            window,
            extent,
            padding,
            axis,
            gaps,
            expanded,
            total_gap_bp,
            valid,
        }
    }

    pub fn window(&self) -> GenomicWindow {
        self.window
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn inner_extent(&self) -> f64 {
        if self.valid {
            self.extent - 2.0 * self.padding
        } else {
            0.0
        }
    }

    /// Window span plus every expanded gap inside it, in bp.
    pub fn effective_span(&self) -> f64 {
        (self.window.span() + self.total_gap_bp) as f64
    }

    pub fn total_gap_bp(&self) -> u64 {
        self.total_gap_bp
    }

    pub fn pixels_per_bp(&self) -> f64 {
        if self.valid {
            self.inner_extent() / self.effective_span()
        } else {
            0.0
        }
    }

    pub fn gap_pixel_width(&self, entry: &GapEntry) -> f64 {
        entry.gap_bp as f64 * self.pixels_per_bp()
    }

    fn safe_edge(&self) -> f64 {
        if self.padding.is_finite() && self.padding >= 0.0 {
            self.padding
        } else {
            0.0
        }
    }

    fn gap_before(&self, position: f64) -> f64 {
        self.gaps
            .gap_before(position, self.window.start as f64, self.expanded) as f64
    }

    /// Distance from the window start in effective (gap-inclusive) bp.
    fn offset_of(&self, position: f64) -> f64 {
        (position - self.window.start as f64) + self.gap_before(position)
    }

    fn pixel_for_fraction(&self, fraction: f64) -> f64 {
        let fraction = if self.axis.is_inverted() { 1.0 - fraction } else { fraction };
        self.padding + fraction * self.inner_extent()
    }

    fn fraction_for_pixel(&self, pixel: f64) -> f64 {
        let fraction = (pixel - self.padding) / self.inner_extent();
        if self.axis.is_inverted() {
            1.0 - fraction
        } else {
            fraction
        }
    }

    /// Pixel along the flow axis, clamped to the inner extent.
    pub fn to_pixel(&self, position: f64) -> f64 {
        if !self.valid {
            return self.safe_edge();
        }
        if !position.is_finite() {
            log::warn!("non-finite genomic position {}; using padding edge", position);
            return self.safe_edge();
        }
        let fraction = (self.offset_of(position) / self.effective_span()).clamp(0.0, 1.0);
        self.pixel_for_fraction(fraction)
    }

    /// Like [`to_pixel`](Self::to_pixel) but positions outside the window map
    /// past the padding edges. Only gaps inside the window are counted, so
    /// everything after the window end shifts by the full expanded width.
    pub fn to_pixel_unclamped(&self, position: f64) -> f64 {
        if !self.valid {
            return self.safe_edge();
        }
        if !position.is_finite() {
            log::warn!("non-finite genomic position {}; using padding edge", position);
            return self.safe_edge();
        }
        let offset = if position <= self.window.end as f64 {
            self.offset_of(position)
        } else {
            (position - self.window.start as f64) + self.total_gap_bp as f64
        };
        self.pixel_for_fraction(offset / self.effective_span())
    }

    /// Inverse of [`to_pixel`](Self::to_pixel).
    ///
    /// Seeds with the gap-free estimate and iterates the gap term a fixed
    /// number of times; if that does not settle (an expanded gap sits between
    /// the estimate and the answer) the monotone forward map is bisected.
    pub fn to_genomic(&self, pixel: f64) -> f64 {
        let start = self.window.start as f64;
        if !self.valid {
            return start;
        }
        if !pixel.is_finite() {
            log::warn!("non-finite pixel {}; using window start", pixel);
            return start;
        }

        let end = self.window.end as f64;
        let target = self.fraction_for_pixel(pixel).clamp(0.0, 1.0) * self.effective_span();

        let mut estimate = start + target;
        for _ in 0..INVERSE_ITERATIONS {
            estimate = start + target - self.gap_before(estimate);
        }
        estimate = estimate.clamp(start, end);

        let tolerance = 1e-9 * self.effective_span().max(1.0);
        if (self.offset_of(estimate) - target).abs() <= tolerance {
            return estimate;
        }
        self.bisect(target)
    }

    fn bisect(&self, target: f64) -> f64 {
        let mut lo = self.window.start as f64;
        let mut hi = self.window.end as f64;
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if self.offset_of(mid) < target {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-12 * hi.abs().max(1.0) {
                break;
            }
        }
        0.5 * (lo + hi)
    }

    /// Flow-axis centre for each column. `positions` must be in ascending order.
    ///
    /// Genomic placement is unclamped: neighbours outside the window land
    /// off screen.
    pub fn column_centers(&self, positions: &[GenomicPos], ordering: VariantOrdering) -> Vec<f64> {
        match ordering {
            VariantOrdering::Genomic => positions.iter().map(|p| self.to_pixel_unclamped(*p as f64)).collect(),
            VariantOrdering::EqualSpacing => {
                if !self.valid {
                    return vec![self.safe_edge(); positions.len()];
                }
                let n = positions.len() as f64;
                (0..positions.len())
                    .map(|i| self.pixel_for_fraction((i as f64 + 0.5) / n))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaps::{gap_size, DEFAULT_EXPANSION_FACTOR};

    fn single_insertion() -> GapIndex {
        GapIndex::from_entries(vec![GapEntry {
            variant_id: VariantId(1),
            position: 1300,
            gap_bp: gap_size(30, DEFAULT_EXPANSION_FACTOR),
        }])
    }

    #[test]
    fn linear_without_gaps() {
        let gaps = GapIndex::default();
        let expanded = HashSet::new();
        let m = CoordinateMapper::new(GenomicWindow::new(1000, 2000), 1020.0, 10.0, Axis::Horizontal, &gaps, &expanded);
        assert_eq!(m.pixels_per_bp(), 1.0);
        assert_eq!(m.to_pixel(1000.0), 10.0);
        assert_eq!(m.to_pixel(1500.0), 510.0);
        assert_eq!(m.to_pixel(2000.0), 1010.0);
        assert_eq!(m.to_pixel(5000.0), 1010.0);
        assert_eq!(m.to_pixel(0.0), 10.0);
        assert!((m.to_genomic(510.0) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_axis_is_inverted() {
        let gaps = GapIndex::default();
        let expanded = HashSet::new();
        let m = CoordinateMapper::new(GenomicWindow::new(0, 100), 120.0, 10.0, Axis::Vertical, &gaps, &expanded);
        assert_eq!(m.to_pixel(0.0), 110.0);
        assert_eq!(m.to_pixel(100.0), 10.0);
        assert!((m.to_genomic(m.to_pixel(37.0)) - 37.0).abs() < 1e-9);
    }

    #[test]
    fn expanded_insertion_shifts_downstream_bases() {
        let gaps = single_insertion();
        let collapsed = HashSet::new();
        let expanded: HashSet<VariantId> = [VariantId(1)].into_iter().collect();
        let window = GenomicWindow::new(1000, 1900);

        let before = CoordinateMapper::new(window, 1000.0, 0.0, Axis::Horizontal, &gaps, &collapsed);
        let after = CoordinateMapper::new(window, 1000.0, 0.0, Axis::Horizontal, &gaps, &expanded);

        let ppb = after.pixels_per_bp();
        assert!((after.effective_span() - 933.0).abs() < 1e-12);

        let p = 1310.0;
        let naive = (p - 1000.0) * ppb;
        let shift = after.to_pixel(p) - naive;
        assert!((shift - 33.0 * ppb).abs() < 1e-9, "shift was {}", shift);

        // Bases upstream of the insertion only rescale.
        let upstream = after.to_pixel(1200.0) / before.to_pixel(1200.0);
        assert!((upstream - 900.0 / 933.0).abs() < 1e-9);

        let width = after.gap_pixel_width(gaps.get(VariantId(1)).unwrap());
        assert!((width - 33.0 * ppb).abs() < 1e-12);
    }

    #[test]
    fn inverse_lands_on_gap_edge_inside_band() {
        let gaps = single_insertion();
        let expanded: HashSet<VariantId> = [VariantId(1)].into_iter().collect();
        let m = CoordinateMapper::new(GenomicWindow::new(1000, 1900), 933.0, 0.0, Axis::Horizontal, &gaps, &expanded);
        // Pixels 300..333 are the gap band; all of them resolve to its position.
        for pixel in [300.5, 310.0, 332.0] {
            let g = m.to_genomic(pixel);
            assert!((g - 1300.0).abs() < 1e-6, "pixel {} -> {}", pixel, g);
        }
        assert!((m.to_genomic(343.0) - 1310.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_inputs_return_padding_edge() {
        let gaps = GapIndex::default();
        let expanded = HashSet::new();
        let window = GenomicWindow::new(0, 100);

        let m = CoordinateMapper::new(window, f64::NAN, 5.0, Axis::Horizontal, &gaps, &expanded);
        assert_eq!(m.to_pixel(50.0), 5.0);
        assert_eq!(m.to_genomic(50.0), 0.0);

        let m = CoordinateMapper::new(window, 8.0, 5.0, Axis::Horizontal, &gaps, &expanded);
        assert!(!m.is_valid());
        assert_eq!(m.to_pixel(50.0), 5.0);

        let m = CoordinateMapper::new(window, 200.0, 5.0, Axis::Horizontal, &gaps, &expanded);
        assert_eq!(m.to_pixel(f64::NAN), 5.0);
        assert_eq!(m.to_genomic(f64::INFINITY), 0.0);

        let empty = GenomicWindow::new(10, 10);
        let m = CoordinateMapper::new(empty, 200.0, 5.0, Axis::Horizontal, &gaps, &expanded);
        assert_eq!(m.to_pixel(10.0), 5.0);
        assert_eq!(m.pixels_per_bp(), 0.0);
    }

    #[test]
    fn equal_spacing_centres() {
        let gaps = GapIndex::default();
        let expanded = HashSet::new();
        let m = CoordinateMapper::new(GenomicWindow::new(0, 1000), 400.0, 0.0, Axis::Horizontal, &gaps, &expanded);
        let centres = m.column_centers(&[10, 11, 900, 901], VariantOrdering::EqualSpacing);
        assert_eq!(centres, vec![50.0, 150.0, 250.0, 350.0]);

        let genomic = m.column_centers(&[500], VariantOrdering::Genomic);
        assert_eq!(genomic, vec![200.0]);
    }

    #[test]
    fn unclamped_map_puts_outside_positions_off_screen() {
        let gaps = single_insertion();
        let expanded: HashSet<VariantId> = [VariantId(1)].into_iter().collect();
        let m = CoordinateMapper::new(GenomicWindow::new(1000, 1900), 943.0, 5.0, Axis::Horizontal, &gaps, &expanded);

        assert_eq!(m.to_pixel_unclamped(1310.0), m.to_pixel(1310.0));
        assert!((m.to_pixel_unclamped(900.0) - (5.0 - 100.0)).abs() < 1e-9);
        // Past the end the whole expanded gap is already behind us.
        assert!((m.to_pixel_unclamped(2000.0) - (5.0 + 1033.0)).abs() < 1e-9);
        assert_eq!(m.to_pixel(2000.0), 938.0);

        let vertical = CoordinateMapper::new(GenomicWindow::new(0, 100), 120.0, 10.0, Axis::Vertical, &gaps, &expanded);
        assert_eq!(vertical.to_pixel_unclamped(150.0), 10.0 - 50.0);
    }
}
