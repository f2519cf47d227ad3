//! Turns a computed [`Frame`] into primitive instances.

use crate::batch::{BatchRenderer, LineInstance, RectInstance, TriangleInstance};
use crate::rasterizer::RibbonRasterizer;
use genomeshader_core::geometry::{Rect, Span};
use genomeshader_core::{Axis, Frame, Palette};

const GAP_BAND_ALPHA: f32 = 0.55;
const SELECTION_WIDTH: f32 = 2.0;
const MARKER_SIZE: f64 = 6.0;

/// Instances pushed for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub gap_bands: usize,
    pub ribbons: usize,
    pub rejected_ribbons: usize,
    pub nodes: usize,
    pub selected: usize,
}

/// Push everything in `frame` onto `batch`: gap bands, ribbons, allele nodes,
/// then selection outlines and markers.
pub fn submit_frame(
    frame: &Frame,
    batch: &mut BatchRenderer,
    rasterizer: &RibbonRasterizer,
    palette: &Palette,
) -> SceneStats {
    let mut stats = SceneStats::default();
    let stack = Span::new(0.0, frame.axis.stack_extent(frame.size));

    let band_color = palette.gap_band.with_alpha(GAP_BAND_ALPHA).premultiplied();
    for band in &frame.gap_bands {
        batch.push_rect(rect_instance(&frame.axis.rect(band.span, stack), band_color));
        stats.gap_bands += 1;
    }

    for segment in &frame.ribbons {
        match rasterizer.instance_from_segment(segment) {
            Some(instance) => {
                batch.push_ribbon(instance);
                stats.ribbons += 1;
            }
            None => stats.rejected_ribbons += 1,
        }
    }

    let outline = palette.selection.premultiplied();
    for node in &frame.node_boxes {
        let fill = palette.allele_color(node.allele.allele).premultiplied();
        batch.push_rect(rect_instance(&node.rect, fill));
        stats.nodes += 1;

        if node.selected {
            for line in outline_lines(&node.rect, outline) {
                batch.push_line(line);
            }
            batch.push_triangle(marker(frame.axis, &node.rect, outline));
            stats.selected += 1;
        }
    }

    if stats.rejected_ribbons > 0 {
        log::debug!("{} ribbons rejected during tessellation", stats.rejected_ribbons);
    }
    stats
}

fn rect_instance(rect: &Rect, color: [f32; 4]) -> RectInstance {
    RectInstance {
        origin: [rect.x as f32, rect.y as f32],
        size: [rect.width as f32, rect.height as f32],
        color,
    }
}

fn outline_lines(rect: &Rect, color: [f32; 4]) -> [LineInstance; 4] {
    let (x0, y0) = (rect.x as f32, rect.y as f32);
    let (x1, y1) = ((rect.x + rect.width) as f32, (rect.y + rect.height) as f32);
    let line = |from: [f32; 2], to: [f32; 2]| LineInstance {
        from,
        to,
        color,
        width: SELECTION_WIDTH,
        _padding: [0.0; 3],
    };
    [
        line([x0, y0], [x1, y0]),
        line([x1, y0], [x1, y1]),
        line([x1, y1], [x0, y1]),
        line([x0, y1], [x0, y0]),
    ]
}

/// Small arrow just before the node on the flow axis, pointing at it.
fn marker(axis: Axis, rect: &Rect, color: [f32; 4]) -> TriangleInstance {
    let (flow, stack) = match axis {
        Axis::Horizontal => (Span::new(rect.x, rect.x + rect.width), Span::new(rect.y, rect.y + rect.height)),
        Axis::Vertical => (Span::new(rect.y, rect.y + rect.height), Span::new(rect.x, rect.x + rect.width)),
    };
    let tip = flow.start - 1.0;
    let base = tip - MARKER_SIZE;
    let mid = stack.mid();
    let half = MARKER_SIZE * 0.5;
    TriangleInstance {
        a: axis.point(tip, mid).to_f32(),
        b: axis.point(base, mid - half).to_f32(),
        c: axis.point(base, mid + half).to_f32(),
        _padding: [0.0; 2],
        color,
    }
}
