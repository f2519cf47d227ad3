//! Alluvial ribbon layout between two adjacent variant columns.
//!
//! Each non-zero phased transition becomes one ribbon. Source nodes are cut
//! into slices proportional to their outgoing counts and destination nodes
//! into slices proportional to their incoming counts, so the slices tile the
//! nodes exactly.

use crate::alleles::VariantColumn;
use crate::axis::Axis;
use crate::geometry::{CubicBezier, Span};
use crate::palette::Palette;
use crate::transitions::PairTransitions;
use crate::types::{AlleleKey, AlleleRef, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RibbonStyle {
    pub min_opacity: f64,
    pub max_opacity: f64,
    /// Multiplier for ref→ref flows.
    pub reference_dim: f64,
    /// Multiplier for flows touching a selected allele.
    pub selection_boost: f64,
    /// Fraction of each slice's width removed toward its midpoint.
    pub taper: f64,
    pub curvature: f64,
    /// Upper bound on handle length relative to endpoint separation.
    pub max_handle_fraction: f64,
    pub fallback_width: f64,
    pub fallback_opacity: f64,
}

impl Default for RibbonStyle {
    fn default() -> Self {
        Self {
            min_opacity: 0.12,
            max_opacity: 0.85,
            reference_dim: 0.45,
            selection_boost: 1.75,
            taper: 0.06,
            curvature: 0.5,
            max_handle_fraction: 0.45,
            fallback_width: 1.5,
            fallback_opacity: 0.25,
        }
    }
}

impl RibbonStyle {
    /// `min + (max - min) * sqrt(count / total)`, before dimming and boosting.
    pub fn base_opacity(&self, count: u32, total: u32) -> f64 {
        if total == 0 {
            return self.min_opacity;
        }
        let share = (count as f64 / total as f64).clamp(0.0, 1.0);
        self.min_opacity + (self.max_opacity - self.min_opacity) * share.sqrt()
    }

    pub fn handle_fraction(&self) -> f64 {
        self.curvature.min(self.max_handle_fraction).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RibbonKind {
    Flow,
    /// Reference to reference; drawn first and dimmed.
    Background,
    /// No genotype data at all; thin link between node midpoints.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RibbonSegment {
    pub src: VariantId,
    pub src_allele: AlleleKey,
    pub dst: VariantId,
    pub dst_allele: AlleleKey,
    /// Untapered slice of the source node along the stack axis.
    pub src_slice: Span,
    pub dst_slice: Span,
    pub near: CubicBezier,
    pub far: CubicBezier,
    /// Premultiplied RGBA.
    pub color: [f32; 4],
    pub kind: RibbonKind,
    pub count: u32,
}

/// Per-frame inputs shared by every pair.
#[derive(Debug, Clone, Copy)]
pub struct RibbonContext<'a> {
    pub axis: Axis,
    pub style: &'a RibbonStyle,
    pub palette: &'a Palette,
    pub selected: &'a HashSet<AlleleRef>,
    /// Visible pixel range along the flow axis.
    pub visible: Span,
}

/// Both columns are entirely on the same side of the visible range.
fn culled(src: &VariantColumn, dst: &VariantColumn, visible: Span) -> bool {
    let (a, b) = (src.flow_span(), dst.flow_span());
    (a.end < visible.start && b.end < visible.start) || (a.start > visible.end && b.start > visible.end)
}

/// Free space between the facing edges of two columns along the flow axis.
fn facing_gap(src: &VariantColumn, dst: &VariantColumn) -> f64 {
    (dst.center - src.center).abs() - 0.5 * (src.thickness + dst.thickness)
}

pub fn layout_ribbons(
    transitions: &PairTransitions,
    src: &VariantColumn,
    dst: &VariantColumn,
    ctx: &RibbonContext<'_>,
) -> Vec<RibbonSegment> {
    if culled(src, dst, ctx.visible) {
        return Vec::new();
    }
    // Overlapping columns would give curves that start behind the far face.
    if facing_gap(src, dst) <= 0.0 {
        log::debug!(
            "pair {}→{}: columns overlap along the flow axis; no ribbons",
            src.variant_id,
            dst.variant_id
        );
        return Vec::new();
    }
    if transitions.observed.is_empty() {
        return fallback_ribbons(src, dst, ctx);
    }

    let matrix = &transitions.phased;
    if matrix.is_empty() {
        log::debug!(
            "pair {}→{}: {} observations, none phased; no ribbons",
            src.variant_id,
            dst.variant_id,
            transitions.observed.total()
        );
        return Vec::new();
    }

    let grand_total = matrix.total();
    let mut dst_offsets: HashMap<AlleleKey, f64> = dst.nodes.iter().map(|n| (n.allele, n.span.start)).collect();
    let mut ribbons = Vec::new();

    for src_node in &src.nodes {
        let src_total = matrix.src_total(src_node.allele);
        if src_total == 0 {
            continue;
        }
        let mut src_offset = src_node.span.start;

        for dst_node in &dst.nodes {
            let count = matrix.count(src_node.allele, dst_node.allele);
            if count == 0 {
                continue;
            }
            let dst_total = matrix.dst_total(dst_node.allele);

            let src_len = src_node.span.len() * count as f64 / src_total as f64;
            let dst_len = dst_node.span.len() * count as f64 / dst_total as f64;
            let src_slice = Span {
                start: src_offset,
                end: src_offset + src_len,
            };
            src_offset += src_len;

            let dst_start = dst_offsets.get(&dst_node.allele).copied().unwrap_or(dst_node.span.start);
            let dst_slice = Span {
                start: dst_start,
                end: dst_start + dst_len,
            };
            dst_offsets.insert(dst_node.allele, dst_start + dst_len);

            let kind = if src_node.allele.is_reference() && dst_node.allele.is_reference() {
                RibbonKind::Background
            } else {
                RibbonKind::Flow
            };

            let mut opacity = ctx.style.base_opacity(count, grand_total);
            if kind == RibbonKind::Background {
                opacity *= ctx.style.reference_dim;
            }
            let touches_selection = ctx.selected.contains(&AlleleRef::new(src.variant_id, src_node.allele))
                || ctx.selected.contains(&AlleleRef::new(dst.variant_id, dst_node.allele));
            if touches_selection {
                opacity *= ctx.style.selection_boost;
            }
            let opacity = opacity.clamp(0.0, 1.0) as f32;

            let (near, far) = boundary_curves(
                src,
                dst,
                src_slice.tapered(ctx.style.taper),
                dst_slice.tapered(ctx.style.taper),
                ctx,
            );

            ribbons.push(RibbonSegment {
                src: src.variant_id,
                src_allele: src_node.allele,
                dst: dst.variant_id,
                dst_allele: dst_node.allele,
                src_slice,
                dst_slice,
                near,
                far,
                color: ctx.palette.allele_color(src_node.allele).with_alpha(opacity).premultiplied(),
                kind,
                count,
            });
        }
    }

    // Stable: slicing order is kept within each group.
    ribbons.sort_by_key(|r| r.kind != RibbonKind::Background);
    ribbons
}

/// Thin links between every node pair, used when a pair has no genotype data.
pub fn fallback_ribbons(src: &VariantColumn, dst: &VariantColumn, ctx: &RibbonContext<'_>) -> Vec<RibbonSegment> {
    let half = ctx.style.fallback_width * 0.5;
    let color = ctx
        .palette
        .fallback
        .with_alpha(ctx.style.fallback_opacity.clamp(0.0, 1.0) as f32)
        .premultiplied();

    let mut ribbons = Vec::with_capacity(src.nodes.len() * dst.nodes.len());
    for src_node in &src.nodes {
        for dst_node in &dst.nodes {
            let src_slice = Span::new(src_node.span.mid() - half, src_node.span.mid() + half);
            let dst_slice = Span::new(dst_node.span.mid() - half, dst_node.span.mid() + half);
            let (near, far) = boundary_curves(src, dst, src_slice, dst_slice, ctx);
            ribbons.push(RibbonSegment {
                src: src.variant_id,
                src_allele: src_node.allele,
                dst: dst.variant_id,
                dst_allele: dst_node.allele,
                src_slice,
                dst_slice,
                near,
                far,
                color,
                kind: RibbonKind::Fallback,
                count: 0,
            });
        }
    }
    ribbons
}

/// Near and far boundary curves between the facing node edges.
///
/// Interior control points sit on flow-axis tangents, `handle` away from the
/// endpoints, with `handle = min(curvature, 0.45) * separation`.
fn boundary_curves(
    src: &VariantColumn,
    dst: &VariantColumn,
    src_slice: Span,
    dst_slice: Span,
    ctx: &RibbonContext<'_>,
) -> (CubicBezier, CubicBezier) {
    let direction = if dst.center >= src.center { 1.0 } else { -1.0 };
    let x0 = src.center + direction * src.thickness * 0.5;
    let x1 = dst.center - direction * dst.thickness * 0.5;
    let handle = (x1 - x0) * ctx.style.handle_fraction();

    let axis = ctx.axis;
    let curve = |s: f64, d: f64| CubicBezier {
        p0: axis.point(x0, s),
        p1: axis.point(x0 + handle, s),
        p2: axis.point(x1 - handle, d),
        p3: axis.point(x1, d),
    };
    (curve(src_slice.start, dst_slice.start), curve(src_slice.end, dst_slice.end))
}
