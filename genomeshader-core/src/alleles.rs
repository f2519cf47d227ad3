//! Allele node layout along the stack axis.
//!
//! Each variant column stacks one node per allele. Node sizes follow allele
//! frequency, floored at a minimum size, inside a margin-inset content box.

use crate::axis::Axis;
use crate::geometry::{Rect, Span};
use crate::types::{AlleleKey, GenomicPos, Variant, VariantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlleleLayoutParams {
    /// Margin on each end of the stack axis as a fraction of the extent.
    pub margin_fraction: f64,
    /// Lower bound on that margin, in pixels.
    pub min_margin: f64,
    /// Gap between neighbouring nodes.
    pub node_gap: f64,
    pub min_node_size: f64,
    /// Node width along the flow axis.
    pub node_thickness: f64,
}

impl Default for AlleleLayoutParams {
    fn default() -> Self {
        Self {
            margin_fraction: 0.10,
            min_margin: 10.0,
            node_gap: 4.0,
            min_node_size: 4.0,
            node_thickness: 10.0,
        }
    }
}

impl AlleleLayoutParams {
    pub fn margin(&self, extent: f64) -> f64 {
        (extent * self.margin_fraction).max(self.min_margin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeSpan {
    pub variant_id: VariantId,
    pub allele: AlleleKey,
    /// Interval along the stack axis.
    pub span: Span,
    pub frequency: f64,
}

/// One laid-out variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantColumn {
    pub variant_id: VariantId,
    pub position: GenomicPos,
    /// Centre along the flow axis.
    pub center: f64,
    pub thickness: f64,
    pub nodes: Vec<NodeSpan>,
}

impl VariantColumn {
    pub fn node(&self, allele: AlleleKey) -> Option<&NodeSpan> {
        self.nodes.iter().find(|n| n.allele == allele)
    }

    /// Extent of the column along the flow axis.
    pub fn flow_span(&self) -> Span {
        Span::new(self.center - self.thickness * 0.5, self.center + self.thickness * 0.5)
    }

    pub fn node_rect(&self, axis: Axis, node: &NodeSpan) -> Rect {
        axis.rect(self.flow_span(), node.span)
    }
}

/// Result of distributing sizes over one column.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSizes {
    pub sizes: Vec<f64>,
    pub margin: f64,
    /// Extent left after both margins.
    pub available: f64,
    /// Minimum sizes alone did not fit; every node got exactly the minimum.
    pub overflow: bool,
}

/// Display order for a variant: the user's order first, then any of the
/// variant's remaining keys in default order. Keys the variant does not
/// define are dropped.
pub fn display_order(variant: &Variant, user_order: Option<&[AlleleKey]>) -> Vec<AlleleKey> {
    let defined = variant.allele_keys();
    let mut order: Vec<AlleleKey> = Vec::with_capacity(defined.len());
    if let Some(user) = user_order {
        for key in user {
            if defined.contains(key) && !order.contains(key) {
                order.push(*key);
            }
        }
    }
    for key in defined {
        if !order.contains(&key) {
            order.push(key);
        }
    }
    order
}

/// Water-filling size distribution.
///
/// Reserves both margins and `(n - 1)` gaps, then shares the remainder in
/// proportion to `weights`. Nodes whose share falls under the minimum are
/// pinned to it and the rest is re-shared until no share is below the floor,
/// so sizes always sum to the remainder.
pub fn node_sizes(weights: &[f64], extent: f64, params: &AlleleLayoutParams) -> NodeSizes {
    let n = weights.len();
    let margin = params.margin(extent);
    let available = (extent - 2.0 * margin).max(0.0);
    let min = params.min_node_size.max(0.0);

    if n == 0 {
        return NodeSizes {
            sizes: Vec::new(),
            margin,
            available,
            overflow: false,
        };
    }

    let remainder = available - (n as f64 - 1.0) * params.node_gap;
    if remainder < n as f64 * min {
        return NodeSizes {
            sizes: vec![min; n],
            margin,
            available,
            overflow: true,
        };
    }

    let mut weights: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    if weights.iter().sum::<f64>() <= 0.0 {
        weights.iter_mut().for_each(|w| *w = 1.0);
    }

    let mut floored = vec![false; n];
    let mut sizes = vec![0.0; n];
    loop {
        let free_count = floored.iter().filter(|f| !**f).count();
        let free_space = remainder - (n - free_count) as f64 * min;
        let free_weight: f64 = weights
            .iter()
            .zip(&floored)
            .filter(|(_, f)| !**f)
            .map(|(w, _)| *w)
            .sum();

        let mut changed = false;
        for i in 0..n {
            if floored[i] {
                sizes[i] = min;
                continue;
            }
            let share = if free_weight > 0.0 {
                free_space * weights[i] / free_weight
            } else {
                free_space / free_count as f64
            };
            if share < min {
                floored[i] = true;
                changed = true;
            }
            sizes[i] = share;
        }
        if !changed {
            break;
        }
    }
    for (size, f) in sizes.iter_mut().zip(&floored) {
        if *f {
            *size = min;
        }
    }

    NodeSizes {
        sizes,
        margin,
        available,
        overflow: false,
    }
}

/// Lay out `order` inside `stack` for one variant.
pub fn layout_nodes(
    variant: &Variant,
    order: &[AlleleKey],
    stack: Span,
    params: &AlleleLayoutParams,
) -> Vec<NodeSpan> {
    let extent = stack.len();
    if !stack.is_finite() || extent <= 0.0 {
        log::warn!("variant {}: unusable stack extent {:?}, no nodes laid out", variant.id, stack);
        return Vec::new();
    }

    let freqs = variant.allele_frequencies();
    let weights: Vec<f64> = order.iter().map(|k| freqs.get(k).copied().unwrap_or(0.0)).collect();
    let layout = node_sizes(&weights, extent, params);

    let used: f64 = layout.sizes.iter().sum::<f64>() + (order.len() as f64 - 1.0).max(0.0) * params.node_gap;
    let mut cursor = stack.start + layout.margin + (layout.available - used) * 0.5;
    if layout.overflow {
        log::debug!(
            "variant {}: {} nodes overflow {:.1}px, using minimum size",
            variant.id,
            order.len(),
            layout.available
        );
    }

    order
        .iter()
        .zip(layout.sizes.iter())
        .zip(weights.iter())
        .map(|((allele, size), frequency)| {
            let span = Span {
                start: cursor,
                end: cursor + size,
            };
            cursor += size + params.node_gap;
            NodeSpan {
                variant_id: variant.id,
                allele: *allele,
                span,
                frequency: *frequency,
            }
        })
        .collect()
}

pub fn layout_column(
    variant: &Variant,
    center: f64,
    user_order: Option<&[AlleleKey]>,
    stack: Span,
    params: &AlleleLayoutParams,
) -> VariantColumn {
    let order = display_order(variant, user_order);
    VariantColumn {
        variant_id: variant.id,
        position: variant.position,
        center,
        thickness: params.node_thickness,
        nodes: layout_nodes(variant, &order, stack, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn params() -> AlleleLayoutParams {
        AlleleLayoutParams::default()
    }

    #[test]
    fn sizes_fill_available_space() {
        let p = params();
        let layout = node_sizes(&[0.5, 0.3, 0.2], 300.0, &p);
        assert!(!layout.overflow);
        assert_eq!(layout.margin, 30.0);
        assert_eq!(layout.available, 240.0);
        let total: f64 = layout.sizes.iter().sum::<f64>() + 2.0 * p.node_gap;
        assert!((total - 240.0).abs() < 1e-9);
        assert!((layout.sizes[0] / layout.sizes[1] - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_frequencies_are_floored() {
        let p = params();
        let layout = node_sizes(&[0.998, 0.001, 0.001], 300.0, &p);
        assert_eq!(layout.sizes[1], p.min_node_size);
        assert_eq!(layout.sizes[2], p.min_node_size);
        let total: f64 = layout.sizes.iter().sum::<f64>() + 2.0 * p.node_gap;
        assert!((total - layout.available).abs() < 1e-9);
    }

    #[test]
    fn overflow_gives_exact_minimum() {
        let p = params();
        let layout = node_sizes(&[1.0; 8], 40.0, &p);
        assert!(layout.overflow);
        assert!(layout.sizes.iter().all(|s| *s == p.min_node_size));
    }

    #[test]
    fn overflowing_nodes_are_centred() {
        let v = Variant::new(1, 10, "A", &["C", "G", "T", "AA", "AC", "AG"]);
        let order = display_order(&v, None);
        let stack = Span::new(0.0, 40.0);
        let nodes = layout_nodes(&v, &order, stack, &params());
        let first = nodes.first().unwrap().span.start;
        let last = nodes.last().unwrap().span.end;
        assert!(((first - stack.start) - (stack.end - last)).abs() < 1e-9);
        assert!(first < 10.0);
    }

    #[test]
    fn nodes_are_contiguous_with_gaps() {
        let v = Variant::new(1, 10, "A", &["G"])
            .with_genotype("a", "0|1")
            .with_genotype("b", "0|0");
        let p = params();
        let column = layout_column(&v, 100.0, None, Span::new(0.0, 200.0), &p);
        assert_eq!(column.nodes.len(), 2);
        let (a, b) = (&column.nodes[0], &column.nodes[1]);
        assert_eq!(a.allele, AlleleKey::Reference);
        assert!((a.span.start - 20.0).abs() < 1e-9);
        assert!((b.span.start - a.span.end - p.node_gap).abs() < 1e-9);
        assert!((b.span.end - 180.0).abs() < 1e-9);
        assert!((a.span.len() / b.span.len() - 3.0).abs() < 1e-9);
        assert_eq!(column.flow_span(), Span::new(95.0, 105.0));
    }

    #[test]
    fn display_order_merges_user_preference() {
        let mut v = Variant::new(1, 10, "A", &["G", "T"]);
        let mut freqs = BTreeMap::new();
        freqs.insert(AlleleKey::Reference, 0.5);
        freqs.insert(AlleleKey::NoCall, 0.1);
        v.allele_frequencies = Some(freqs);

        assert_eq!(
            display_order(&v, None),
            vec![AlleleKey::Reference, AlleleKey::Alt(0), AlleleKey::Alt(1), AlleleKey::NoCall]
        );

        let user = [AlleleKey::Alt(1), AlleleKey::Alt(5), AlleleKey::Reference];
        assert_eq!(
            display_order(&v, Some(&user)),
            vec![AlleleKey::Alt(1), AlleleKey::Reference, AlleleKey::Alt(0), AlleleKey::NoCall]
        );
    }

    #[test]
    fn degenerate_extent_yields_no_nodes() {
        let v = Variant::new(1, 10, "A", &["G"]);
        let order = display_order(&v, None);
        assert!(layout_nodes(&v, &order, Span::new(0.0, 0.0), &params()).is_empty());
        let nan = Span { start: f64::NAN, end: 10.0 };
        assert!(layout_nodes(&v, &order, nan, &params()).is_empty());
    }
}
