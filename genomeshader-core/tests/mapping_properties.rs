use genomeshader_core::alleles::{layout_column, node_sizes, AlleleLayoutParams};
use genomeshader_core::geometry::Span;
use genomeshader_core::ribbons::{layout_ribbons, RibbonContext, RibbonStyle};
use genomeshader_core::{
    compute_transitions, AlleleRef, Axis, CoordinateMapper, GapEntry, GapIndex, GenomicWindow, Palette, Variant,
    VariantId,
};
use proptest::prelude::*;
use std::collections::HashSet;

const WINDOW: GenomicWindow = GenomicWindow { start: 10_000, end: 20_000 };

fn gap_entries() -> impl Strategy<Value = Vec<GapEntry>> {
    prop::collection::vec((9_000u64..21_000, 1u64..500), 0..40).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (position, gap_bp))| GapEntry {
                variant_id: VariantId(i as u64),
                position,
                gap_bp,
            })
            .collect()
    })
}

fn expanded_subset(entries: &[GapEntry], mask: &[bool]) -> HashSet<VariantId> {
    entries
        .iter()
        .zip(mask.iter().cycle())
        .filter(|(_, keep)| **keep)
        .map(|(e, _)| e.variant_id)
        .collect()
}

fn genotype() -> impl Strategy<Value = String> {
    (prop::sample::select(vec![".", "0", "1", "2", "3"]), prop::sample::select(vec![".", "0", "1", "2"]), any::<bool>())
        .prop_map(|(a, b, phased)| format!("{}{}{}", a, if phased { "|" } else { "/" }, b))
}

fn variant(id: u64, position: u64) -> impl Strategy<Value = Variant> {
    prop::collection::vec(genotype(), 0..12).prop_map(move |gts| {
        gts.into_iter()
            .enumerate()
            .fold(Variant::new(id, position, "A", &["G", "T"]), |v, (i, gt)| {
                v.with_genotype(&format!("s{}", i), &gt)
            })
    })
}

proptest! {
    #[test]
    fn binary_search_gap_sum_matches_linear_scan(
        entries in gap_entries(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        position in 8_000.0f64..22_000.0,
        view_start in 8_000.0f64..15_000.0,
    ) {
        let index = GapIndex::from_entries(entries.clone());
        let expanded = expanded_subset(&entries, &mask);
        prop_assert_eq!(
            index.gap_before(position, view_start, &expanded),
            index.gap_before_linear(position, view_start, &expanded)
        );
    }

    #[test]
    fn pixel_round_trip_recovers_position(
        entries in gap_entries(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        offset in 0.0f64..9_999.0,
        vertical in any::<bool>(),
    ) {
        let index = GapIndex::from_entries(entries.clone());
        let expanded = expanded_subset(&entries, &mask);
        let axis = if vertical { Axis::Vertical } else { Axis::Horizontal };
        let mapper = CoordinateMapper::new(WINDOW, 1200.0, 16.0, axis, &index, &expanded);

        let position = WINDOW.start as f64 + offset;
        let back = mapper.to_genomic(mapper.to_pixel(position));
        prop_assert!((back - position).abs() < 1e-6, "{} -> {}", position, back);
    }

    #[test]
    fn forward_mapping_is_monotone(
        entries in gap_entries(),
        a in 0.0f64..10_000.0,
        b in 0.0f64..10_000.0,
    ) {
        let index = GapIndex::from_entries(entries.clone());
        let expanded: HashSet<VariantId> = entries.iter().map(|e| e.variant_id).collect();
        let mapper = CoordinateMapper::new(WINDOW, 800.0, 0.0, Axis::Horizontal, &index, &expanded);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let start = WINDOW.start as f64;
        prop_assert!(mapper.to_pixel(start + lo) <= mapper.to_pixel(start + hi));
    }

    #[test]
    fn node_sizes_fill_available_space(
        weights in prop::collection::vec(0.0f64..1.0, 1..10),
        extent in 20.0f64..2_000.0,
    ) {
        let params = AlleleLayoutParams::default();
        let layout = node_sizes(&weights, extent, &params);
        let n = weights.len() as f64;
        if layout.overflow {
            prop_assert!(layout.sizes.iter().all(|s| *s == params.min_node_size));
        } else {
            let used: f64 = layout.sizes.iter().sum::<f64>() + (n - 1.0) * params.node_gap;
            prop_assert!((used - layout.available).abs() < 1e-6);
            prop_assert!(layout.sizes.iter().all(|s| *s >= params.min_node_size - 1e-9));
        }
    }

    #[test]
    fn matrices_balance_and_ribbons_tile_nodes(a in variant(1, 100), b in variant(2, 200)) {
        let t = compute_transitions(&a, &b);
        for m in [&t.observed, &t.phased] {
            let cells: u32 = m.iter().map(|(_, _, n)| n).sum();
            let src: u32 = m.src_keys().map(|k| m.src_total(k)).sum();
            let dst: u32 = m.dst_keys().map(|k| m.dst_total(k)).sum();
            prop_assert_eq!(cells, m.total());
            prop_assert_eq!(src, m.total());
            prop_assert_eq!(dst, m.total());
        }
        prop_assert!(t.phased.total() <= t.observed.total());

        let params = AlleleLayoutParams::default();
        let stack = Span::new(0.0, 400.0);
        let ca = layout_column(&a, 100.0, None, stack, &params);
        let cb = layout_column(&b, 500.0, None, stack, &params);
        let style = RibbonStyle::default();
        let palette = Palette::default();
        let selected: HashSet<AlleleRef> = HashSet::new();
        let ctx = RibbonContext {
            axis: Axis::Horizontal,
            style: &style,
            palette: &palette,
            selected: &selected,
            visible: Span::new(0.0, 600.0),
        };
        let ribbons = layout_ribbons(&t, &ca, &cb, &ctx);

        if !t.observed.is_empty() {
            prop_assert_eq!(ribbons.len(), t.phased.iter().count());
            for node in &ca.nodes {
                let covered: f64 = ribbons.iter().filter(|r| r.src_allele == node.allele).map(|r| r.src_slice.len()).sum();
                if t.phased.src_total(node.allele) > 0 {
                    prop_assert!((covered - node.span.len()).abs() < 1e-6);
                }
            }
            for node in &cb.nodes {
                let covered: f64 = ribbons.iter().filter(|r| r.dst_allele == node.allele).map(|r| r.dst_slice.len()).sum();
                if t.phased.dst_total(node.allele) > 0 {
                    prop_assert!((covered - node.span.len()).abs() < 1e-6);
                }
            }
            for r in &ribbons {
                prop_assert!(r.color.iter().all(|c| (0.0..=1.0).contains(c)));
            }
        }
    }
}
