//! Per-frame redraw: viewport → coordinate mapping → allele layout →
//! transitions → ribbons.

use crate::alleles::{layout_column, VariantColumn};
use crate::axis::Axis;
use crate::config::RenderConfig;
use crate::coords::{CoordinateMapper, VariantOrdering};
use crate::events::{BrowserEvent, EventQueue, EventSender};
use crate::frame::{BrowserState, FrameContext};
use crate::gaps::GapIndex;
use crate::geometry::{Rect, Size, Span};
use crate::ribbons::{layout_ribbons, RibbonContext, RibbonSegment};
use crate::transitions::TransitionCache;
use crate::types::{AlleleKey, AlleleRef, GenomicWindow, InsertionRecord, Variant, VariantId};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

/// Variants of one track, sorted by position, with their gap index.
#[derive(Debug, Clone, Default)]
pub struct VariantTrack {
    variants: Vec<Variant>,
    by_id: HashMap<VariantId, usize>,
    gaps: GapIndex,
}

impl VariantTrack {
    /// Sorts by `(position, id)`. Later duplicates of an id are dropped.
    pub fn new(mut variants: Vec<Variant>, insertions: Option<&[InsertionRecord]>, expansion_factor: f64) -> Self {
        variants.sort_by_key(|v| (v.position, v.id));
        let mut by_id = HashMap::with_capacity(variants.len());
        let mut unique = Vec::with_capacity(variants.len());
        for v in variants {
            if by_id.contains_key(&v.id) {
                log::warn!("dropping duplicate variant id {}", v.id);
                continue;
            }
            by_id.insert(v.id, unique.len());
            unique.push(v);
        }

        let gaps = match insertions {
            Some(table) => GapIndex::from_insertion_table(table, expansion_factor),
            None => GapIndex::from_variants(&unique, expansion_factor),
        };
        log::info!("loaded {} variants, {} insertion gaps", unique.len(), gaps.len());

        Self {
            variants: unique,
            by_id,
            gaps,
        }
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn get(&self, id: VariantId) -> Option<&Variant> {
        self.by_id.get(&id).map(|i| &self.variants[*i])
    }

    pub fn gaps(&self) -> &GapIndex {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Indices of variants inside the window.
    pub fn visible_range(&self, window: &GenomicWindow) -> Range<usize> {
        let lo = self.variants.partition_point(|v| v.position < window.start);
        let hi = self.variants.partition_point(|v| v.position < window.end);
        lo..hi.max(lo)
    }

    /// Visible variants plus one neighbour on each side, so ribbons leaving
    /// the view are still drawn.
    pub fn drawn_range(&self, window: &GenomicWindow) -> Range<usize> {
        let visible = self.visible_range(window);
        visible.start.saturating_sub(1)..(visible.end + 1).min(self.variants.len())
    }
}

/// Expanded insertion band along the flow axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapBand {
    pub variant_id: VariantId,
    pub span: Span,
}

/// On-screen bounding box of one allele node, for hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeBox {
    pub allele: AlleleRef,
    pub rect: Rect,
    pub selected: bool,
}

/// Output of one redraw pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub window: GenomicWindow,
    pub size: Size,
    pub axis: Axis,
    pub pixels_per_bp: f64,
    pub columns: Vec<VariantColumn>,
    pub ribbons: Vec<RibbonSegment>,
    pub gap_bands: Vec<GapBand>,
    pub node_boxes: Vec<NodeBox>,
}

impl Frame {
    fn empty(ctx: &FrameContext) -> Self {
        Self {
            window: ctx.window,
            size: ctx.size,
            axis: ctx.axis,
            pixels_per_bp: 0.0,
            columns: Vec::new(),
            ribbons: Vec::new(),
            gap_bands: Vec::new(),
            node_boxes: Vec::new(),
        }
    }

    /// Node under a pixel, if any.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<AlleleRef> {
        let p = crate::geometry::Point::new(x, y);
        self.node_boxes.iter().find(|b| b.rect.contains(p)).map(|b| b.allele)
    }
}

/// Run one full recompute for `ctx`.
///
/// The cache is the only state written; it memoises transitions and is
/// re-centred on the window before use.
pub fn compute_frame(ctx: &FrameContext, track: &VariantTrack, cache: &mut TransitionCache) -> Frame {
    if !ctx.size.is_ready() {
        log::warn!("track size {:?} is not usable; drawing nothing", ctx.size);
        return Frame::empty(ctx);
    }
    let config = &ctx.config;

    let mapper = CoordinateMapper::new(
        ctx.window,
        ctx.flow_extent(),
        config.track.padding,
        ctx.axis,
        track.gaps(),
        &ctx.expanded,
    );
    cache.retain_window(ctx.window);

    let range = match ctx.ordering {
        VariantOrdering::Genomic => track.drawn_range(&ctx.window),
        VariantOrdering::EqualSpacing => track.visible_range(&ctx.window),
    };
    let variants = &track.variants()[range];
    let positions: Vec<u64> = variants.iter().map(|v| v.position).collect();
    let centers = mapper.column_centers(&positions, ctx.ordering);

    let stack = Span::new(0.0, ctx.stack_extent());
    let columns: Vec<VariantColumn> = variants
        .iter()
        .zip(centers)
        .map(|(v, center)| layout_column(v, center, ctx.allele_order(v.id), stack, &config.layout))
        .collect();

    let ribbon_ctx = RibbonContext {
        axis: ctx.axis,
        style: &config.ribbons,
        palette: &config.palette,
        selected: &ctx.selected,
        visible: Span::new(0.0, ctx.flow_extent()),
    };
    let mut ribbons = Vec::new();
    for (pair, cols) in variants.windows(2).zip(columns.windows(2)) {
        let transitions = cache.transitions(&pair[0], &pair[1]);
        ribbons.extend(layout_ribbons(&transitions, &cols[0], &cols[1], &ribbon_ctx));
    }

    let gap_bands: Vec<GapBand> = if ctx.ordering == VariantOrdering::Genomic {
        let sign = if ctx.axis.is_inverted() { -1.0 } else { 1.0 };
        track
            .gaps()
            .expanded_in(&ctx.window, &ctx.expanded)
            .map(|entry| {
                let edge = mapper.to_pixel(entry.position as f64);
                GapBand {
                    variant_id: entry.variant_id,
                    span: Span::new(edge, edge + sign * mapper.gap_pixel_width(entry)),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let visible = Span::new(0.0, ctx.flow_extent());
    let node_boxes: Vec<NodeBox> = columns
        .iter()
        .filter(|column| column.flow_span().overlaps(&visible))
        .flat_map(|column| {
            column.nodes.iter().map(move |node| {
                let allele = AlleleRef::new(column.variant_id, node.allele);
                NodeBox {
                    allele,
                    rect: column.node_rect(ctx.axis, node),
                    selected: ctx.selected.contains(&allele),
                }
            })
        })
        .collect();

    log::debug!(
        "frame {}: {} columns, {} ribbons, {} gap bands",
        ctx.window,
        columns.len(),
        ribbons.len(),
        gap_bands.len()
    );

    Frame {
        window: ctx.window,
        size: ctx.size,
        axis: ctx.axis,
        pixels_per_bp: mapper.pixels_per_bp(),
        columns,
        ribbons,
        gap_bands,
        node_boxes,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedrawOutcome {
    Drawn(Frame),
    /// The track has no usable size yet; try again after `retry_after`.
    Deferred { attempt: u32, retry_after: Duration },
    /// Gave up after the configured number of retries.
    Skipped,
}

/// Owns the browser state, the loaded track and the transition cache, and
/// turns queued events into frames.
#[derive(Debug)]
pub struct Browser {
    state: BrowserState,
    track: VariantTrack,
    cache: TransitionCache,
    queue: EventQueue,
    config: Arc<RenderConfig>,
    dirty: bool,
    deferred_attempts: u32,
}

impl Browser {
    pub fn new(config: RenderConfig, window: GenomicWindow, size: Size) -> Self {
        let cache = TransitionCache::new(config.cache.capacity, config.cache.retention_padding);
        Self {
            state: BrowserState::new(window, size),
            track: VariantTrack::default(),
            cache,
            queue: EventQueue::new(),
            config: Arc::new(config),
            dirty: true,
            deferred_attempts: 0,
        }
    }

    pub fn with_variants(mut self, variants: Vec<Variant>, insertions: Option<&[InsertionRecord]>) -> Self {
        self.load(variants, insertions);
        self
    }

    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    pub fn post(&self, event: BrowserEvent) {
        self.queue.push(event);
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BrowserState {
        self.dirty = true;
        &mut self.state
    }

    pub fn track(&self) -> &VariantTrack {
        &self.track
    }

    pub fn cache(&self) -> &TransitionCache {
        &self.cache
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    fn load(&mut self, variants: Vec<Variant>, insertions: Option<&[InsertionRecord]>) {
        self.track = VariantTrack::new(variants, insertions, self.config.gaps.expansion_factor);
        self.cache.clear();
        self.dirty = true;
    }

    /// Apply every queued event. Returns how many were applied.
    pub fn pump_events(&mut self) -> usize {
        let events = self.queue.drain();
        let n = events.len();
        for event in events {
            self.apply(event);
        }
        n
    }

    pub fn apply(&mut self, event: BrowserEvent) {
        match event {
            BrowserEvent::Pan { delta_bp } => self.state.pan(delta_bp),
            BrowserEvent::Zoom { factor } => self.state.zoom_by(factor),
            BrowserEvent::SetWindow(window) => self.state.set_window(window),
            BrowserEvent::Resize(size) => self.state.size = size,
            BrowserEvent::SetAxis(axis) => self.state.axis = axis,
            BrowserEvent::SetOrdering(ordering) => self.state.ordering = ordering,
            BrowserEvent::ToggleInsertion(id) => {
                let expanded = self.state.toggle_insertion(id);
                log::debug!("insertion {} {}", id, if expanded { "expanded" } else { "collapsed" });
            }
            BrowserEvent::ToggleAllele(allele) => {
                self.state.toggle_allele(allele);
            }
            BrowserEvent::SetAlleleOrder { variant, order } => {
                self.state.allele_orders.insert(variant, order);
            }
            BrowserEvent::VariantsLoaded { variants, insertions } => {
                self.load(variants, insertions.as_deref());
            }
        }
        self.dirty = true;
    }

    /// Drain events and redraw once.
    pub fn redraw(&mut self) -> RedrawOutcome {
        self.pump_events();

        if !self.state.size.is_ready() {
            self.deferred_attempts += 1;
            if self.deferred_attempts <= self.config.redraw.max_retries {
                log::debug!(
                    "track not sized yet; deferring redraw (attempt {})",
                    self.deferred_attempts
                );
                return RedrawOutcome::Deferred {
                    attempt: self.deferred_attempts,
                    retry_after: self.config.redraw.retry_delay(),
                };
            }
            log::warn!(
                "track still has no size after {} attempts; skipping redraw",
                self.config.redraw.max_retries
            );
            self.deferred_attempts = 0;
            return RedrawOutcome::Skipped;
        }

        self.deferred_attempts = 0;
        let ctx = self.state.snapshot(Arc::clone(&self.config));
        let frame = compute_frame(&ctx, &self.track, &mut self.cache);
        self.dirty = false;
        RedrawOutcome::Drawn(frame)
    }

    /// Redraw only if something changed since the last drawn frame.
    pub fn redraw_if_needed(&mut self) -> Option<RedrawOutcome> {
        self.pump_events();
        if self.dirty {
            Some(self.redraw())
        } else {
            None
        }
    }

    /// Allele keys currently shown for a variant, in display order.
    pub fn displayed_alleles(&self, id: VariantId) -> Vec<AlleleKey> {
        self.track
            .get(id)
            .map(|v| crate::alleles::display_order(v, self.state.allele_orders.get(&id).map(Vec::as_slice)))
            .unwrap_or_default()
    }
}
