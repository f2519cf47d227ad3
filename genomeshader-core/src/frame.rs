//! Mutable browser state and the immutable per-frame snapshot taken from it.

use crate::axis::Axis;
use crate::config::RenderConfig;
use crate::coords::VariantOrdering;
use crate::geometry::Size;
use crate::types::{AlleleKey, AlleleRef, GenomicWindow, VariantId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Smallest window span zooming may reach.
pub const MIN_WINDOW_SPAN: f64 = 10.0;

/// Everything a redraw pass reads. Built once per frame and never mutated,
/// so every compute stage in the pass sees the same state.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub window: GenomicWindow,
    pub size: Size,
    pub axis: Axis,
    pub ordering: VariantOrdering,
    pub expanded: HashSet<VariantId>,
    pub selected: HashSet<AlleleRef>,
    pub allele_orders: HashMap<VariantId, Vec<AlleleKey>>,
    pub config: Arc<RenderConfig>,
}

impl FrameContext {
    pub fn new(window: GenomicWindow, size: Size, config: Arc<RenderConfig>) -> Self {
        Self {
            window,
            size,
            axis: Axis::default(),
            ordering: VariantOrdering::default(),
            expanded: HashSet::new(),
            selected: HashSet::new(),
            allele_orders: HashMap::new(),
            config,
        }
    }

    pub fn flow_extent(&self) -> f64 {
        self.axis.flow_extent(self.size)
    }

    pub fn stack_extent(&self) -> f64 {
        self.axis.stack_extent(self.size)
    }

    pub fn allele_order(&self, id: VariantId) -> Option<&[AlleleKey]> {
        self.allele_orders.get(&id).map(Vec::as_slice)
    }
}

/// UI state owned by the render loop.
///
/// The effective window is the base window panned by `pan_bp` and divided by
/// `zoom` around its centre.
#[derive(Debug, Clone)]
pub struct BrowserState {
    pub base_window: GenomicWindow,
    pub pan_bp: f64,
    pub zoom: f64,
    pub size: Size,
    pub axis: Axis,
    pub ordering: VariantOrdering,
    pub expanded: HashSet<VariantId>,
    pub selected: HashSet<AlleleRef>,
    pub allele_orders: HashMap<VariantId, Vec<AlleleKey>>,
}

impl BrowserState {
    pub fn new(window: GenomicWindow, size: Size) -> Self {
        Self {
            base_window: window,
            pan_bp: 0.0,
            zoom: 1.0,
            size,
            axis: Axis::default(),
            ordering: VariantOrdering::default(),
            expanded: HashSet::new(),
            selected: HashSet::new(),
            allele_orders: HashMap::new(),
        }
    }

    pub fn window(&self) -> GenomicWindow {
        let span = (self.base_window.span() as f64 / self.zoom).max(MIN_WINDOW_SPAN);
        GenomicWindow::centered(self.base_window.center() + self.pan_bp, span)
    }

    pub fn pan(&mut self, delta_bp: f64) {
        if delta_bp.is_finite() {
            self.pan_bp += delta_bp;
        } else {
            log::warn!("ignoring non-finite pan of {} bp", delta_bp);
        }
    }

    pub fn zoom_by(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            let max_zoom = self.base_window.span() as f64 / MIN_WINDOW_SPAN;
            self.zoom = (self.zoom * factor).min(max_zoom.max(1.0));
        } else {
            log::warn!("ignoring zoom factor {}", factor);
        }
    }

    /// Jump to a new window, resetting pan and zoom.
    pub fn set_window(&mut self, window: GenomicWindow) {
        self.base_window = window;
        self.pan_bp = 0.0;
        self.zoom = 1.0;
    }

    /// Returns true when the insertion is now expanded.
    pub fn toggle_insertion(&mut self, id: VariantId) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    /// Returns true when the allele is now selected.
    pub fn toggle_allele(&mut self, allele: AlleleRef) -> bool {
        if self.selected.remove(&allele) {
            false
        } else {
            self.selected.insert(allele);
            true
        }
    }

    pub fn snapshot(&self, config: Arc<RenderConfig>) -> FrameContext {
        FrameContext {
            window: self.window(),
            size: self.size,
            axis: self.axis,
            ordering: self.ordering,
            expanded: self.expanded.clone(),
            selected: self.selected.clone(),
            allele_orders: self.allele_orders.clone(),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_and_zoom_move_the_window() {
        let mut state = BrowserState::new(GenomicWindow::new(1000, 2000), Size::new(800.0, 200.0));
        state.pan(250.0);
        assert_eq!(state.window(), GenomicWindow::new(1250, 2250));
        state.zoom_by(2.0);
        assert_eq!(state.window(), GenomicWindow::new(1500, 2000));
        state.zoom_by(f64::NAN);
        assert_eq!(state.zoom, 2.0);
    }

    #[test]
    fn zoom_stops_at_minimum_span() {
        let mut state = BrowserState::new(GenomicWindow::new(0, 1000), Size::new(800.0, 200.0));
        state.zoom_by(1e9);
        assert_eq!(state.window().span(), MIN_WINDOW_SPAN as u64);
    }

    #[test]
    fn toggles_flip_membership() {
        let mut state = BrowserState::new(GenomicWindow::new(0, 1000), Size::new(800.0, 200.0));
        assert!(state.toggle_insertion(VariantId(3)));
        assert!(!state.toggle_insertion(VariantId(3)));
        let allele = AlleleRef::new(VariantId(3), AlleleKey::Alt(0));
        assert!(state.toggle_allele(allele));
        let ctx = state.snapshot(Arc::new(RenderConfig::default()));
        assert!(ctx.selected.contains(&allele));
        assert!(ctx.expanded.is_empty());
    }
}
