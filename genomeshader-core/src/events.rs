//! Event queue between producers (input handlers, data loaders) and the
//! render loop. The loop drains the queue once per frame.

use crate::axis::Axis;
use crate::coords::VariantOrdering;
use crate::geometry::Size;
use crate::types::{AlleleKey, AlleleRef, GenomicWindow, InsertionRecord, Variant, VariantId};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone)]
pub enum BrowserEvent {
    Pan { delta_bp: f64 },
    Zoom { factor: f64 },
    SetWindow(GenomicWindow),
    Resize(Size),
    SetAxis(Axis),
    SetOrdering(VariantOrdering),
    ToggleInsertion(VariantId),
    ToggleAllele(AlleleRef),
    SetAlleleOrder { variant: VariantId, order: Vec<AlleleKey> },
    /// A fetch finished; replaces the loaded track.
    VariantsLoaded {
        variants: Vec<Variant>,
        insertions: Option<Vec<InsertionRecord>>,
    },
}

/// Cloneable handle for posting events from other threads.
#[derive(Debug, Clone)]
pub struct EventSender(Sender<BrowserEvent>);

impl EventSender {
    /// Returns false once the render loop is gone.
    pub fn send(&self, event: BrowserEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<BrowserEvent>,
    rx: Receiver<BrowserEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender(self.tx.clone())
    }

    pub fn push(&self, event: BrowserEvent) {
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.tx.send(event);
    }

    /// Everything posted so far, in arrival order.
    pub fn drain(&self) -> Vec<BrowserEvent> {
        self.rx.try_iter().collect()
    }
}
