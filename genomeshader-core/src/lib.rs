//! GenomeShader Core Library
//!
//! Coordinate mapping with expandable insertion gaps, allele node layout,
//! haplotype transition counting and alluvial ribbon geometry for the
//! GenomeShader flow track. Nothing in here touches the GPU; the output of a
//! redraw is a [`pipeline::Frame`] that a renderer turns into draw calls.

pub mod types;
pub mod error;
pub mod geometry;
pub mod axis;
pub mod gaps;
pub mod coords;
pub mod alleles;
pub mod transitions;
pub mod palette;
pub mod ribbons;
pub mod config;
pub mod frame;
pub mod events;
pub mod pipeline;
pub mod io;

// Re-export commonly used types and functions
pub use types::{AlleleKey, AlleleRef, GenomicPos, GenomicWindow, Genotype, InsertionRecord, Variant, VariantId};
pub use error::{GenomeShaderError, Result};
pub use axis::Axis;
pub use gaps::{GapEntry, GapIndex};
pub use coords::{CoordinateMapper, VariantOrdering};
pub use alleles::{AlleleLayoutParams, NodeSpan, VariantColumn};
pub use transitions::{compute_transitions, PairTransitions, TransitionCache, TransitionMatrix};
pub use ribbons::{RibbonKind, RibbonSegment, RibbonStyle};
pub use palette::{Color, Palette};
pub use config::RenderConfig;
pub use frame::{BrowserState, FrameContext};
pub use events::{BrowserEvent, EventQueue, EventSender};
pub use pipeline::{compute_frame, Browser, Frame, RedrawOutcome, VariantTrack};

/// Version information for the GenomeShader core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
