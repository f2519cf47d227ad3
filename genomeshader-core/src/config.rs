//! Rendering configuration. Every field has a default, so partial config
//! files are fine.

use crate::alleles::AlleleLayoutParams;
use crate::error::{GenomeShaderError, Result};
use crate::gaps::DEFAULT_EXPANSION_FACTOR;
use crate::palette::Palette;
use crate::ribbons::RibbonStyle;
use crate::transitions::{DEFAULT_CACHE_CAPACITY, DEFAULT_RETENTION_PADDING};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TESSELLATION_SEGMENTS: u32 = 40;
pub const MIN_TESSELLATION_SEGMENTS: u32 = 8;
pub const MAX_TESSELLATION_SEGMENTS: u32 = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RenderConfig {
    pub track: TrackConfig,
    pub layout: AlleleLayoutParams,
    pub ribbons: RibbonStyle,
    pub gaps: GapConfig,
    pub cache: CacheConfig,
    pub tessellation: TessellationConfig,
    pub redraw: RedrawConfig,
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Edge padding along the flow axis, in pixels.
    pub padding: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self { padding: 12.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    pub expansion_factor: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            expansion_factor: DEFAULT_EXPANSION_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    /// Retention window padding as a fraction of the view span, per side.
    pub retention_padding: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            retention_padding: DEFAULT_RETENTION_PADDING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    pub segments: u32,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            segments: DEFAULT_TESSELLATION_SEGMENTS,
        }
    }
}

impl TessellationConfig {
    pub fn clamped_segments(&self) -> u32 {
        self.segments.clamp(MIN_TESSELLATION_SEGMENTS, MAX_TESSELLATION_SEGMENTS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedrawConfig {
    /// Attempts while the track has no usable size before giving up.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RedrawConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 16,
        }
    }
}

impl RedrawConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl RenderConfig {
    /// Reject values that would make every frame degenerate.
    pub fn validate(&self) -> Result<()> {
        let r = &self.ribbons;
        if !(0.0..=1.0).contains(&r.min_opacity) || !(0.0..=1.0).contains(&r.max_opacity) {
            return Err(GenomeShaderError::config("ribbon opacities must be within [0, 1]"));
        }
        if r.min_opacity > r.max_opacity {
            return Err(GenomeShaderError::config("ribbons.min_opacity exceeds ribbons.max_opacity"));
        }
        if !(0.0..1.0).contains(&r.taper) {
            return Err(GenomeShaderError::config("ribbons.taper must be within [0, 1)"));
        }
        if !(self.gaps.expansion_factor.is_finite() && self.gaps.expansion_factor > 0.0) {
            return Err(GenomeShaderError::config("gaps.expansion_factor must be positive"));
        }
        if self.cache.capacity == 0 {
            return Err(GenomeShaderError::config("cache.capacity must be at least 1"));
        }
        if !(self.track.padding.is_finite() && self.track.padding >= 0.0) {
            return Err(GenomeShaderError::config("track.padding must be a non-negative number"));
        }
        let l = &self.layout;
        if l.min_node_size < 0.0 || l.node_gap < 0.0 || l.node_thickness <= 0.0 {
            return Err(GenomeShaderError::config("layout sizes must be non-negative"));
        }
        Ok(())
    }
}
