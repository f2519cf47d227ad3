/*!
# Ribbon Tessellation

CPU reference for the ribbon vertex shader. A ribbon instance carries two
cubic boundary curves; both are sampled at the same `t` and the samples are
emitted as a triangle strip alternating near and far.
*/

use crate::batch::RibbonInstance;
use genomeshader_core::config::{MAX_TESSELLATION_SEGMENTS, MIN_TESSELLATION_SEGMENTS};
use genomeshader_core::geometry::CubicBezier;
use genomeshader_core::ribbons::RibbonSegment;

/// Upper bound on a control handle as a fraction of endpoint separation.
pub const MAX_HANDLE_FRACTION: f32 = 0.45;

const MIN_SEPARATION: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RibbonRasterizer {
    segments: u32,
}

impl Default for RibbonRasterizer {
    fn default() -> Self {
        Self::new(genomeshader_core::config::DEFAULT_TESSELLATION_SEGMENTS)
    }
}

impl RibbonRasterizer {
    pub fn new(segments: u32) -> Self {
        Self {
            segments: segments.clamp(MIN_TESSELLATION_SEGMENTS, MAX_TESSELLATION_SEGMENTS),
        }
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn vertex_count(&self) -> usize {
        2 * (self.segments as usize + 1)
    }

    /// Check a ribbon before it reaches the GPU. Returns `None` for
    /// non-finite control points or curves whose endpoints coincide; handles
    /// longer than [`MAX_HANDLE_FRACTION`] of the separation are shortened.
    pub fn validate(&self, ribbon: &RibbonInstance) -> Option<RibbonInstance> {
        let finite = ribbon
            .near
            .iter()
            .chain(ribbon.far.iter())
            .all(|p| p[0].is_finite() && p[1].is_finite())
            && ribbon.color.iter().all(|c| c.is_finite());
        if !finite {
            log::debug!("dropping ribbon with non-finite control points");
            return None;
        }

        let near_sep = distance(ribbon.near[0], ribbon.near[3]);
        let far_sep = distance(ribbon.far[0], ribbon.far[3]);
        if near_sep < MIN_SEPARATION || far_sep < MIN_SEPARATION {
            log::debug!("dropping zero-separation ribbon");
            return None;
        }

        Some(RibbonInstance {
            near: clamp_handles(ribbon.near, near_sep),
            far: clamp_handles(ribbon.far, far_sep),
            color: ribbon.color,
        })
    }

    /// Pack a laid-out ribbon segment, validating it on the way.
    pub fn instance_from_segment(&self, segment: &RibbonSegment) -> Option<RibbonInstance> {
        let raw = RibbonInstance {
            near: curve_to_f32(&segment.near),
            far: curve_to_f32(&segment.far),
            color: segment.color,
        };
        let checked = self.validate(&raw);
        if checked.is_none() {
            log::debug!(
                "ribbon {}:{} -> {}:{} rejected by tessellator",
                segment.src,
                segment.src_allele,
                segment.dst,
                segment.dst_allele
            );
        }
        checked
    }

    /// Triangle strip of `2 * (segments + 1)` vertices: near(t0), far(t0),
    /// near(t1), far(t1), ...
    pub fn tessellate(&self, ribbon: &RibbonInstance) -> Vec<[f32; 2]> {
        let n = self.segments;
        let mut strip = Vec::with_capacity(self.vertex_count());
        for i in 0..=n {
            let t = i as f32 / n as f32;
            strip.push(cubic_point(&ribbon.near, t));
            strip.push(cubic_point(&ribbon.far, t));
        }
        strip
    }

    /// The strip unrolled into independent triangles.
    pub fn triangles(&self, ribbon: &RibbonInstance) -> Vec<[[f32; 2]; 3]> {
        self.tessellate(ribbon)
            .windows(3)
            .map(|w| [w[0], w[1], w[2]])
            .collect()
    }
}

/// Evaluate a cubic bezier given as four control points.
pub fn cubic_point(ctrl: &[[f32; 2]; 4], t: f32) -> [f32; 2] {
    let u = 1.0 - t;
    let b = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
    let mut out = [0.0f32; 2];
    for (weight, p) in b.iter().zip(ctrl.iter()) {
        out[0] += weight * p[0];
        out[1] += weight * p[1];
    }
    out
}

fn curve_to_f32(curve: &CubicBezier) -> [[f32; 2]; 4] {
    [curve.p0.to_f32(), curve.p1.to_f32(), curve.p2.to_f32(), curve.p3.to_f32()]
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

fn clamp_handles(mut ctrl: [[f32; 2]; 4], separation: f32) -> [[f32; 2]; 4] {
    let max_len = MAX_HANDLE_FRACTION * separation;
    ctrl[1] = clamp_handle(ctrl[0], ctrl[1], max_len);
    ctrl[2] = clamp_handle(ctrl[3], ctrl[2], max_len);
    ctrl
}

fn clamp_handle(anchor: [f32; 2], handle: [f32; 2], max_len: f32) -> [f32; 2] {
    let len = distance(anchor, handle);
    if len <= max_len {
        return handle;
    }
    let scale = max_len / len;
    [
        anchor[0] + (handle[0] - anchor[0]) * scale,
        anchor[1] + (handle[1] - anchor[1]) * scale,
    ]
}
