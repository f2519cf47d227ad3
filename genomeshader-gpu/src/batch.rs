/*!
# Primitive Batching

Per-frame instance lists for the four primitive kinds drawn by the flow
track. Nothing is retained between frames: callers push every instance each
redraw and [`BatchRenderer::render`] hands one contiguous buffer per kind to
a [`DrawBackend`].
*/

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use genomeshader_core::config::{MAX_TESSELLATION_SEGMENTS, MIN_TESSELLATION_SEGMENTS};
use serde::Serialize;

/// Filled axis-aligned rectangle
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RectInstance {
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

/// Line segment expanded to a quad of `width` pixels
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineInstance {
    pub from: [f32; 2],
    pub to: [f32; 2],
    pub color: [f32; 4],
    pub width: f32,
    pub _padding: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TriangleInstance {
    pub a: [f32; 2],
    pub b: [f32; 2],
    pub c: [f32; 2],
    pub _padding: [f32; 2],
    pub color: [f32; 4],
}

/// Ribbon between two cubic boundary curves. Colours are premultiplied.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RibbonInstance {
    pub near: [[f32; 2]; 4],
    pub far: [[f32; 2]; 4],
    pub color: [f32; 4],
}

/// Primitive kinds in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PrimitiveKind {
    Rect,
    Ribbon,
    Line,
    Triangle,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 4] = [
        PrimitiveKind::Rect,
        PrimitiveKind::Ribbon,
        PrimitiveKind::Line,
        PrimitiveKind::Triangle,
    ];

    /// Size in bytes of one instance record.
    pub fn stride(self) -> usize {
        match self {
            PrimitiveKind::Rect => std::mem::size_of::<RectInstance>(),
            PrimitiveKind::Ribbon => std::mem::size_of::<RibbonInstance>(),
            PrimitiveKind::Line => std::mem::size_of::<LineInstance>(),
            PrimitiveKind::Triangle => std::mem::size_of::<TriangleInstance>(),
        }
    }

    /// Vertices the shader generates per instance. Ribbons are a strip of
    /// `2 * (segments + 1)` vertices.
    pub fn vertices_per_instance(self, segments: u32) -> u32 {
        match self {
            PrimitiveKind::Rect | PrimitiveKind::Line => 6,
            PrimitiveKind::Triangle => 3,
            PrimitiveKind::Ribbon => 2 * (segments + 1),
        }
    }
}

/// One instanced draw: `instance_count` records packed in `bytes`.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub kind: PrimitiveKind,
    pub instance_count: u32,
    pub vertices_per_instance: u32,
    pub bytes: &'a [u8],
}

/// Anything that can consume packed instance buffers.
pub trait DrawBackend {
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;

    /// Called once after the last draw of a frame.
    fn finish_frame(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Append-only instance lists, flushed once per frame.
#[derive(Debug, Clone)]
pub struct BatchRenderer {
    rects: Vec<RectInstance>,
    ribbons: Vec<RibbonInstance>,
    lines: Vec<LineInstance>,
    triangles: Vec<TriangleInstance>,
    segments: u32,
    frames: u64,
}

impl Default for BatchRenderer {
    fn default() -> Self {
        Self::new(genomeshader_core::config::DEFAULT_TESSELLATION_SEGMENTS)
    }
}

impl BatchRenderer {
    pub fn new(segments: u32) -> Self {
        Self {
            rects: Vec::new(),
            ribbons: Vec::new(),
            lines: Vec::new(),
            triangles: Vec::new(),
            segments: segments.clamp(MIN_TESSELLATION_SEGMENTS, MAX_TESSELLATION_SEGMENTS),
            frames: 0,
        }
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Frames flushed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn push_rect(&mut self, rect: RectInstance) {
        self.rects.push(rect);
    }

    pub fn push_ribbon(&mut self, ribbon: RibbonInstance) {
        self.ribbons.push(ribbon);
    }

    pub fn push_line(&mut self, line: LineInstance) {
        self.lines.push(line);
    }

    pub fn push_triangle(&mut self, triangle: TriangleInstance) {
        self.triangles.push(triangle);
    }

    pub fn pending(&self, kind: PrimitiveKind) -> usize {
        match kind {
            PrimitiveKind::Rect => self.rects.len(),
            PrimitiveKind::Ribbon => self.ribbons.len(),
            PrimitiveKind::Line => self.lines.len(),
            PrimitiveKind::Triangle => self.triangles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        PrimitiveKind::ALL.iter().all(|k| self.pending(*k) == 0)
    }

    fn bytes(&self, kind: PrimitiveKind) -> &[u8] {
        match kind {
            PrimitiveKind::Rect => bytemuck::cast_slice(&self.rects),
            PrimitiveKind::Ribbon => bytemuck::cast_slice(&self.ribbons),
            PrimitiveKind::Line => bytemuck::cast_slice(&self.lines),
            PrimitiveKind::Triangle => bytemuck::cast_slice(&self.triangles),
        }
    }

    /// Issue one draw call per non-empty kind, then clear every list.
    ///
    /// The lists are cleared even when the backend fails so a bad frame
    /// does not leak into the next one.
    pub fn render(&mut self, backend: &mut dyn DrawBackend) -> Result<()> {
        let result = self.submit(backend);
        self.clear();
        self.frames += 1;
        result
    }

    fn submit(&self, backend: &mut dyn DrawBackend) -> Result<()> {
        for kind in PrimitiveKind::ALL {
            let count = self.pending(kind);
            if count == 0 {
                continue;
            }
            let call = DrawCall {
                kind,
                instance_count: count as u32,
                vertices_per_instance: kind.vertices_per_instance(self.segments),
                bytes: self.bytes(kind),
            };
            log::trace!("draw {:?}: {} instances, {} bytes", kind, count, call.bytes.len());
            backend.draw(&call)?;
        }
        backend.finish_frame()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.ribbons.clear();
        self.lines.clear();
        self.triangles.clear();
    }
}

/// A draw call captured by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedDraw {
    pub kind: PrimitiveKind,
    pub instance_count: u32,
    pub vertices_per_instance: u32,
    pub bytes: Vec<u8>,
}

/// Keeps copies of every draw call, grouped by frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub frames: Vec<Vec<RecordedDraw>>,
    current: Vec<RecordedDraw>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&[RecordedDraw]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl DrawBackend for RecordingBackend {
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        self.current.push(RecordedDraw {
            kind: call.kind,
            instance_count: call.instance_count,
            vertices_per_instance: call.vertices_per_instance,
            bytes: call.bytes.to_vec(),
        });
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        self.frames.push(std::mem::take(&mut self.current));
        Ok(())
    }
}

/// Decode a packed instance buffer. Trailing bytes that do not fill a whole
/// record are ignored.
pub fn decode_instances<T: Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect()
}
