/*!
# GenomeShader GPU Rendering

Turns a computed [`genomeshader_core::Frame`] into instanced draw calls.

## Architecture

1. **Scene**: [`scene::submit_frame`] pushes gap bands, ribbons, allele nodes
   and selection marks onto a [`BatchRenderer`].
2. **Batching**: one packed instance buffer per primitive kind, flushed as
   exactly one draw call per non-empty kind per frame.
3. **Backends**: [`WgpuBackend`] (feature `webgpu`) evaluates ribbon curves
   in the vertex shader; [`vector_export`] provides SVG and CPU PNG output
   for headless use. [`RecordingBackend`] captures draw calls for tests.
*/

pub mod batch;
pub mod rasterizer;
pub mod scene;
pub mod shaders;
#[cfg(feature = "webgpu")]
pub mod pipeline;
#[cfg(feature = "webgpu")]
pub mod render;
#[cfg(feature = "vector-export")]
pub mod vector_export;

pub use batch::{
    BatchRenderer, DrawBackend, DrawCall, LineInstance, PrimitiveKind, RecordingBackend, RectInstance,
    RibbonInstance, TriangleInstance,
};
pub use rasterizer::RibbonRasterizer;
pub use scene::{submit_frame, SceneStats};
#[cfg(feature = "webgpu")]
pub use pipeline::GpuContext;
#[cfg(feature = "webgpu")]
pub use render::WgpuBackend;
#[cfg(feature = "vector-export")]
pub use vector_export::{ExportConfig, PngBackend, SvgBackend, VectorExporter};

/// Version information for the GenomeShader GPU crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
