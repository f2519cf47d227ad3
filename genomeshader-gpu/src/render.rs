/*!
# wgpu Draw Backend

One render pipeline per primitive kind. Every kind is drawn instanced from a
single vertex buffer built from the batch bytes; vertex positions are
generated in the shader from `vertex_index`. Blending is premultiplied
alpha, so colours must already be premultiplied.
*/

use crate::batch::{
    DrawBackend, DrawCall, LineInstance, PrimitiveKind, RectInstance, RibbonInstance, TriangleInstance,
};
use anyhow::{anyhow, Result};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Uniform block shared by every shader
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Globals {
    pub projection: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub segments: u32,
    pub _padding: u32,
}

impl Globals {
    /// Pixel space with the origin at the top-left corner.
    pub fn new(width: u32, height: u32, segments: u32) -> Self {
        Self {
            projection: glam::Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
                .to_cols_array_2d(),
            viewport: [width as f32, height as f32],
            segments,
            _padding: 0,
        }
    }
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipelines: HashMap<PrimitiveKind, wgpu::RenderPipeline>,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    target: Option<wgpu::TextureView>,
    encoder: Option<wgpu::CommandEncoder>,
    pending_clear: Option<wgpu::Color>,
    segments: u32,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        format: wgpu::TextureFormat,
        segments: u32,
    ) -> Self {
        let globals_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("GenomeShader Globals Layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("GenomeShader Pipeline Layout"),
            bind_group_layouts: &[&globals_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipelines = PrimitiveKind::ALL
            .iter()
            .map(|&kind| (kind, create_pipeline(&device, &pipeline_layout, format, kind)))
            .collect();

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GenomeShader Globals"),
            contents: bytemuck::bytes_of(&Globals::new(1, 1, segments)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &globals_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("GenomeShader Globals Bind Group"),
        });

        Self {
            device,
            queue,
            pipelines,
            globals_buffer,
            globals_bind_group,
            target: None,
            encoder: None,
            pending_clear: None,
            segments,
        }
    }

    /// Start a frame targeting `view`. The first pass clears to `background`
    /// (premultiplied RGBA).
    pub fn begin_frame(&mut self, view: wgpu::TextureView, width: u32, height: u32, background: [f32; 4]) {
        let globals = Globals::new(width, height, self.segments);
        self.queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        self.encoder = Some(self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("GenomeShader Frame Encoder"),
        }));
        self.target = Some(view);
        self.pending_clear = Some(wgpu::Color {
            r: background[0] as f64,
            g: background[1] as f64,
            b: background[2] as f64,
            a: background[3] as f64,
        });
    }

    fn load_op(&mut self) -> wgpu::LoadOp<wgpu::Color> {
        match self.pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        }
    }
}

impl DrawBackend for WgpuBackend {
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        if call.vertices_per_instance != call.kind.vertices_per_instance(self.segments) {
            return Err(anyhow!(
                "{:?} batch tessellated for {} vertices, pipeline expects {}",
                call.kind,
                call.vertices_per_instance,
                call.kind.vertices_per_instance(self.segments)
            ));
        }
        let load = self.load_op();

        let instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GenomeShader Instances"),
            contents: call.bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });

        let encoder = self.encoder.as_mut().ok_or_else(|| anyhow!("draw called outside begin_frame"))?;
        let view = self.target.as_ref().ok_or_else(|| anyhow!("no render target"))?;
        let pipeline = self
            .pipelines
            .get(&call.kind)
            .ok_or_else(|| anyhow!("no pipeline for {:?}", call.kind))?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GenomeShader Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
        render_pass.set_vertex_buffer(0, instance_buffer.slice(..));
        render_pass.draw(0..call.vertices_per_instance, 0..call.instance_count);
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        // An empty frame still has to clear the target.
        if self.pending_clear.is_some() {
            let load = self.load_op();
            let encoder = self.encoder.as_mut().ok_or_else(|| anyhow!("finish_frame without begin_frame"))?;
            let view = self.target.as_ref().ok_or_else(|| anyhow!("no render target"))?;
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GenomeShader Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        let encoder = self.encoder.take().ok_or_else(|| anyhow!("finish_frame without begin_frame"))?;
        self.queue.submit(std::iter::once(encoder.finish()));
        self.target = None;
        Ok(())
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    kind: PrimitiveKind,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{:?} Shader", kind)),
        source: wgpu::ShaderSource::Wgsl(crate::shaders::source_for(kind).into()),
    });

    let (buffer, topology) = match kind {
        PrimitiveKind::Rect => (RectInstance::desc(), wgpu::PrimitiveTopology::TriangleList),
        PrimitiveKind::Line => (LineInstance::desc(), wgpu::PrimitiveTopology::TriangleList),
        PrimitiveKind::Triangle => (TriangleInstance::desc(), wgpu::PrimitiveTopology::TriangleList),
        PrimitiveKind::Ribbon => (RibbonInstance::desc(), wgpu::PrimitiveTopology::TriangleStrip),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{:?} Pipeline", kind)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[buffer],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

// Instance buffer layouts
const RECT_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

const LINE_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4, 3 => Float32];

// `color` follows two floats of padding so it stays 16-byte aligned.
const TRIANGLE_ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x2,
    },
    wgpu::VertexAttribute {
        offset: 8,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x2,
    },
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x2,
    },
    wgpu::VertexAttribute {
        offset: 32,
        shader_location: 3,
        format: wgpu::VertexFormat::Float32x4,
    },
];

const RIBBON_ATTRIBUTES: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
    0 => Float32x2, 1 => Float32x2, 2 => Float32x2, 3 => Float32x2,
    4 => Float32x2, 5 => Float32x2, 6 => Float32x2, 7 => Float32x2,
    8 => Float32x4
];

impl RectInstance {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RectInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &RECT_ATTRIBUTES,
        }
    }
}

impl LineInstance {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &LINE_ATTRIBUTES,
        }
    }
}

impl TriangleInstance {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TriangleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &TRIANGLE_ATTRIBUTES,
        }
    }
}

impl RibbonInstance {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RibbonInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &RIBBON_ATTRIBUTES,
        }
    }
}
