//! Headless GPU context and offscreen rendering.

use crate::batch::BatchRenderer;
use crate::render::WgpuBackend;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// `Ok(None)` when no adapter is available.
    pub async fn new() -> Result<Option<Self>> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Some(adapter) => adapter,
            None => return Ok(None),
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("GenomeShader Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .context("requesting GPU device")?;

        let adapter_info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", adapter_info.name, adapter_info.device_type);

        Ok(Some(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        }))
    }

    pub fn new_blocking() -> Result<Option<Self>> {
        pollster::block_on(Self::new())
    }

    pub fn device_info(&self) -> String {
        format!("{} ({:?})", self.adapter_info.name, self.adapter_info.device_type)
    }

    /// Flush `batch` into a fresh texture and read it back.
    pub fn render_to_image(
        &self,
        batch: &mut BatchRenderer,
        width: u32,
        height: u32,
        background: [f32; 4],
    ) -> Result<image::RgbaImage> {
        if width == 0 || height == 0 {
            return Err(anyhow!("cannot render a {}x{} image", width, height));
        }
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("GenomeShader Offscreen Target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let mut backend = WgpuBackend::new(
            Arc::clone(&self.device),
            Arc::clone(&self.queue),
            OFFSCREEN_FORMAT,
            batch.segments(),
        );
        backend.begin_frame(
            texture.create_view(&wgpu::TextureViewDescriptor::default()),
            width,
            height,
            background,
        );
        batch.render(&mut backend)?;

        self.read_back(&texture, width, height)
    }

    fn read_back(&self, texture: &wgpu::Texture, width: u32, height: u32) -> Result<image::RgbaImage> {
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GenomeShader Readback"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("GenomeShader Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .context("readback callback dropped")?
            .context("mapping readback buffer")?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| anyhow!("readback size mismatch"))
    }
}
