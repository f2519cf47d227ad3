/*!
# Headless Export

SVG and PNG output without a GPU. Both go through the same path as the live
renderer: the frame is submitted to a [`BatchRenderer`] and flushed into a
[`DrawBackend`]. [`SvgBackend`] writes one element per instance and
[`PngBackend`] rasterises on the CPU with premultiplied blending. SVG output
also gets a legend, a scale bar and an optional footer.
*/

use crate::batch::{
    decode_instances, BatchRenderer, DrawBackend, DrawCall, LineInstance, PrimitiveKind, RectInstance,
    RibbonInstance, TriangleInstance,
};
use crate::rasterizer::RibbonRasterizer;
use crate::scene::submit_frame;
use anyhow::{Context, Result};
use genomeshader_core::config::DEFAULT_TESSELLATION_SEGMENTS;
use genomeshader_core::{AlleleKey, Frame, Palette};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

/// Export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub segments: u32,
    pub show_legend: bool,
    pub show_scale_bar: bool,
    /// Footer with version, window and a UTC timestamp. Turn off for
    /// byte-stable output.
    pub show_footer: bool,
    pub title: Option<String>,
    pub font_family: String,
    pub font_size: u32,
    pub provenance_comment: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            segments: DEFAULT_TESSELLATION_SEGMENTS,
            show_legend: true,
            show_scale_bar: true,
            show_footer: true,
            title: None,
            font_family: "Arial, sans-serif".to_string(),
            font_size: 12,
            provenance_comment: None,
        }
    }
}

pub struct VectorExporter {
    config: ExportConfig,
    palette: Palette,
}

impl VectorExporter {
    pub fn new(config: ExportConfig, palette: Palette) -> Self {
        Self { config, palette }
    }

    fn batch(&self, frame: &Frame) -> BatchRenderer {
        let mut batch = BatchRenderer::new(self.config.segments);
        let rasterizer = RibbonRasterizer::new(self.config.segments);
        let stats = submit_frame(frame, &mut batch, &rasterizer, &self.palette);
        log::debug!("export batch: {:?}", stats);
        batch
    }

    /// Render `frame` to an SVG document.
    pub fn render_svg_string(&self, frame: &Frame) -> Result<String> {
        let (width, height) = pixel_size(frame);
        let mut backend = SvgBackend::new(width, height);
        backend.add_background(&self.palette);
        if let Some(comment) = &self.config.provenance_comment {
            backend.add_comment(comment);
        }

        let mut batch = self.batch(frame);
        if self.config.show_scale_bar {
            push_scale_bar(&mut batch, frame, &self.palette);
        }
        batch.render(&mut backend)?;

        if self.config.show_scale_bar {
            if let Some((label, at)) = scale_bar_label(frame) {
                backend.add_text(&label, at, &self.config, &self.palette, "middle");
            }
        }
        if let Some(title) = &self.config.title {
            backend.add_text(
                title,
                [width as f32 / 2.0, self.config.font_size as f32 + 4.0],
                &self.config,
                &self.palette,
                "middle",
            );
        }
        if self.config.show_legend {
            backend.add_legend(frame, &self.config, &self.palette);
        }
        if self.config.show_footer {
            let footer = format!(
                "GenomeShader v{} | {} | {:?} | Generated: {}",
                crate::VERSION,
                frame.window,
                frame.axis,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            );
            backend.add_text(&footer, [6.0, height as f32 - 6.0], &self.config, &self.palette, "start");
        }
        Ok(backend.finish())
    }

    pub fn export_svg<P: AsRef<Path>>(&self, path: P, frame: &Frame) -> Result<()> {
        let path = path.as_ref();
        let svg = self.render_svg_string(frame)?;
        std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote SVG to {}", path.display());
        Ok(())
    }

    /// CPU raster of `frame`.
    pub fn render_png(&self, frame: &Frame) -> Result<image::RgbaImage> {
        let (width, height) = pixel_size(frame);
        let mut backend = PngBackend::new(width, height, self.palette.background.premultiplied());
        let mut batch = self.batch(frame);
        if self.config.show_scale_bar {
            push_scale_bar(&mut batch, frame, &self.palette);
        }
        batch.render(&mut backend)?;
        Ok(backend.into_image())
    }

    pub fn export_png<P: AsRef<Path>>(&self, path: P, frame: &Frame) -> Result<()> {
        let path = path.as_ref();
        let img = self.render_png(frame)?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote PNG to {}", path.display());
        Ok(())
    }
}

fn pixel_size(frame: &Frame) -> (u32, u32) {
    let w = if frame.size.width.is_finite() { frame.size.width.round().max(1.0) } else { 1.0 };
    let h = if frame.size.height.is_finite() { frame.size.height.round().max(1.0) } else { 1.0 };
    (w as u32, h as u32)
}

/// Scale bar length in bases and pixels, aiming for a fifth of the flow extent.
fn scale_bar(frame: &Frame) -> Option<(f64, f64)> {
    if !frame.pixels_per_bp.is_finite() || frame.pixels_per_bp <= 0.0 {
        return None;
    }
    let target_px = (frame.axis.flow_extent(frame.size) / 5.0).max(40.0);
    let bp = nice_round_length(target_px / frame.pixels_per_bp);
    Some((bp, bp * frame.pixels_per_bp))
}

const SCALE_BAR_OFFSET: f64 = 10.0;

fn push_scale_bar(batch: &mut BatchRenderer, frame: &Frame, palette: &Palette) {
    let Some((_, length)) = scale_bar(frame) else { return };
    let stack = frame.axis.stack_extent(frame.size) - SCALE_BAR_OFFSET;
    let color = palette.text.premultiplied();
    batch.push_line(LineInstance {
        from: frame.axis.point(SCALE_BAR_OFFSET, stack).to_f32(),
        to: frame.axis.point(SCALE_BAR_OFFSET + length, stack).to_f32(),
        color,
        width: 2.0,
        _padding: [0.0; 3],
    });
}

fn scale_bar_label(frame: &Frame) -> Option<(String, [f32; 2])> {
    let (bp, length) = scale_bar(frame)?;
    let stack = frame.axis.stack_extent(frame.size) - SCALE_BAR_OFFSET - 6.0;
    let at = frame.axis.point(SCALE_BAR_OFFSET + length / 2.0, stack).to_f32();
    Some((format_bp(bp), at))
}

// Format a basepair length in human-friendly units
fn format_bp(bp: f64) -> String {
    if bp >= 1e9 {
        format!("{:.2} Gb", bp / 1e9)
    } else if bp >= 1e6 {
        format!("{:.2} Mb", bp / 1e6)
    } else if bp >= 1e3 {
        format!("{:.2} kb", bp / 1e3)
    } else {
        format!("{:.0} bp", bp)
    }
}

// Round a length up to 2, 5 or 10 times a power of ten
fn nice_round_length(x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let base = 10f64.powf(x.log10().floor());
    let mant = x / base;
    let nice = if mant < 2.0 {
        2.0
    } else if mant < 5.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

/// Hex colour and opacity for a premultiplied RGBA value.
fn paint(color: [f32; 4]) -> (String, f32) {
    let a = color[3];
    if a <= 0.0 {
        return ("#000000".to_string(), 0.0);
    }
    let channel = |c: f32| ((c / a).clamp(0.0, 1.0) * 255.0).round() as u8;
    (
        format!("#{:02x}{:02x}{:02x}", channel(color[0]), channel(color[1]), channel(color[2])),
        a.min(1.0),
    )
}

/// Collects SVG elements from draw calls.
pub struct SvgBackend {
    width: u32,
    height: u32,
    comments: Vec<String>,
    elements: Vec<String>,
}

impl SvgBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            comments: Vec::new(),
            elements: Vec::new(),
        }
    }

    fn add_background(&mut self, palette: &Palette) {
        self.elements.push(format!(
            r#"<rect width="{}" height="{}" fill="{}"/>"#,
            self.width,
            self.height,
            palette.background.to_hex()
        ));
    }

    fn add_comment(&mut self, text: &str) {
        self.comments.push(text.replace("--", "- -"));
    }

    fn add_text(&mut self, text: &str, at: [f32; 2], config: &ExportConfig, palette: &Palette, anchor: &str) {
        self.elements.push(format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{}px" text-anchor="{}" fill="{}">{}</text>"#,
            at[0],
            at[1],
            config.font_family,
            config.font_size,
            anchor,
            palette.text.to_hex(),
            escape(text)
        ));
    }

    fn add_legend(&mut self, frame: &Frame, config: &ExportConfig, palette: &Palette) {
        let alleles: BTreeSet<AlleleKey> = frame.node_boxes.iter().map(|b| b.allele.allele).collect();
        if alleles.is_empty() {
            return;
        }
        let row = config.font_size as f32 + 6.0;
        let x = self.width as f32 - 110.0;
        let y = 10.0;
        self.elements.push(format!(
            r#"<rect x="{:.2}" y="{:.2}" width="100" height="{:.2}" fill="{}" fill-opacity="0.85" stroke="{}" stroke-width="1"/>"#,
            x,
            y,
            row * alleles.len() as f32 + 8.0,
            palette.background.to_hex(),
            palette.outline.to_hex()
        ));
        for (i, allele) in alleles.iter().enumerate() {
            let cy = y + 4.0 + row * i as f32 + row / 2.0;
            self.elements.push(format!(
                r#"<rect x="{:.2}" y="{:.2}" width="10" height="10" fill="{}"/>"#,
                x + 8.0,
                cy - 5.0,
                palette.allele_color(*allele).to_hex()
            ));
            self.add_text(&allele.to_string(), [x + 24.0, cy + 4.0], config, palette, "start");
        }
    }

    fn finish(self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        let _ = writeln!(
            out,
            r#"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"#,
            self.width, self.height, self.width, self.height
        );
        for c in &self.comments {
            for line in c.lines() {
                let _ = writeln!(out, "  <!-- {} -->", line);
            }
        }
        for element in &self.elements {
            let _ = writeln!(out, "  {}", element);
        }
        out.push_str("</svg>\n");
        out
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl DrawBackend for SvgBackend {
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        match call.kind {
            PrimitiveKind::Rect => {
                for r in decode_instances::<RectInstance>(call.bytes) {
                    let (fill, opacity) = paint(r.color);
                    self.elements.push(format!(
                        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="{:.3}"/>"#,
                        r.origin[0], r.origin[1], r.size[0], r.size[1], fill, opacity
                    ));
                }
            }
            PrimitiveKind::Ribbon => {
                for r in decode_instances::<RibbonInstance>(call.bytes) {
                    let (fill, opacity) = paint(r.color);
                    let [n0, n1, n2, n3] = r.near;
                    let [f0, f1, f2, f3] = r.far;
                    self.elements.push(format!(
                        r#"<path d="M {:.2} {:.2} C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} L {:.2} {:.2} C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} Z" fill="{}" fill-opacity="{:.3}"/>"#,
                        n0[0], n0[1], n1[0], n1[1], n2[0], n2[1], n3[0], n3[1],
                        f3[0], f3[1], f2[0], f2[1], f1[0], f1[1], f0[0], f0[1],
                        fill, opacity
                    ));
                }
            }
            PrimitiveKind::Line => {
                for l in decode_instances::<LineInstance>(call.bytes) {
                    let (stroke, opacity) = paint(l.color);
                    self.elements.push(format!(
                        r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-opacity="{:.3}" stroke-width="{:.2}"/>"#,
                        l.from[0], l.from[1], l.to[0], l.to[1], stroke, opacity, l.width
                    ));
                }
            }
            PrimitiveKind::Triangle => {
                for t in decode_instances::<TriangleInstance>(call.bytes) {
                    let (fill, opacity) = paint(t.color);
                    self.elements.push(format!(
                        r#"<polygon points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{}" fill-opacity="{:.3}"/>"#,
                        t.a[0], t.a[1], t.b[0], t.b[1], t.c[0], t.c[1], fill, opacity
                    ));
                }
            }
        }
        Ok(())
    }
}

type Triangle = [[f32; 2]; 3];

/// CPU rasteriser. Pixels are sampled at their centres and each instance is
/// blended once per covered pixel, `src + dst * (1 - src.a)`.
pub struct PngBackend {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl PngBackend {
    pub fn new(width: u32, height: u32, background: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; (width as usize) * (height as usize)],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    fn fill(&mut self, triangles: &[Triangle], color: [f32; 4]) {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in triangles.iter().flatten() {
            min_x = min_x.min(p[0]);
            min_y = min_y.min(p[1]);
            max_x = max_x.max(p[0]);
            max_y = max_y.max(p[1]);
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return;
        }
        let x0 = min_x.floor().max(0.0) as u32;
        let y0 = min_y.floor().max(0.0) as u32;
        let x1 = (max_x.ceil().max(0.0) as u32).min(self.width);
        let y1 = (max_y.ceil().max(0.0) as u32).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let bw = (x1 - x0) as usize;
        let mut covered = vec![false; bw * (y1 - y0) as usize];
        for tri in triangles {
            for y in y0..y1 {
                for x in x0..x1 {
                    if contains(tri, [x as f32 + 0.5, y as f32 + 0.5]) {
                        covered[(y - y0) as usize * bw + (x - x0) as usize] = true;
                    }
                }
            }
        }

        for (i, hit) in covered.iter().enumerate() {
            if *hit {
                let x = x0 + (i % bw) as u32;
                let y = y0 + (i / bw) as u32;
                let dst = &mut self.pixels[(y * self.width + x) as usize];
                let keep = 1.0 - color[3];
                for (d, s) in dst.iter_mut().zip(color) {
                    *d = s + *d * keep;
                }
            }
        }
    }

    pub fn into_image(self) -> image::RgbaImage {
        let mut img = image::RgbaImage::new(self.width, self.height);
        for (out, px) in img.pixels_mut().zip(self.pixels.iter()) {
            let a = px[3].clamp(0.0, 1.0);
            let straight = |c: f32| {
                let v = if a > 0.0 { c / a } else { 0.0 };
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            };
            *out = image::Rgba([straight(px[0]), straight(px[1]), straight(px[2]), (a * 255.0).round() as u8]);
        }
        img
    }
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn contains(tri: &Triangle, p: [f32; 2]) -> bool {
    let e0 = edge(tri[0], tri[1], p);
    let e1 = edge(tri[1], tri[2], p);
    let e2 = edge(tri[2], tri[0], p);
    (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0)
}

fn quad(a: [f32; 2], b: [f32; 2], c: [f32; 2], d: [f32; 2]) -> [Triangle; 2] {
    [[a, b, c], [a, c, d]]
}

impl DrawBackend for PngBackend {
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        match call.kind {
            PrimitiveKind::Rect => {
                for r in decode_instances::<RectInstance>(call.bytes) {
                    let [x, y] = r.origin;
                    let [w, h] = r.size;
                    self.fill(&quad([x, y], [x + w, y], [x + w, y + h], [x, y + h]), r.color);
                }
            }
            PrimitiveKind::Line => {
                for l in decode_instances::<LineInstance>(call.bytes) {
                    let (dx, dy) = (l.to[0] - l.from[0], l.to[1] - l.from[1]);
                    let len = (dx * dx + dy * dy).sqrt().max(1e-4);
                    let (nx, ny) = (-dy / len * l.width * 0.5, dx / len * l.width * 0.5);
                    let tris = quad(
                        [l.from[0] + nx, l.from[1] + ny],
                        [l.to[0] + nx, l.to[1] + ny],
                        [l.to[0] - nx, l.to[1] - ny],
                        [l.from[0] - nx, l.from[1] - ny],
                    );
                    self.fill(&tris, l.color);
                }
            }
            PrimitiveKind::Triangle => {
                for t in decode_instances::<TriangleInstance>(call.bytes) {
                    self.fill(&[[t.a, t.b, t.c]], t.color);
                }
            }
            PrimitiveKind::Ribbon => {
                let segments = (call.vertices_per_instance / 2).saturating_sub(1);
                let rasterizer = RibbonRasterizer::new(segments);
                for r in decode_instances::<RibbonInstance>(call.bytes) {
                    self.fill(&rasterizer.triangles(&r), r.color);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_call(rect: &RectInstance) -> Vec<u8> {
        bytemuck::bytes_of(rect).to_vec()
    }

    #[test]
    fn premultiplied_blend_over_white() {
        let mut png = PngBackend::new(4, 4, [1.0, 1.0, 1.0, 1.0]);
        let rect = RectInstance {
            origin: [0.0, 0.0],
            size: [2.0, 2.0],
            color: [0.5, 0.0, 0.0, 0.5],
        };
        let bytes = rect_call(&rect);
        png.draw(&DrawCall {
            kind: PrimitiveKind::Rect,
            instance_count: 1,
            vertices_per_instance: 6,
            bytes: &bytes,
        })
        .unwrap();

        assert_eq!(png.pixel(0, 0), Some([1.0, 0.5, 0.5, 1.0]));
        assert_eq!(png.pixel(3, 3), Some([1.0, 1.0, 1.0, 1.0]));
        let img = png.into_image();
        assert_eq!(img.get_pixel(1, 1).0, [255, 128, 128, 255]);
    }

    #[test]
    fn overlapping_strip_triangles_blend_once() {
        let mut png = PngBackend::new(20, 20, [0.0, 0.0, 0.0, 1.0]);
        let ribbon = RibbonInstance {
            near: [[0.0, 5.0], [5.0, 5.0], [15.0, 5.0], [20.0, 5.0]],
            far: [[0.0, 15.0], [5.0, 15.0], [15.0, 15.0], [20.0, 15.0]],
            color: [0.25, 0.25, 0.25, 0.25],
        };
        let bytes = bytemuck::bytes_of(&ribbon).to_vec();
        png.draw(&DrawCall {
            kind: PrimitiveKind::Ribbon,
            instance_count: 1,
            vertices_per_instance: PrimitiveKind::Ribbon.vertices_per_instance(8),
            bytes: &bytes,
        })
        .unwrap();
        assert_eq!(png.pixel(10, 10), Some([0.25, 0.25, 0.25, 1.0]));
        assert_eq!(png.pixel(10, 1), Some([0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn paint_unpremultiplies() {
        assert_eq!(paint([0.5, 0.25, 0.0, 0.5]), ("#ff8000".to_string(), 0.5));
        assert_eq!(paint([0.0, 0.0, 0.0, 0.0]).1, 0.0);
    }

    #[test]
    fn scale_lengths() {
        assert_eq!(nice_round_length(130.0), 200.0);
        assert_eq!(nice_round_length(3.0), 5.0);
        assert_eq!(format_bp(200.0), "200 bp");
        assert_eq!(format_bp(5000.0), "5.00 kb");
    }
}
