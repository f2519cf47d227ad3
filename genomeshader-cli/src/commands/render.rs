//! `genomeshader render`: load a payload, apply the requested view state and
//! export one frame.

use super::load_input;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::ExportFormat;
use anyhow::{Context, Result};
use genomeshader_core::geometry::Size;
use genomeshader_core::io::parse_locus;
use genomeshader_core::{
    AlleleKey, AlleleRef, Browser, BrowserEvent, Frame, GenomicWindow, RedrawOutcome, Variant, VariantId,
};
use genomeshader_gpu::{ExportConfig, VectorExporter};
use std::path::{Path, PathBuf};

pub struct RenderArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Option<ExportFormat>,
    pub locus: Option<String>,
    pub expand: Vec<u64>,
    pub select: Vec<String>,
    pub order: Vec<String>,
    pub title: Option<String>,
    pub gpu: bool,
}

pub fn execute(config: &Config, args: RenderArgs) -> Result<()> {
    let format = resolve_format(&args.output, args.format)?;
    let doc = load_input(&args.input)?;

    let (variants, window) = match &args.locus {
        Some(locus) => {
            let locus = parse_locus(locus).map_err(CliError::from)?;
            let variants: Vec<Variant> = doc
                .variants
                .into_iter()
                .filter(|v| v.chromosome.as_deref().map_or(true, |c| c == locus.chromosome))
                .collect();
            (variants, locus.window)
        }
        None => {
            let window = data_window(&doc.variants, config.view.auto_padding)
                .ok_or_else(|| CliError::invalid_argument("--locus", "input has no variants to derive a window from"))?;
            (doc.variants, window)
        }
    };
    log::info!("Rendering {} variants over {}", variants.len(), window);

    let size = Size::new(f64::from(config.view.width), f64::from(config.view.height));
    let mut browser = Browser::new(config.render.clone(), window, size)
        .with_variants(variants, doc.insertions.as_deref());
    browser.post(BrowserEvent::SetAxis(config.view.axis));
    browser.post(BrowserEvent::SetOrdering(config.view.ordering));

    for id in &args.expand {
        let id = VariantId(*id);
        if browser.track().gaps().get(id).is_none() {
            log::warn!("--expand {}: not an insertion in this track", id);
            continue;
        }
        browser.post(BrowserEvent::ToggleInsertion(id));
    }
    for arg in &args.order {
        let (variant, order) = parse_allele_order(arg)?;
        ensure_known(&browser, variant)?;
        browser.post(BrowserEvent::SetAlleleOrder { variant, order });
    }
    for arg in &args.select {
        let allele = parse_selection(arg)?;
        ensure_known(&browser, allele.variant)?;
        browser.post(BrowserEvent::ToggleAllele(allele));
    }

    let frame = match browser.redraw() {
        RedrawOutcome::Drawn(frame) => frame,
        other => return Err(CliError::rendering(format!("redraw did not produce a frame: {:?}", other)).into()),
    };
    log::debug!(
        "frame: {} columns, {} ribbons, {} gap bands",
        frame.columns.len(),
        frame.ribbons.len(),
        frame.gap_bands.len()
    );

    let export = ExportConfig {
        segments: config.render.tessellation.segments,
        show_legend: config.export.legend,
        show_scale_bar: config.export.scale_bar,
        show_footer: config.export.footer,
        title: args.title,
        font_family: config.export.font_family.clone(),
        font_size: config.export.font_size,
        provenance_comment: Some(format!("source: {}", args.input.display())),
    };
    let exporter = VectorExporter::new(export, config.render.palette.clone());

    match format {
        ExportFormat::Svg => exporter.export_svg(&args.output, &frame)?,
        ExportFormat::Png if args.gpu => export_png_gpu(config, &exporter, &frame, &args.output)?,
        ExportFormat::Png => exporter.export_png(&args.output, &frame)?,
    }
    Ok(())
}

fn resolve_format(output: &Path, requested: Option<ExportFormat>) -> CliResult<ExportFormat> {
    if let Some(format) = requested {
        return Ok(format);
    }
    match output.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("svg") => Ok(ExportFormat::Svg),
        Some("png") => Ok(ExportFormat::Png),
        _ => Err(CliError::invalid_argument(
            "--out",
            format!("cannot infer a format from '{}'; use .svg, .png or --format", output.display()),
        )),
    }
}

/// Span of the loaded positions, padded on both sides.
fn data_window(variants: &[Variant], padding: f64) -> Option<GenomicWindow> {
    let first = variants.iter().map(|v| v.position).min()?;
    let last = variants.iter().map(|v| v.position).max()?;
    let window = if first == last {
        GenomicWindow::centered(first as f64, 100.0)
    } else {
        GenomicWindow::new(first, last)
    };
    Some(window.padded(padding))
}

fn ensure_known(browser: &Browser, id: VariantId) -> CliResult<()> {
    if browser.track().get(id).is_none() {
        return Err(CliError::UnknownVariant { id: id.0 });
    }
    Ok(())
}

/// `12:alt1` -> allele `alt1` of variant 12.
fn parse_selection(arg: &str) -> CliResult<AlleleRef> {
    let (id, allele) = arg
        .split_once(':')
        .ok_or_else(|| CliError::invalid_argument("--select", format!("expected id:allele, got '{}'", arg)))?;
    Ok(AlleleRef::new(parse_id("--select", id)?, parse_key("--select", allele)?))
}

/// `15=alt2/ref/alt1` -> display order for variant 15.
fn parse_allele_order(arg: &str) -> CliResult<(VariantId, Vec<AlleleKey>)> {
    let (id, keys) = arg
        .split_once('=')
        .ok_or_else(|| CliError::invalid_argument("--order", format!("expected id=allele/allele, got '{}'", arg)))?;
    let order = keys
        .split('/')
        .filter(|k| !k.trim().is_empty())
        .map(|k| parse_key("--order", k))
        .collect::<CliResult<Vec<_>>>()?;
    if order.is_empty() {
        return Err(CliError::invalid_argument("--order", format!("no alleles listed in '{}'", arg)));
    }
    Ok((parse_id("--order", id)?, order))
}

fn parse_id(argument: &str, raw: &str) -> CliResult<VariantId> {
    raw.trim()
        .parse::<u64>()
        .map(VariantId)
        .map_err(|_| CliError::invalid_argument(argument, format!("'{}' is not a variant id", raw)))
}

fn parse_key(argument: &str, raw: &str) -> CliResult<AlleleKey> {
    raw.trim()
        .parse::<AlleleKey>()
        .map_err(|e| CliError::invalid_argument(argument, e.to_string()))
}

#[cfg(feature = "gpu")]
fn export_png_gpu(config: &Config, exporter: &VectorExporter, frame: &Frame, output: &Path) -> Result<()> {
    use genomeshader_gpu::{submit_frame, BatchRenderer, GpuContext, RibbonRasterizer};

    let Some(context) = GpuContext::new_blocking()? else {
        log::warn!("No GPU adapter found; falling back to the CPU rasteriser");
        return exporter.export_png(output, frame);
    };
    log::info!("Rendering on {}", context.device_info());

    let segments = config.render.tessellation.segments;
    let mut batch = BatchRenderer::new(segments);
    let stats = submit_frame(frame, &mut batch, &RibbonRasterizer::new(segments), &config.render.palette);
    log::debug!("gpu batch: {:?}", stats);

    let image = context.render_to_image(
        &mut batch,
        config.view.width,
        config.view.height,
        config.render.palette.background.premultiplied(),
    )?;
    image
        .save_with_format(output, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", output.display()))?;
    log::info!("wrote PNG to {}", output.display());
    Ok(())
}

#[cfg(not(feature = "gpu"))]
fn export_png_gpu(_config: &Config, exporter: &VectorExporter, frame: &Frame, output: &Path) -> Result<()> {
    log::warn!("Built without the `gpu` feature; using the CPU rasteriser");
    exporter.export_png(output, frame).context("exporting PNG")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(resolve_format(Path::new("out.SVG"), None).unwrap(), ExportFormat::Svg);
        assert_eq!(resolve_format(Path::new("out.png"), None).unwrap(), ExportFormat::Png);
        assert_eq!(
            resolve_format(Path::new("out.txt"), Some(ExportFormat::Png)).unwrap(),
            ExportFormat::Png
        );
        assert!(matches!(
            resolve_format(Path::new("out"), None),
            Err(CliError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_parse_selection() {
        let allele = parse_selection("12:alt1").unwrap();
        assert_eq!(allele, AlleleRef::new(VariantId(12), AlleleKey::Alt(0)));
        assert_eq!(parse_selection("3:ref").unwrap().allele, AlleleKey::Reference);
        assert!(parse_selection("12").is_err());
        assert!(parse_selection("x:ref").is_err());
    }

    #[test]
    fn test_parse_allele_order() {
        let (id, order) = parse_allele_order("15=alt2/ref/alt1").unwrap();
        assert_eq!(id, VariantId(15));
        assert_eq!(order, vec![AlleleKey::Alt(1), AlleleKey::Reference, AlleleKey::Alt(0)]);
        assert!(parse_allele_order("15=").is_err());
        assert!(parse_allele_order("15").is_err());
    }

    #[test]
    fn test_data_window_is_padded() {
        let variants = vec![Variant::new(1, 1_000, "A", &["G"]), Variant::new(2, 2_000, "C", &["T"])];
        let window = data_window(&variants, 0.1).unwrap();
        assert_eq!(window, GenomicWindow::new(900, 2_100));
        assert!(data_window(&[], 0.1).is_none());
    }
}
