use genomeshader_core::geometry::Size;
use genomeshader_core::{Axis, Browser, BrowserEvent, Frame, GenomicWindow, RedrawOutcome, RenderConfig, Variant, VariantId};
use genomeshader_gpu::vector_export::{ExportConfig, VectorExporter};

fn demo_variants() -> Vec<Variant> {
    vec![
        Variant::new(1, 1100, "A", &["G"])
            .with_genotype("s1", "0|1")
            .with_genotype("s2", "1|1")
            .with_genotype("s3", "0|0"),
        Variant::new(2, 1250, "T", &["TAAAAAAAAAAAAAAAAAAA"])
            .with_genotype("s1", "1|0")
            .with_genotype("s2", "0|1")
            .with_genotype("s3", "0|0"),
        Variant::new(3, 1600, "C", &["T", "G"])
            .with_genotype("s1", "1|2")
            .with_genotype("s2", "0|1")
            .with_genotype("s3", "2|0"),
    ]
}

fn frame(axis: Axis) -> Frame {
    let mut browser = Browser::new(
        RenderConfig::default(),
        GenomicWindow::new(1000, 2000),
        Size::new(800.0, 300.0),
    )
    .with_variants(demo_variants(), None);
    browser.post(BrowserEvent::SetAxis(axis));
    browser.post(BrowserEvent::ToggleInsertion(VariantId(2)));
    match browser.redraw() {
        RedrawOutcome::Drawn(frame) => frame,
        other => panic!("expected a frame, got {:?}", other),
    }
}

fn exporter() -> VectorExporter {
    let cfg = ExportConfig {
        show_footer: false, // footer carries a timestamp
        title: Some("Determinism Test".into()),
        provenance_comment: Some("genomeshader test".into()),
        ..ExportConfig::default()
    };
    VectorExporter::new(cfg, RenderConfig::default().palette)
}

#[test]
fn svg_export_is_deterministic() {
    let exporter = exporter();
    let dir = tempfile::tempdir().unwrap();
    let f1 = dir.path().join("a.svg");
    let f2 = dir.path().join("b.svg");

    exporter.export_svg(&f1, &frame(Axis::Horizontal)).unwrap();
    exporter.export_svg(&f2, &frame(Axis::Horizontal)).unwrap();

    let b1 = std::fs::read(&f1).unwrap();
    let b2 = std::fs::read(&f2).unwrap();
    assert_eq!(b1, b2, "SVG bytes differ between identical renders");
}

#[test]
fn svg_contains_every_primitive() {
    let frame = frame(Axis::Horizontal);
    let svg = exporter().render_svg_string(&frame).unwrap();

    assert!(svg.starts_with("<?xml"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains("<!-- genomeshader test -->"));
    assert!(svg.contains("Determinism Test"));
    // One path per ribbon that survived tessellation.
    assert_eq!(svg.matches("<path ").count(), frame.ribbons.len());
    // Scale bar line and its label.
    assert!(svg.contains("<line "));
    assert!(svg.contains(" bp</text>"));
    // Legend entries.
    assert!(svg.contains(">ref</text>"));
    assert!(svg.contains(">alt2</text>"));
}

#[test]
fn vertical_axis_renders_too() {
    let frame = frame(Axis::Vertical);
    assert_eq!(frame.axis, Axis::Vertical);
    let svg = exporter().render_svg_string(&frame).unwrap();
    assert!(svg.contains(r#"viewBox="0 0 800 300""#));
    assert!(svg.matches("<path ").count() > 0);
}
