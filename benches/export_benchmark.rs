//! Benchmarks for capture and pagination.
//!
//! Run with: cargo bench
//!
//! These benchmarks export synthetic resume layouts of increasing length.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reslice::{
    CaptureOptions, DocumentOptions, Element, ExportConfig, Exporter, ImageEncoding, LiveDom,
    Rasterizer, Rect, SoftwareRasterizer,
};

/// Creates a resume layout with `sections` blocks, each holding a heading
/// bar, a bordered card and a link.
fn create_test_layout(sections: usize) -> LiveDom {
    let height = 120.0 + sections as f64 * 160.0;
    let mut resume = Element::new("div", Rect::new(0.0, 0.0, 800.0, height))
        .with_id("resume-preview")
        .with_background("#ffffff")
        .with_child(
            Element::new("header", Rect::new(0.0, 0.0, 800.0, 100.0)).with_background("#1e3a8a"),
        );

    for i in 0..sections {
        let top = 120.0 + i as f64 * 160.0;
        resume = resume
            .with_child(
                Element::new("h3", Rect::new(40.0, top, 300.0, 24.0)).with_background("#e5e7eb"),
            )
            .with_child(
                Element::new("section", Rect::new(40.0, top + 32.0, 720.0, 110.0))
                    .with_background("#f9fafb")
                    .with_border(1.0, "#d1d5db"),
            )
            .with_child(Element::anchor(
                format!("https://example.com/project/{}", i),
                Rect::new(60.0, top + 120.0, 200.0, 14.0),
            ));
    }

    LiveDom::new(resume)
}

fn capture(scale: f32) -> CaptureOptions {
    CaptureOptions::new()
        .with_scale(scale)
        .with_settle_delay(Duration::ZERO)
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    let rasterizer = SoftwareRasterizer::new();

    for sections in [5, 20, 40] {
        let dom = create_test_layout(sections);
        let element = dom.find("resume-preview").unwrap().clone();
        let options = capture(2.0);
        group.bench_with_input(BenchmarkId::from_parameter(sections), &element, |b, element| {
            b.iter(|| rasterizer.rasterize(black_box(element), None, &options).unwrap())
        });
    }

    group.finish();
}

fn bench_export_pdf(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_pdf");
    group.sample_size(20);
    let exporter = Exporter::new();

    for sections in [5, 20, 40] {
        let config = ExportConfig::document(DocumentOptions::new()).with_capture(capture(2.0));
        group.bench_with_input(BenchmarkId::from_parameter(sections), &sections, |b, &n| {
            let mut dom = create_test_layout(n);
            b.iter(|| {
                exporter
                    .export(black_box(&mut dom), "resume-preview", &config)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_export_png(c: &mut Criterion) {
    let exporter = Exporter::new();
    let config = ExportConfig::image(ImageEncoding::Png).with_capture(capture(1.0));
    let mut dom = create_test_layout(20);

    c.bench_function("export_png_20", |b| {
        b.iter(|| {
            exporter
                .export(black_box(&mut dom), "resume-preview", &config)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_rasterize, bench_export_pdf, bench_export_png);
criterion_main!(benches);
