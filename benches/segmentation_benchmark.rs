//! Segmentation and full-chain extraction benchmarks
//!
//! - `segment_concatenated`: splitting one run-together fitment string
//! - `extract_hawk_page`: the whole vendor chain on a Hawk product page
//! - `extract_generic_page`: the generic chain on an unrecognized page

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use fitment_engine_lib::application::{ExtractionOrchestrator, ExtractionSettings};
use fitment_engine_lib::domain::{SourceDocument, YearBounds};
use fitment_engine_lib::infrastructure::config::TuningConfig;
use fitment_engine_lib::infrastructure::{TextSegmenter, VendorRegistry};

const MAKES: &[(&str, &str)] = &[
    ("Honda", "Civic Si 2.0L Turbo"),
    ("Acura", "ILX 2.4L"),
    ("Subaru", "WRX STI 2.5L"),
    ("Ford", "Focus ST 2.0L"),
    ("Mazda", "MX-5 Club"),
];

fn concatenated_text(rows: usize) -> String {
    (0..rows)
        .map(|i| {
            let (make, model) = MAKES[i % MAKES.len()];
            format!("{} {make} {model}", 2000 + (i % 24))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_segmentation(c: &mut Criterion) {
    let segmenter = TextSegmenter::new(YearBounds::default(), &TuningConfig::default());
    let text = concatenated_text(40);

    c.bench_function("segment_concatenated", |b| {
        b.iter(|| segmenter.segment(black_box(&text)));
    });
}

fn bench_full_chain(c: &mut Criterion) {
    let registry = Arc::new(VendorRegistry::with_builtin_catalog().expect("builtin catalog"));
    let orchestrator =
        ExtractionOrchestrator::new(registry, ExtractionSettings::default(), &TuningConfig::default());

    let hawk = SourceDocument::new(
        "https://hawkperformance.com/hb-453f",
        format!(
            "<html><body><h1>HPS 5.0 Brake Pads</h1><div class=\"vehicle-applications\">{}</div></body></html>",
            concatenated_text(12)
        ),
    );
    let generic_rows: String = (0..30)
        .map(|i| {
            let (make, model) = MAKES[i % MAKES.len()];
            format!("<li>{}-{} {make} {model}</li>", 2000 + i % 10, 2003 + i % 10)
        })
        .collect();
    let generic = SourceDocument::new(
        "https://shop.example.com/p/1",
        format!("<html><body><ul class=\"fitment\">{generic_rows}</ul></body></html>"),
    );

    c.bench_function("extract_hawk_page", |b| {
        b.iter(|| orchestrator.extract(black_box("HB453F"), "Hawk Performance", std::slice::from_ref(&hawk)));
    });
    c.bench_function("extract_generic_page", |b| {
        b.iter(|| orchestrator.extract(black_box("P-1"), "Zzyzx", std::slice::from_ref(&generic)));
    });
}

criterion_group!(benches, bench_segmentation, bench_full_chain);
criterion_main!(benches);
