//! # Track Extractor Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use car_lib::sim_cam;
use car_lib::vision::{EdgeScanMode, Params, ThresholdMode, TrackVision, VisionInputData};
use util::module::State;

fn extract_benchmark(c: &mut Criterion) {
    // ---- Build a representative frame ----

    let frame = sim_cam::intersection_frame(94, 120, 20..50);

    // Bench the production gradient scan with the fixed threshold
    let mut vision = TrackVision::with_params(Params::default());
    let input = VisionInputData {
        frame: frame.clone(),
    };
    c.bench_function("TrackVision::proc::gradient_fixed", |b| {
        b.iter(|| vision.proc(&input).unwrap())
    });

    // Bench the Otsu threshold with the same scan
    let mut vision = TrackVision::with_params(Params {
        threshold_mode: ThresholdMode::Otsu,
        ..Default::default()
    });
    c.bench_function("TrackVision::proc::gradient_otsu", |b| {
        b.iter(|| vision.proc(&input).unwrap())
    });

    // Bench the column scan variant
    let mut vision = TrackVision::with_params(Params {
        edge_scan_mode: EdgeScanMode::ColumnScan,
        ..Default::default()
    });
    c.bench_function("TrackVision::proc::column_scan", |b| {
        b.iter(|| vision.proc(&input).unwrap())
    });

    // Bench the adaptive threshold, the heaviest strategy
    let mut vision = TrackVision::with_params(Params {
        threshold_mode: ThresholdMode::Adaptive,
        ..Default::default()
    });
    c.bench_function("TrackVision::proc::adaptive", |b| {
        b.iter(|| vision.proc(&input).unwrap())
    });
}

criterion_group!(benches, extract_benchmark);
criterion_main!(benches);
