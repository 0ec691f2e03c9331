//! Benchmark one fusion cycle: scan index rebuild, correlation, tracking.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::{Duration, Instant};

use drishti::config::{CorrelationConfig, TrackerConfig};
use drishti::core::types::{DetectionFrame, DetectionObservation, Scan, ScanPoint};
use drishti::fusion::ScanIndex;
use drishti::threads::FusionService;

/// Front-hemisphere scan with `points_per_deg` returns per degree.
fn hemisphere_scan(points_per_deg: usize) -> Scan {
    let n = 180 * points_per_deg;
    let points = (0..=n)
        .map(|i| {
            let bearing = -90.0 + i as f64 / points_per_deg as f64;
            let distance = 1500.0 + 1000.0 * (bearing.to_radians() * 3.0).sin().abs();
            ScanPoint::new(bearing, distance)
        })
        .collect();
    Scan::new(points)
}

fn detection_frame(count: usize) -> DetectionFrame {
    let labels = ["person", "bicycle", "car", "dog"];
    let observations = (0..count)
        .map(|i| {
            let bearing = -80.0 + 160.0 * i as f64 / count.max(1) as f64;
            DetectionObservation::new(labels[i % labels.len()], 0.8, bearing, 5000.0)
        })
        .collect();
    DetectionFrame {
        timestamp: None,
        frame: None,
        observations,
    }
}

fn bench_scan_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_rebuild");
    for points_per_deg in [1, 2, 4] {
        let scan = hemisphere_scan(points_per_deg);
        let mut index = ScanIndex::default();
        group.bench_with_input(
            BenchmarkId::from_parameter(scan.len()),
            &scan,
            |b, scan| b.iter(|| black_box(index.rebuild(black_box(&scan.points)))),
        );
    }
    group.finish();
}

fn bench_fusion_cycle(c: &mut Criterion) {
    let scan = hemisphere_scan(2);
    let mut group = c.benchmark_group("fusion_cycle");

    for detections in [1, 8, 32] {
        let frame = detection_frame(detections);
        group.bench_with_input(
            BenchmarkId::from_parameter(detections),
            &frame,
            |b, frame| {
                let mut service =
                    FusionService::new(&CorrelationConfig::default(), TrackerConfig::default());
                let start = Instant::now();
                let mut tick = 0u64;
                b.iter(|| {
                    tick += 1;
                    let now = start + Duration::from_millis(tick * 100);
                    black_box(service.process_cycle(Some(&scan), Some(frame), now))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_scan_rebuild, bench_fusion_cycle);
criterion_main!(benches);
