use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Point2;
use vstab_core::Correspondence;
use vstab_stab::{MotionDelta, MotionEstimator, Trajectory};

fn bench_smooth(c: &mut Criterion) {
    let deltas: Vec<MotionDelta> = (0..10_000)
        .map(|i| {
            let jitter = if i % 2 == 0 { 1.5 } else { -1.5 };
            MotionDelta::new(1.0 + jitter, 0.3, 0.001)
        })
        .collect();
    let trajectory = Trajectory::accumulate(&deltas);

    c.bench_function("smooth_10k_radius_50", |b| {
        b.iter(|| black_box(&trajectory).smooth(50).unwrap())
    });
}

fn bench_estimate(c: &mut Criterion) {
    // 100 correspondences of a small rigid motion plus 10 outliers.
    let mut pairs: Vec<Correspondence> = (0..100)
        .map(|i| {
            let x = (i % 10) as f64 * 30.0;
            let y = (i / 10) as f64 * 25.0;
            Correspondence::new(Point2::new(x, y), Point2::new(x + 2.0, y - 1.0))
        })
        .collect();
    for i in 0..10 {
        let x = i as f64 * 17.0;
        pairs.push(Correspondence::new(
            Point2::new(x, x),
            Point2::new(x + 40.0, x - 35.0),
        ));
    }

    let estimator = MotionEstimator::new();
    c.bench_function("estimate_110_pairs", |b| {
        b.iter(|| estimator.estimate(black_box(&pairs)).unwrap())
    });
}

criterion_group!(benches, bench_smooth, bench_estimate);
criterion_main!(benches);
