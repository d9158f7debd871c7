//! Benchmarks for Hrimfaxi waveform operations
//!
//! Run with: cargo bench -p hrimfaxi-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use hrimfaxi_ir::{Assignments, Scalar, Waveform};

/// Benchmark building long piecewise-linear chains
fn bench_piecewise_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("piecewise_construction");

    for num_segments in &[4usize, 16, 64, 256] {
        group.bench_with_input(
            BenchmarkId::new("piecewise_linear", num_segments),
            num_segments,
            |b, &n| {
                let durations: Vec<Scalar> = (0..n).map(|_| Scalar::literal(0.1)).collect();
                let values: Vec<Scalar> = (0..=n).map(|i| Scalar::literal(i as f64)).collect();
                b.iter(|| {
                    Waveform::piecewise_linear(black_box(durations.clone()), black_box(values.clone()))
                });
            },
        );
    }

    group.finish();
}

/// Benchmark evaluating a waveform tree at a clock time
fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    let durations: Vec<Scalar> = (0..64).map(|_| Scalar::literal(0.1)).collect();
    let values: Vec<Scalar> = (0..=64).map(|i| Scalar::literal(i as f64)).collect();
    let waveform = Waveform::piecewise_linear(durations, values);
    let assignments = Assignments::default();

    group.bench_function("at_mid_chain", |b| {
        b.iter(|| waveform.at(black_box(3.2), black_box(&assignments)).unwrap());
    });

    group.bench_function("duration_fold", |b| {
        b.iter(|| waveform.duration().simplify());
    });

    group.finish();
}

criterion_group!(benches, bench_piecewise_construction, bench_evaluation);
criterion_main!(benches);
