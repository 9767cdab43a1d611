//! Benchmarks for distance computations.
//!
//! These benchmarks measure the distance kernels that dominate both
//! k-means training and bulk partition assignment.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessella::distance::{cosine_distance, dot_distance, l2_distance_squared, DistanceType};
use tessella::partitioning::{BulkDistanceComputer, InProcessComputer};

// === Generators ===

fn random_flat(n: usize, dim: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n * dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect()
}

// === Benchmarks ===

fn bench_l2_dimensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("l2_squared");

    for dim in [64, 128, 256, 384, 768, 1536].iter() {
        group.throughput(Throughput::Elements(*dim as u64));

        let vectors = random_flat(2, *dim);
        let (a, b) = vectors.split_at(*dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |bench, _| {
            bench.iter(|| l2_distance_squared(black_box(a), black_box(b)));
        });
    }

    group.finish();
}

fn bench_cosine_dimensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_distance");

    for dim in [64, 128, 256, 384, 768, 1536].iter() {
        group.throughput(Throughput::Elements(*dim as u64));

        let vectors = random_flat(2, *dim);
        let (a, b) = vectors.split_at(*dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |bench, _| {
            bench.iter(|| cosine_distance(black_box(a), black_box(b)));
        });
    }

    group.finish();
}

fn bench_dot_dimensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot_distance");

    for dim in [64, 128, 256, 384, 768, 1536].iter() {
        group.throughput(Throughput::Elements(*dim as u64));

        let vectors = random_flat(2, *dim);
        let (a, b) = vectors.split_at(*dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |bench, _| {
            bench.iter(|| dot_distance(black_box(a), black_box(b)));
        });
    }

    group.finish();
}

fn bench_bulk_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_assignment");

    let dim = 128;
    let num_vectors = 1000;
    let vectors = random_flat(num_vectors, dim);

    for num_centroids in [16, 64, 256].iter() {
        group.throughput(Throughput::Elements(num_vectors as u64));

        let centroids = random_flat(*num_centroids, dim);

        group.bench_with_input(
            BenchmarkId::from_parameter(num_centroids),
            num_centroids,
            |bench, _| {
                bench.iter(|| {
                    InProcessComputer
                        .assign(
                            black_box(&vectors),
                            black_box(&centroids),
                            dim,
                            DistanceType::L2,
                        )
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_l2_dimensions,
    bench_cosine_dimensions,
    bench_dot_dimensions,
    bench_bulk_assignment,
);
criterion_main!(benches);
