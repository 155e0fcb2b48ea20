//! Benchmarks for dataset composition and scenario construction.
//!
//! Run with: cargo bench --bench dataset_access

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use avl::all::*;

/// Create a synthetic feature dataset for benchmarking.
fn create_synthetic_data(n_samples: usize, n_features: usize, n_classes: usize) -> ArraySource {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let x_data: Vec<f32> = (0..n_samples * n_features).map(|_| rng.gen()).collect();
    let y_data: Vec<i64> = (0..n_samples).map(|i| (i % n_classes) as i64).collect();

    let x = Array2::from_shape_vec((n_samples, n_features), x_data).unwrap();
    ArraySource::from_arrays(x, y_data).unwrap()
}

fn bench_nested_subset_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_subset_access");

    let base = ClassificationDataset::from_source(create_synthetic_data(10_000, 16, 10)).unwrap();

    for depth in [1usize, 4, 16].iter() {
        let mut view = base.clone();
        for level in 0..*depth {
            let len = view.len();
            let indices: Vec<usize> = (0..len - 1).rev().chain([level % len]).collect();
            view = view.subset(Some(indices)).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("get", depth), depth, |b, _| {
            b.iter(|| {
                for i in (0..view.len()).step_by(97) {
                    black_box(view.get(i).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn bench_concat_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("concat_access");

    for n_parts in [2usize, 8, 32].iter() {
        let parts: Vec<_> = (0..*n_parts)
            .map(|_| ClassificationDataset::from_source(create_synthetic_data(500, 16, 10)).unwrap())
            .collect();
        let all = ClassificationDataset::concat(parts).unwrap();

        group.bench_with_input(BenchmarkId::new("get", n_parts), n_parts, |b, _| {
            b.iter(|| {
                for i in (0..all.len()).step_by(31) {
                    black_box(all.get(i).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn bench_loader_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("loader_epoch");

    for n_samples in [1_000usize, 5_000].iter() {
        let data =
            ClassificationDataset::from_source(create_synthetic_data(*n_samples, 16, 10)).unwrap();
        let loader = DataLoader::builder(data)
            .batch_size(64)
            .shuffle(true)
            .seed(Seed::new(0))
            .build()
            .unwrap();

        group.bench_with_input(BenchmarkId::new("batches", n_samples), n_samples, |b, _| {
            b.iter(|| {
                let mut count = 0;
                for batch in loader.iter_epoch(1) {
                    let batch = batch.unwrap();
                    count += batch.len();
                }
                black_box(count)
            })
        });
    }

    group.finish();
}

fn bench_nc_scenario(c: &mut Criterion) {
    let mut group = c.benchmark_group("nc_scenario");
    group.sample_size(20);

    let train = ClassificationDataset::from_source(create_synthetic_data(20_000, 4, 100)).unwrap();
    let test = ClassificationDataset::from_source(create_synthetic_data(5_000, 4, 100)).unwrap();

    for n_experiences in [10usize, 50].iter() {
        let config = NCScenarioConfig::new(*n_experiences).with_seed(1);
        group.bench_with_input(
            BenchmarkId::new("build", n_experiences),
            n_experiences,
            |b, _| {
                b.iter(|| {
                    let scenario = NCScenario::new(train.clone(), test.clone(), &config).unwrap();
                    black_box(scenario.n_experiences())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_nested_subset_access,
    bench_concat_access,
    bench_loader_epoch,
    bench_nc_scenario,
);
criterion_main!(benches);
