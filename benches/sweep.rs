use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use nli_probe::data::{Dataset, SplitData};
use nli_probe::training::{HyperparameterSweep, LogisticRegression, Penalty};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const N_CLASSES: usize = 5;

fn create_embeddings(n_rows: usize, dim: usize, seed: u64) -> (Array2<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels: Vec<String> = (0..n_rows).map(|i| format!("lang_{}", i % N_CLASSES)).collect();
    let x = Array2::from_shape_fn((n_rows, dim), |(i, j)| {
        let signal = if j % N_CLASSES == i % N_CLASSES { 1.0 } else { 0.0 };
        signal + rng.gen::<f64>() - 0.5
    });
    (x, labels)
}

fn create_dataset(n_rows: usize, dim: usize) -> Dataset {
    let split = |seed| {
        let (x, y) = create_embeddings(n_rows, dim, seed);
        SplitData::new(x, y).unwrap()
    };
    Dataset::new(split(1), split(2), split(3)).unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let (x, y) = create_embeddings(*n_rows, 64, 7);
        group.bench_with_input(BenchmarkId::new("l2", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| LogisticRegression::new(1.0).fit(black_box(x), black_box(y)).unwrap())
        });
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(10);

    let dataset = create_dataset(500, 64);
    let strengths = vec![0.01, 0.1, 1.0, 10.0, 100.0];
    for n_jobs in [1usize, 0].iter() {
        let sweep = HyperparameterSweep::new(strengths.clone(), Penalty::L2).with_n_jobs(*n_jobs);
        group.bench_with_input(BenchmarkId::new("n_jobs", n_jobs), &dataset, |b, dataset| {
            b.iter(|| sweep.run(black_box(dataset)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_sweep);
criterion_main!(benches);
