use coda_perm::composition::{clr, multiplicative_replacement};
use coda_perm::data::{Categories, Composition};
use coda_perm::engine::{AcceleratedEngine, NaiveEngine, Statistic, StatisticEngine, VectorizedEngine};
use coda_perm::permutation::{categorical_permutations, reciprocal_permutations};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_matrix(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    DMatrix::from_fn(rows, cols, |_, _| rng.gen::<f64>())
}

fn two_groups(n: usize) -> Categories {
    let labels: Vec<usize> = (0..n).map(|j| j % 2).collect();
    Categories::new(&labels).unwrap()
}

fn bench_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("mean_200x40_p1000");

    let x = random_matrix(200, 40, 42);
    let perms = reciprocal_permutations(&two_groups(40), 1000, 42).unwrap();

    group.bench_function("naive", |b| {
        b.iter(|| NaiveEngine.permutation_statistics(black_box(&x), &perms, Statistic::Mean))
    });
    group.bench_function("vectorized", |b| {
        b.iter(|| VectorizedEngine.permutation_statistics(black_box(&x), &perms, Statistic::Mean))
    });
    let accelerated = AcceleratedEngine::default();
    group.bench_function("accelerated_cpu", |b| {
        b.iter(|| accelerated.permutation_statistics(black_box(&x), &perms, Statistic::Mean))
    });

    group.finish();
}

fn bench_t(c: &mut Criterion) {
    let mut group = c.benchmark_group("t_200x40_p1000");

    let x = random_matrix(200, 40, 7);
    let perms = categorical_permutations(&two_groups(40), 1000, 7).unwrap();

    group.bench_function("vectorized", |b| {
        b.iter(|| VectorizedEngine.permutation_statistics(black_box(&x), &perms, Statistic::T))
    });
    let accelerated = AcceleratedEngine::default();
    group.bench_function("accelerated_cpu", |b| {
        b.iter(|| accelerated.permutation_statistics(black_box(&x), &perms, Statistic::T))
    });

    group.finish();
}

fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("transforms");

    let raw = random_matrix(1_000, 50, 3).map(|v| if v < 0.1 { 0.0 } else { v });
    let data = Composition::from_matrix(raw).unwrap();

    group.bench_function("replacement_then_clr_1k_x50", |b| {
        b.iter(|| {
            let replaced = multiplicative_replacement(black_box(&data), None).unwrap();
            clr(&replaced).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_mean, bench_t, bench_transforms);
criterion_main!(benches);
