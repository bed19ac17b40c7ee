//! Worker pool and grid benchmarks
//!
//! Toyota Way: Genchi Genbutsu (measure, don't guess)
//!
//! Measures how LLL runs scale with the thread count and what one
//! quality evaluation costs.
//!
//! Run with: cargo bench --bench executor

use std::sync::Arc;

use bkz_compare::config::RunParams;
use bkz_compare::executor::{RunTask, WorkerPool};
use bkz_compare::experiment::ExperimentGrid;
use bkz_compare::matrix::{IntegerMatrix, MatrixParams};
use bkz_compare::observer::NullObserver;
use bkz_compare::quality::matrix_quality;
use bkz_compare::registry::VariantRegistry;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const DIMENSION: usize = 24;
const TASKS: u64 = 16;

fn instance(seed: u64) -> IntegerMatrix {
    IntegerMatrix::random(DIMENSION, &MatrixParams::Qary { k: DIMENSION / 2, bits: 16 }, seed)
        .unwrap_or_else(|e| panic!("instance generation failed: {e}"))
}

/// Benchmark a fixed batch of LLL runs across thread counts
fn bench_pool_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_scaling");
    group.sample_size(10);

    let lll = VariantRegistry::with_builtins()
        .resolve(&["LLL"])
        .unwrap_or_else(|e| panic!("{e}"))
        .remove(0);
    let instances: Vec<Arc<IntegerMatrix>> = (0..TASKS).map(|s| Arc::new(instance(s))).collect();

    for threads in [1, 2, 4, 8] {
        let pool = WorkerPool::new(threads).unwrap_or_else(|e| panic!("{e}"));
        group.bench_with_input(BenchmarkId::new("lll", threads), &threads, |b, _| {
            b.iter(|| {
                let tasks: Vec<RunTask> = instances
                    .iter()
                    .enumerate()
                    .map(|(seed, m)| {
                        RunTask::new(lll.clone(), Arc::clone(m), 10, 1, seed as u64)
                            .record_timings(false)
                    })
                    .collect();
                black_box(pool.execute(tasks))
            });
        });
    }

    group.finish();
}

/// Benchmark a complete small grid (generation, runs, aggregation)
fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid");
    group.sample_size(10);

    let grid = ExperimentGrid::builder()
        .variants(
            VariantRegistry::with_builtins()
                .resolve(&["LLL", "LLL75"])
                .unwrap_or_else(|e| panic!("{e}")),
        )
        .matrix_factory(|d, _| MatrixParams::Qary { k: d / 2, bits: 16 })
        .dimensions([16, 24])
        .block_sizes([8, 16])
        .build()
        .unwrap_or_else(|e| panic!("{e}"));

    for threads in [1, 4] {
        let params = RunParams {
            threads,
            samples: 4,
            ..RunParams::default()
        };
        group.bench_with_input(BenchmarkId::new("run", threads), &params, |b, params| {
            b.iter(|| black_box(grid.run(params, &NullObserver)));
        });
    }

    group.finish();
}

/// Benchmark the default quality function on an unreduced instance
fn bench_quality(c: &mut Criterion) {
    let basis = instance(0x1337);
    c.bench_function("matrix_quality_24", |b| {
        b.iter(|| matrix_quality(black_box(&basis)));
    });
}

criterion_group!(benches, bench_pool_scaling, bench_grid, bench_quality);
criterion_main!(benches);
