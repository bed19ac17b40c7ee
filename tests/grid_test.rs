//! Experiment grid integration tests
//!
//! Scenarios run end to end: registry -> grid -> executor -> results table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bkz_compare::config::RunParams;
use bkz_compare::experiment::ExperimentGrid;
use bkz_compare::matrix::{IntegerMatrix, MatrixParams};
use bkz_compare::observer::{NullObserver, RecordingObserver};
use bkz_compare::registry::{VariantRegistry, VariantSet};
use bkz_compare::trace::{Tracer, WALLTIME};
use bkz_compare::variant::{ReductionVariant, RegisteredVariant, TOUR};
use bkz_compare::{Error, Result};

// ============================================================================
// Helpers
// ============================================================================

/// Leaves the basis alone and counts its tours.
struct Idle {
    basis: IntegerMatrix,
}

impl ReductionVariant for Idle {
    fn tour(&mut self, _block_size: usize, tracer: &mut Tracer) -> Result<()> {
        tracer.increment("tours", 1.0);
        Ok(())
    }

    fn basis(&self) -> &IntegerMatrix {
        &self.basis
    }
}

fn idle(name: &str) -> RegisteredVariant {
    RegisteredVariant::from_fn(name, |basis| Ok(Box::new(Idle { basis })))
}

fn small_qary(d: usize, _b: usize) -> MatrixParams {
    MatrixParams::Qary { k: d / 2, bits: 12 }
}

fn lll_grid(dimensions: &[usize], block_sizes: &[usize]) -> ExperimentGrid {
    let registry = VariantRegistry::with_builtins();
    ExperimentGrid::builder()
        .variants(registry.resolve(&["LLL", "LLL75"]).unwrap())
        .matrix_factory(small_qary)
        .dimensions(dimensions.iter().copied())
        .block_sizes(block_sizes.iter().copied())
        .record_timings(false)
        .build()
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_configuration_two_samples() {
    let grid = ExperimentGrid::builder()
        .variant(idle("A"))
        .dimensions([80])
        .block_sizes([20])
        .build()
        .unwrap();
    let params = RunParams {
        seed: 100,
        threads: 1,
        samples: 2,
        tours: 1,
    };

    let table = grid.run(&params, &NullObserver).unwrap();
    let samples = table.get(80, 20, "A").unwrap();

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].seed(), 100);
    assert_eq!(samples[1].seed(), 101);
    for sample in samples {
        let root = sample.trace();
        assert_eq!(root.label(), "A");
        for key in ["rhf", "ghr", "hvr"] {
            assert!(root.data().contains_key(key), "missing {key}");
        }
        assert!(root.data().contains_key(WALLTIME));
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.find(TOUR, Some(0)).unwrap().data().get("tours"), Some(1.0));
    }
}

#[test]
fn test_block_size_above_dimension_is_skipped() {
    let grid = ExperimentGrid::builder()
        .variant(idle("A"))
        .matrix_factory(small_qary)
        .dimensions([60])
        .block_sizes([80])
        .build()
        .unwrap();

    let table = grid.run(&RunParams::default(), &NullObserver).unwrap();
    let dimension = table.dimension(60).unwrap();
    assert!(dimension.block_sizes().is_empty());
    assert!(table.get(60, 80, "A").is_none());
    assert_eq!(table.sample_count(), 0);
}

#[test]
fn test_unknown_variant_fails_before_scheduling() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let mut registry = VariantRegistry::with_builtins();
    registry.load(&VariantSet::new("extra").with(RegisteredVariant::from_fn(
        "Counted",
        move |basis| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Idle { basis }) as Box<dyn ReductionVariant>)
        },
    )));

    let err = registry.resolve(&["Counted", "BKZ2"]).unwrap_err();
    match err {
        Error::VariantNotFound { name, searched } => {
            assert_eq!(name, "BKZ2");
            assert_eq!(searched, vec!["builtin", "extra"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Seeds and determinism
// ============================================================================

#[test]
fn test_seeds_restart_per_configuration() {
    let grid = ExperimentGrid::builder()
        .variants(vec![idle("A"), idle("B")])
        .matrix_factory(small_qary)
        .dimensions([10, 12])
        .block_sizes([4, 8])
        .build()
        .unwrap();
    let params = RunParams {
        seed: 7,
        threads: 3,
        samples: 3,
        tours: 1,
    };

    let table = grid.run(&params, &NullObserver).unwrap();
    for (d, b) in grid.configurations() {
        for variant in ["A", "B"] {
            let seeds: Vec<u64> = table.get(d, b, variant).unwrap().iter().map(|s| s.seed()).collect();
            assert_eq!(seeds, vec![7, 8, 9], "({d}, {b}, {variant})");
        }
    }
}

#[test]
fn test_thread_count_does_not_change_results() {
    let grid = lll_grid(&[12, 16], &[4, 8]);
    let base = RunParams {
        seed: 0x1337,
        threads: 1,
        samples: 3,
        tours: 2,
    };

    let sequential = grid.run(&base, &NullObserver).unwrap();
    for threads in [2, 4, 7] {
        let pooled = grid.run(&RunParams { threads, ..base }, &NullObserver).unwrap();
        assert_eq!(sequential.dimensions(), pooled.dimensions(), "threads = {threads}");
    }
}

#[test]
fn test_variants_share_instances() {
    let grid = ExperimentGrid::builder()
        .variants(vec![idle("A"), idle("B")])
        .matrix_factory(small_qary)
        .dimensions([10])
        .block_sizes([5])
        .record_timings(false)
        .build()
        .unwrap();

    let table = grid.run(&RunParams { samples: 2, ..RunParams::default() }, &NullObserver).unwrap();
    let a = table.get(10, 5, "A").unwrap();
    let b = table.get(10, 5, "B").unwrap();
    for (x, y) in a.iter().zip(b) {
        assert_eq!(x.seed(), y.seed());
        assert_eq!(x.trace().data(), y.trace().data());
    }
}

// ============================================================================
// Reporting and averages
// ============================================================================

#[test]
fn test_observer_sees_samples_then_averages() {
    let grid = lll_grid(&[12], &[6]);
    let observer = RecordingObserver::new();
    let params = RunParams {
        threads: 2,
        samples: 2,
        ..RunParams::default()
    };

    grid.run(&params, &observer).unwrap();
    let lines = observer.lines();

    // header, 2 samples x 2 variants, 2 averages
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("dimension:  12"));
    assert!(lines[1].contains("LLL 0x00001337"));
    assert!(lines[2].contains("LLL75 0x00001337"));
    assert!(lines[3].contains("LLL 0x00001338"));
    assert!(lines[5].contains("LLL    average"));
    assert!(lines[6].contains("LLL75    average"));
}

#[test]
fn test_averages_are_means_of_root_metrics() {
    let grid = lll_grid(&[14], &[7]);
    let params = RunParams {
        samples: 4,
        ..RunParams::default()
    };
    let table = grid.run(&params, &NullObserver).unwrap();

    let averages = table.averages(14, 7).unwrap();
    assert_eq!(averages.len(), 2);
    for stats in &averages {
        let samples = table.get(14, 7, stats.variant()).unwrap();
        assert_eq!(stats.samples(), 4);
        for (key, mean) in stats.means().iter() {
            let expected: f64 =
                samples.iter().map(|s| s.trace().data().get(key).unwrap()).sum::<f64>() / 4.0;
            assert!((mean - expected).abs() < 1e-12, "{key}: {mean} vs {expected}");
        }
    }
}

#[test]
fn test_lll_improves_on_input_quality() {
    let grid = lll_grid(&[20], &[10]);
    let table = grid.run(&RunParams { samples: 2, ..RunParams::default() }, &NullObserver).unwrap();

    for sample in table.get(20, 10, "LLL").unwrap() {
        let input = IntegerMatrix::random(20, &small_qary(20, 10), sample.seed()).unwrap();
        let before = bkz_compare::quality::matrix_quality(&input).unwrap().get("rhf").unwrap();
        let after = sample.trace().data().get("rhf").unwrap();
        assert!(after < before, "seed {}: {after} >= {before}", sample.seed());
    }
}

#[test]
fn test_default_instances_reduce_with_lll() {
    let grid = ExperimentGrid::builder()
        .variants(VariantRegistry::with_builtins().resolve(&["LLL"]).unwrap())
        .dimensions([60])
        .block_sizes([10])
        .record_timings(false)
        .build()
        .unwrap();
    let params = RunParams { samples: 1, threads: 1, ..RunParams::default() };

    let table = grid.run(&params, &NullObserver).unwrap();
    let samples = table.get(60, 10, "LLL").unwrap();
    assert_eq!(samples.len(), 1);
    assert!(samples[0].trace().data().get("swaps").unwrap() > 0.0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_run_failure_aborts_grid() {
    let broken = RegisteredVariant::from_fn("Broken", |_| {
        Err(Error::Other("unsupported basis".to_string()))
    });
    let grid = ExperimentGrid::builder()
        .variants(vec![idle("A"), broken])
        .matrix_factory(small_qary)
        .dimensions([10])
        .block_sizes([5])
        .build()
        .unwrap();
    let observer = RecordingObserver::new();

    let err = grid
        .run(&RunParams { threads: 2, ..RunParams::default() }, &observer)
        .unwrap_err();
    match err {
        Error::RunFailed { variant, seed, message } => {
            assert_eq!(variant, "Broken");
            assert_eq!(seed, 0x1337);
            assert!(message.contains("unsupported basis"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!observer.lines().iter().any(|l| l.contains("average")));
}

#[test]
fn test_zero_samples_rejected() {
    let grid = lll_grid(&[10], &[5]);
    let err = grid
        .run(&RunParams { samples: 0, ..RunParams::default() }, &NullObserver)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
