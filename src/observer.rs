//! Progress reporting for grid runs
//!
//! The grid calls an [`ExperimentObserver`] at fixed points; observers only
//! format and forward, they never influence the results.
//!
//! ```text
//! on_grid_start
//!   on_configuration_start(60, 10)
//!     on_sample("LLL", 0x1337, root metrics)      x samples x variants
//!     on_average("LLL", mean root metrics)        x variants
//!   on_configuration_end(60, 10)
//!   ...
//! on_grid_end(table)
//! ```

use std::sync::Mutex;

use crate::config::RunParams;
use crate::experiment::ResultsTable;
use crate::trace::Metrics;

/// Receives grid progress. All hooks except the per-result ones default to
/// no-ops.
pub trait ExperimentObserver: Send + Sync {
    /// The grid is about to run with `params`.
    fn on_grid_start(&self, _params: &RunParams) {}

    /// A `(dimension, block_size)` configuration is starting.
    fn on_configuration_start(&self, _dimension: usize, _block_size: usize) {}

    /// One run finished; `metrics` are the root metrics of its trace.
    fn on_sample(&self, variant: &str, seed: u64, metrics: &Metrics);

    /// Mean root metrics of `variant` for the current configuration.
    fn on_average(&self, variant: &str, metrics: &Metrics);

    /// A configuration finished, averages included.
    fn on_configuration_end(&self, _dimension: usize, _block_size: usize) {}

    /// The grid finished.
    fn on_grid_end(&self, _table: &ResultsTable) {}
}

/// `<variant> 0x<seed> <metrics>` with the variant right-aligned to 16.
#[must_use]
pub fn format_sample(variant: &str, seed: u64, metrics: &Metrics) -> String {
    format!("{variant:>16} 0x{seed:08x} {}", metrics.pretty())
}

/// `<variant>    average <metrics>`, aligned with [`format_sample`].
#[must_use]
pub fn format_average(variant: &str, metrics: &Metrics) -> String {
    format!("{variant:>16}    average {}", metrics.pretty())
}

/// Header line of a configuration.
#[must_use]
pub fn format_configuration(dimension: usize, block_size: usize) -> String {
    format!("dimension: {dimension:3}, block_size: {block_size:2}")
}

/// Logs progress through `tracing` at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    /// Create a tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExperimentObserver for TracingObserver {
    fn on_grid_start(&self, params: &RunParams) {
        tracing::debug!(
            seed = params.seed,
            threads = params.threads,
            samples = params.samples,
            tours = params.tours,
            "starting grid"
        );
    }

    fn on_configuration_start(&self, dimension: usize, block_size: usize) {
        tracing::info!("{}", format_configuration(dimension, block_size));
    }

    fn on_sample(&self, variant: &str, seed: u64, metrics: &Metrics) {
        tracing::info!("{}", format_sample(variant, seed, metrics));
    }

    fn on_average(&self, variant: &str, metrics: &Metrics) {
        tracing::info!("{}", format_average(variant, metrics));
    }

    fn on_configuration_end(&self, _dimension: usize, _block_size: usize) {
        tracing::info!("");
    }

    fn on_grid_end(&self, table: &ResultsTable) {
        tracing::debug!(samples = table.sample_count(), "grid complete");
    }
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ExperimentObserver for NullObserver {
    fn on_sample(&self, _variant: &str, _seed: u64, _metrics: &Metrics) {}

    fn on_average(&self, _variant: &str, _metrics: &Metrics) {}
}

/// Collects the formatted lines in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    lines: Mutex<Vec<String>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl ExperimentObserver for RecordingObserver {
    fn on_configuration_start(&self, dimension: usize, block_size: usize) {
        self.push(format_configuration(dimension, block_size));
    }

    fn on_sample(&self, variant: &str, seed: u64, metrics: &Metrics) {
        self.push(format_sample(variant, seed, metrics));
    }

    fn on_average(&self, variant: &str, metrics: &Metrics) {
        self.push(format_average(variant, metrics));
    }
}
