//! Experiment Grid - drives every `(dimension, block_size)` configuration
//!
//! For each configuration with `block_size <= dimension`:
//!
//! 1. generate `samples` instances with seeds `seed, seed + 1, ...`
//! 2. schedule one run per `(instance, variant)`, instance-major
//! 3. record every outcome under its variant, in seed order
//! 4. average root metrics per variant and report them
//!
//! Configurations run one after another; only the runs inside a
//! configuration are concurrent.

use std::sync::Arc;

use super::aggregate::AggregateStats;
use super::results::{ResultsTable, Sample};
use crate::config::RunParams;
use crate::executor::{RunTask, WorkerPool};
use crate::matrix::{qary30, IntegerMatrix, MatrixFactory, MatrixParams};
use crate::observer::ExperimentObserver;
use crate::quality::{matrix_quality, QualityFn};
use crate::variant::RegisteredVariant;
use crate::{Error, Result};

/// A fully resolved experiment: what to run, on what, at which sizes.
#[derive(Clone)]
pub struct ExperimentGrid {
    variants: Vec<RegisteredVariant>,
    matrix_factory: MatrixFactory,
    dimensions: Vec<usize>,
    block_sizes: Vec<usize>,
    quality: QualityFn,
    record_timings: bool,
}

impl ExperimentGrid {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> ExperimentGridBuilder {
        ExperimentGridBuilder::new()
    }

    /// Variants in run order.
    #[must_use]
    pub fn variants(&self) -> &[RegisteredVariant] {
        &self.variants
    }

    /// Dimensions in run order.
    #[must_use]
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    /// Block sizes in run order.
    #[must_use]
    pub fn block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    /// The `(dimension, block_size)` pairs that will run.
    pub fn configurations(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.dimensions.iter().flat_map(move |&d| {
            self.block_sizes
                .iter()
                .filter(move |&&b| b <= d)
                .map(move |&b| (d, b))
        })
    }

    /// Generator parameters for one configuration.
    #[must_use]
    pub fn matrix_params(&self, dimension: usize, block_size: usize) -> MatrixParams {
        (self.matrix_factory)(dimension, block_size)
    }

    /// Tasks of one configuration, instance-major: for each seed, one task
    /// per variant, all sharing that seed's instance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the seed range overflows or the generator
    /// rejects its parameters.
    pub fn tasks(&self, dimension: usize, block_size: usize, params: &RunParams) -> Result<Vec<RunTask>> {
        let matrix_params = self.matrix_params(dimension, block_size);
        let mut tasks = Vec::with_capacity(params.samples * self.variants.len());

        for i in 0..params.samples as u64 {
            let seed = params.seed.checked_add(i).ok_or_else(|| {
                Error::InvalidInput(format!("seed range overflows at 0x{:x} + {i}", params.seed))
            })?;
            let matrix = Arc::new(IntegerMatrix::random(dimension, &matrix_params, seed)?);
            for variant in &self.variants {
                tasks.push(
                    RunTask::new(variant.clone(), Arc::clone(&matrix), block_size, params.tours, seed)
                        .quality(self.quality)
                        .record_timings(self.record_timings),
                );
            }
        }
        Ok(tasks)
    }

    /// Run the whole grid.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for bad `params`, and the first run failure of
    /// any configuration. Nothing is returned for a partially run grid.
    pub fn run(&self, params: &RunParams, observer: &dyn ExperimentObserver) -> Result<ResultsTable> {
        params.validate()?;
        let pool = WorkerPool::new(params.threads)?;
        observer.on_grid_start(params);

        let mut table = ResultsTable::new();
        for &dimension in &self.dimensions {
            table.insert_dimension(dimension);
            for &block_size in &self.block_sizes {
                if block_size > dimension {
                    tracing::debug!(dimension, block_size, "skipping block size above dimension");
                    continue;
                }
                self.run_configuration(&pool, params, dimension, block_size, &mut table, observer)?;
            }
        }

        observer.on_grid_end(&table);
        Ok(table)
    }

    fn run_configuration(
        &self,
        pool: &WorkerPool,
        params: &RunParams,
        dimension: usize,
        block_size: usize,
        table: &mut ResultsTable,
        observer: &dyn ExperimentObserver,
    ) -> Result<Vec<AggregateStats>> {
        observer.on_configuration_start(dimension, block_size);
        let tasks = self.tasks(dimension, block_size, params)?;
        for variant in &self.variants {
            table.insert_variant(dimension, block_size, variant.name());
        }

        let executed = pool.execute_with(tasks, |outcome| {
            observer.on_sample(outcome.variant(), outcome.seed(), outcome.trace().data());
        });
        let (outcomes, stats) = match executed {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(dimension, block_size, error = %e, "configuration aborted");
                return Err(e);
            }
        };
        tracing::debug!(
            dimension,
            block_size,
            tasks = stats.tasks,
            barriers = stats.barriers,
            peak = stats.peak_concurrency,
            "configuration complete"
        );

        for outcome in outcomes {
            let (variant, seed, trace) = outcome.into_parts();
            table.push(dimension, block_size, &variant, Sample::new(seed, trace));
        }

        let averages = table.averages(dimension, block_size)?;
        for stats in &averages {
            observer.on_average(stats.variant(), stats.means());
        }
        observer.on_configuration_end(dimension, block_size);
        Ok(averages)
    }
}

impl std::fmt::Debug for ExperimentGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentGrid")
            .field("variants", &self.variants)
            .field("dimensions", &self.dimensions)
            .field("block_sizes", &self.block_sizes)
            .field("record_timings", &self.record_timings)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExperimentGrid`].
///
/// ```rust
/// use bkz_compare::experiment::ExperimentGrid;
/// use bkz_compare::matrix::MatrixParams;
/// use bkz_compare::registry::VariantRegistry;
///
/// let registry = VariantRegistry::with_builtins();
/// let grid = ExperimentGrid::builder()
///     .variants(registry.resolve(&["LLL", "LLL75"])?)
///     .matrix_factory(|d, _| MatrixParams::Qary { k: d / 2, bits: 10 })
///     .dimensions([10, 20])
///     .block_sizes([10, 15])
///     .build()?;
/// assert_eq!(grid.configurations().collect::<Vec<_>>(), vec![(10, 10), (20, 10), (20, 15)]);
/// # Ok::<(), bkz_compare::Error>(())
/// ```
pub struct ExperimentGridBuilder {
    variants: Vec<RegisteredVariant>,
    matrix_factory: Option<MatrixFactory>,
    dimensions: Vec<usize>,
    block_sizes: Vec<usize>,
    quality: QualityFn,
    record_timings: bool,
}

impl Default for ExperimentGridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentGridBuilder {
    /// Create a builder with the default quality function and timings on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variants: Vec::new(),
            matrix_factory: None,
            dimensions: Vec::new(),
            block_sizes: Vec::new(),
            quality: matrix_quality,
            record_timings: true,
        }
    }

    /// Set the variants (replaces any previously set).
    #[must_use]
    pub fn variants(mut self, variants: Vec<RegisteredVariant>) -> Self {
        self.variants = variants;
        self
    }

    /// Append one variant.
    #[must_use]
    pub fn variant(mut self, variant: RegisteredVariant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Set the instance generator. Defaults to [`qary30`].
    #[must_use]
    pub fn matrix_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(usize, usize) -> MatrixParams + Send + Sync + 'static,
    {
        self.matrix_factory = Some(Arc::new(factory));
        self
    }

    /// Set the dimensions, in run order.
    #[must_use]
    pub fn dimensions(mut self, dimensions: impl IntoIterator<Item = usize>) -> Self {
        self.dimensions = dimensions.into_iter().collect();
        self
    }

    /// Set the block sizes, in run order.
    #[must_use]
    pub fn block_sizes(mut self, block_sizes: impl IntoIterator<Item = usize>) -> Self {
        self.block_sizes = block_sizes.into_iter().collect();
        self
    }

    /// Set the quality function applied after every tour.
    #[must_use]
    pub fn quality(mut self, quality: QualityFn) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable wall-clock metrics. With timings off, equal inputs
    /// give equal traces.
    #[must_use]
    pub const fn record_timings(mut self, record_timings: bool) -> Self {
        self.record_timings = record_timings;
        self
    }

    /// Build the grid.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if there are no variants, dimensions or block
    /// sizes, if any of them is zero or listed twice, or if two variants
    /// share a name.
    pub fn build(self) -> Result<ExperimentGrid> {
        if self.variants.is_empty() {
            return Err(Error::InvalidInput("at least one variant is required".to_string()));
        }
        check_sizes("dimensions", &self.dimensions)?;
        check_sizes("block sizes", &self.block_sizes)?;
        for (i, variant) in self.variants.iter().enumerate() {
            if self.variants[..i].iter().any(|v| v.name() == variant.name()) {
                return Err(Error::InvalidInput(format!(
                    "variant '{}' listed twice",
                    variant.name()
                )));
            }
        }

        let matrix_factory: MatrixFactory = match self.matrix_factory {
            Some(factory) => factory,
            None => Arc::new(qary30),
        };
        Ok(ExperimentGrid {
            variants: self.variants,
            matrix_factory,
            dimensions: self.dimensions,
            block_sizes: self.block_sizes,
            quality: self.quality,
            record_timings: self.record_timings,
        })
    }
}

/// Sizes must be non-empty, positive and distinct; a repeated size would
/// merge two passes into one results entry.
pub(crate) fn check_sizes(what: &str, sizes: &[usize]) -> Result<()> {
    if sizes.is_empty() || sizes.contains(&0) {
        return Err(Error::InvalidInput(format!(
            "{what} must be non-empty and positive, got {sizes:?}"
        )));
    }
    for (i, size) in sizes.iter().enumerate() {
        if sizes[..i].contains(size) {
            return Err(Error::InvalidInput(format!("{size} appears twice in {what}: {sizes:?}")));
        }
    }
    Ok(())
}
