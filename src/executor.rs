//! Worker pool executor - bounded, chunked fan-out of reduction runs
//!
//! ## Scheduling
//!
//! ```text
//! tasks: [t0 t1 t2 t3 t4]   threads = 2
//!
//! chunk 0: start t0, t1 ─┐
//!                        ├─ barrier (wait for all)
//! chunk 1: start t2, t3 ─┘
//! chunk 2: start t4      ── barrier
//! ```
//!
//! Peak concurrency is `threads`; there are exactly `ceil(n / threads)`
//! barriers. Workers report on a crossbeam channel (many writers, one
//! reader) and the reader slots each result back into submission order.
//!
//! With `threads == 1` tasks run one after another on the calling thread:
//! no pool, no channel, same values.
//!
//! ## Failure
//!
//! A failed or panicked run aborts the grid after its chunk completes.
//! Nothing is retried: the runs are deterministic, so a failure is a bug.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::matrix::IntegerMatrix;
use crate::quality::{matrix_quality, QualityFn};
use crate::trace::TraceNode;
use crate::variant::{run_variant, RegisteredVariant};
use crate::{Error, Result};

/// One scheduled reduction run.
#[derive(Debug, Clone)]
pub struct RunTask {
    variant: RegisteredVariant,
    matrix: Arc<IntegerMatrix>,
    block_size: usize,
    tours: usize,
    seed: u64,
    quality: QualityFn,
    record_timings: bool,
}

impl RunTask {
    /// Create a task. The run works on its own clone of `matrix`.
    #[must_use]
    pub fn new(
        variant: RegisteredVariant,
        matrix: Arc<IntegerMatrix>,
        block_size: usize,
        tours: usize,
        seed: u64,
    ) -> Self {
        Self {
            variant,
            matrix,
            block_size,
            tours,
            seed,
            quality: matrix_quality,
            record_timings: true,
        }
    }

    /// Use `quality` instead of [`matrix_quality`].
    #[must_use]
    pub fn quality(mut self, quality: QualityFn) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable wall-clock metrics in the trace.
    #[must_use]
    pub const fn record_timings(mut self, record_timings: bool) -> Self {
        self.record_timings = record_timings;
        self
    }

    /// Name of the variant this task runs.
    #[must_use]
    pub fn variant_name(&self) -> &str {
        self.variant.name()
    }

    /// Instance seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Block size.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// The instance this task reduces.
    #[must_use]
    pub fn matrix(&self) -> &IntegerMatrix {
        &self.matrix
    }

    /// Run the task on the current thread.
    ///
    /// # Errors
    ///
    /// Any variant error is reported as `RunFailed` with this task's variant
    /// and seed.
    pub fn run(&self) -> Result<RunOutcome> {
        let trace = run_variant(
            &self.variant,
            &self.matrix,
            self.block_size,
            self.tours,
            self.quality,
            self.record_timings,
        )
        .map_err(|e| match e {
            e @ (Error::RunFailed { .. } | Error::WorkerPanicked { .. }) => e,
            other => Error::run_failed(self.variant.name(), self.seed, other.to_string()),
        })?;

        Ok(RunOutcome {
            variant: self.variant.name().to_string(),
            seed: self.seed,
            trace,
        })
    }

    /// [`RunTask::run`], with panics turned into `WorkerPanicked`.
    fn run_guarded(&self) -> Result<RunOutcome> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run())).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(Error::WorkerPanicked {
                variant: self.variant.name().to_string(),
                seed: self.seed,
                message,
            })
        })
    }
}

/// Result of one run: `(variant, seed, trace)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    variant: String,
    seed: u64,
    trace: TraceNode,
}

impl RunOutcome {
    /// Variant name.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Instance seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Trace of the run.
    #[must_use]
    pub const fn trace(&self) -> &TraceNode {
        &self.trace
    }

    /// Split into `(variant, seed, trace)`.
    #[must_use]
    pub fn into_parts(self) -> (String, u64, TraceNode) {
        (self.variant, self.seed, self.trace)
    }
}

/// Scheduling counters of one `execute` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Tasks completed
    pub tasks: usize,
    /// Completion-wait barriers (one per chunk)
    pub barriers: usize,
    /// Highest number of runs observed in flight at once
    pub peak_concurrency: usize,
}

/// Runs up to `threads` tasks at a time.
pub struct WorkerPool {
    threads: usize,
    pool: Option<ThreadPool>,
}

impl WorkerPool {
    /// Create a pool of `threads` workers. `threads == 1` creates no pool.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for zero threads, `ThreadPool` if rayon fails.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidInput("threads must be >= 1".to_string()));
        }
        let pool = if threads == 1 {
            None
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("bkz-worker-{i}"))
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?;
            Some(pool)
        };
        Ok(Self { threads, pool })
    }

    /// Concurrency bound.
    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// Run `tasks`, returning outcomes in submission order.
    ///
    /// # Errors
    ///
    /// Returns the first failure (in submission order) of the first failing
    /// chunk; later chunks are not started.
    pub fn execute(&self, tasks: Vec<RunTask>) -> Result<Vec<RunOutcome>> {
        self.execute_with(tasks, |_| {}).map(|(outcomes, _)| outcomes)
    }

    /// Run `tasks`, calling `on_result` for every outcome in submission
    /// order as soon as its chunk has completed.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::execute`].
    pub fn execute_with<F>(
        &self,
        tasks: Vec<RunTask>,
        mut on_result: F,
    ) -> Result<(Vec<RunOutcome>, ExecutionStats)>
    where
        F: FnMut(&RunOutcome),
    {
        let mut stats = ExecutionStats::default();
        let mut outcomes = Vec::with_capacity(tasks.len());

        let Some(pool) = &self.pool else {
            for task in &tasks {
                let outcome = task.run_guarded()?;
                stats.barriers += 1;
                stats.peak_concurrency = 1;
                stats.tasks += 1;
                on_result(&outcome);
                outcomes.push(outcome);
            }
            return Ok((outcomes, stats));
        };

        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        for (index, chunk) in tasks.chunks(self.threads).enumerate() {
            let (sender, receiver) = unbounded::<(usize, Result<RunOutcome>)>();

            pool.scope(|scope| {
                for (slot, task) in chunk.iter().enumerate() {
                    let sender = sender.clone();
                    let in_flight = &in_flight;
                    let peak = &peak;
                    scope.spawn(move |_| {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        let result = task.run_guarded();
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        // receiver lives until every slot is collected
                        let _ = sender.send((slot, result));
                    });
                }
            });
            drop(sender);
            stats.barriers += 1;
            tracing::debug!(chunk = index, size = chunk.len(), "chunk complete");

            let mut slots: Vec<Option<Result<RunOutcome>>> = (0..chunk.len()).map(|_| None).collect();
            for _ in 0..chunk.len() {
                let (slot, result) = receiver.recv().map_err(|_| Error::ChannelClosed)?;
                slots[slot] = Some(result);
            }
            for slot in slots {
                let outcome = slot.ok_or(Error::ChannelClosed)??;
                stats.tasks += 1;
                on_result(&outcome);
                outcomes.push(outcome);
            }
        }

        stats.peak_concurrency = peak.load(Ordering::SeqCst);
        Ok((outcomes, stats))
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}
