//! Experiment grid and its results
//!
//! ## Layout
//!
//! ```text
//! ResultsTable
//!   └── dimension (60, 80, ...)
//!         └── block_size (10, 20, ...)      only block_size <= dimension
//!               └── variant ("LLL", ...)
//!                     └── [Sample { seed, trace }]   seed order
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bkz_compare::config::RunParams;
//! use bkz_compare::experiment::ExperimentGrid;
//! use bkz_compare::matrix::MatrixParams;
//! use bkz_compare::observer::NullObserver;
//! use bkz_compare::registry::VariantRegistry;
//!
//! let grid = ExperimentGrid::builder()
//!     .variants(VariantRegistry::with_builtins().resolve(&["LLL"])?)
//!     .matrix_factory(|d, _| MatrixParams::Qary { k: d / 2, bits: 10 })
//!     .dimensions([8])
//!     .block_sizes([4])
//!     .build()?;
//!
//! let params = RunParams { samples: 2, ..RunParams::default() };
//! let table = grid.run(&params, &NullObserver)?;
//! let samples = table.get(8, 4, "LLL").unwrap();
//! assert_eq!(samples[0].seed(), 0x1337);
//! assert_eq!(samples[1].seed(), 0x1338);
//! # Ok::<(), bkz_compare::Error>(())
//! ```

mod aggregate;
mod grid;
mod results;

pub use aggregate::{average_root_metrics, AggregateStats};
pub(crate) use grid::check_sizes;
pub use grid::{ExperimentGrid, ExperimentGridBuilder};
pub use results::{BlockSizeResults, DimensionResults, ResultsTable, Sample, VariantResults};
