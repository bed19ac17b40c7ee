//! # bkz-compare: Parallel Comparison Engine for Lattice Reduction Variants
//!
//! Runs every registered reduction variant over a grid of
//! `(dimension, block_size)` configurations, on reproducible random
//! instances, and reduces the per-run trace trees into per-variant averages.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: a failed or panicked run stops the grid; nothing is retried
//! - **Poka-Yoke**: unknown variant names fail before a single run starts
//! - **Heijunka**: runs are scheduled in chunks of at most `threads`
//! - **Genchi Genbutsu**: every run keeps its full trace, averages are derived
//!
//! ## Example Usage
//!
//! ```rust
//! use bkz_compare::config::RunParams;
//! use bkz_compare::experiment::ExperimentGrid;
//! use bkz_compare::matrix::MatrixParams;
//! use bkz_compare::observer::RecordingObserver;
//! use bkz_compare::registry::VariantRegistry;
//!
//! let registry = VariantRegistry::with_builtins();
//! let grid = ExperimentGrid::builder()
//!     .variants(registry.resolve(&["LLL", "LLL75"])?)
//!     .matrix_factory(|d, _| MatrixParams::Qary { k: d / 2, bits: 12 })
//!     .dimensions([10, 12])
//!     .block_sizes([5, 11])
//!     .build()?;
//!
//! let observer = RecordingObserver::new();
//! let params = RunParams { threads: 2, samples: 2, ..RunParams::default() };
//! let table = grid.run(&params, &observer)?;
//!
//! assert!(table.get(10, 11, "LLL").is_none()); // 11 > 10: skipped
//! assert_eq!(table.get(12, 11, "LLL75").unwrap().len(), 2);
//! # Ok::<(), bkz_compare::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod executor;
pub mod experiment;
pub mod logging;
pub mod matrix;
pub mod observer;
pub mod quality;
pub mod registry;
pub mod trace;
pub mod variant;

pub use error::{Error, Result};
