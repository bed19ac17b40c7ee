//! Run configuration
//!
//! [`RunParams`] are the per-invocation knobs of [`ExperimentGrid::run`];
//! [`CompareConfig`] is the whole experiment as loaded from a JSON file and
//! overridden by command-line flags.
//!
//! ```json
//! {
//!   "variants": ["LLL", "LLL75"],
//!   "dimensions": [40, 60],
//!   "block_sizes": [10, 20],
//!   "seed": 4919,
//!   "threads": 4,
//!   "samples": 8,
//!   "tours": 2,
//!   "matrix": { "algorithm": "qary", "bits": 20 }
//! }
//! ```
//!
//! Missing fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::experiment::{check_sizes, ExperimentGrid};
use crate::matrix::MatrixParams;
use crate::registry::VariantRegistry;
use crate::{Error, Result};

/// Default base seed.
pub const DEFAULT_SEED: u64 = 0x1337;

/// Per-invocation run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Base seed; sample `i` of every configuration uses `seed + i`
    pub seed: u64,
    /// Maximum number of concurrent runs
    pub threads: usize,
    /// Instances per configuration
    pub samples: usize,
    /// Tours per run
    pub tours: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            threads: 1,
            samples: 4,
            tours: 1,
        }
    }
}

impl RunParams {
    /// Check that every count is at least one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first zero field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("threads", self.threads),
            ("samples", self.samples),
            ("tours", self.tours),
        ] {
            if value == 0 {
                return Err(Error::InvalidInput(format!("{name} must be >= 1")));
            }
        }
        Ok(())
    }
}

/// Instance family; the q-ary `k` follows the dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum MatrixKind {
    /// q-ary lattice with `k = dimension / 2`
    Qary {
        /// Modulus bit size
        bits: u32,
    },
    /// Uniform entries
    Uniform {
        /// Entry bit size
        bits: u32,
    },
    /// Integer relation basis
    Intrel {
        /// First column bit size
        bits: u32,
    },
}

impl Default for MatrixKind {
    fn default() -> Self {
        Self::Qary { bits: 30 }
    }
}

impl MatrixKind {
    /// Generator parameters at `dimension`.
    #[must_use]
    pub const fn params(self, dimension: usize) -> MatrixParams {
        match self {
            Self::Qary { bits } => MatrixParams::Qary {
                k: dimension / 2,
                bits,
            },
            Self::Uniform { bits } => MatrixParams::Uniform { bits },
            Self::Intrel { bits } => MatrixParams::Intrel { bits },
        }
    }
}

/// A complete comparison: variants, grid axes, run parameters and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Variant names, resolved through the registry
    pub variants: Vec<String>,
    /// Lattice dimensions, in run order
    pub dimensions: Vec<usize>,
    /// Block sizes, in run order
    pub block_sizes: Vec<usize>,
    /// Run parameters
    #[serde(flatten)]
    pub run: RunParams,
    /// Instance family
    pub matrix: MatrixKind,
    /// Record wall-clock metrics in traces
    pub record_timings: bool,
    /// Directory for the results and log files
    pub output_dir: PathBuf,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            variants: vec!["LLL".to_string()],
            dimensions: vec![60, 80, 100, 120],
            block_sizes: vec![10, 20, 30, 40],
            run: RunParams::default(),
            matrix: MatrixKind::default(),
            record_timings: true,
            output_dir: PathBuf::from("."),
        }
    }
}

impl CompareConfig {
    /// Load a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Config` if it does not
    /// parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse a config from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Json` on malformed input.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check the config before anything runs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty lists, zero or repeated sizes, or bad
    /// run parameters.
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(Error::InvalidInput("no variants given".to_string()));
        }
        check_sizes("dimensions", &self.dimensions)?;
        check_sizes("block sizes", &self.block_sizes)?;
        self.run.validate()
    }

    /// Resolve the variants in `registry` and build the grid.
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound` for an unknown variant (nothing is built),
    /// and the validation errors of [`ExperimentGrid::builder`].
    pub fn build_grid(&self, registry: &VariantRegistry) -> Result<ExperimentGrid> {
        let variants = registry.resolve(&self.variants)?;
        let kind = self.matrix;
        ExperimentGrid::builder()
            .variants(variants)
            .matrix_factory(move |dimension, _| kind.params(dimension))
            .dimensions(self.dimensions.iter().copied())
            .block_sizes(self.block_sizes.iter().copied())
            .record_timings(self.record_timings)
            .build()
    }
}
