//! Results Table - `dimension -> block_size -> variant -> [(seed, trace)]`
//!
//! Every level keeps insertion order (the order the grid visited it), which
//! is also the order the JSON output lists it in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::{average_root_metrics, AggregateStats};
use crate::trace::TraceNode;
use crate::Result;

/// One run of one variant on one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    seed: u64,
    trace: TraceNode,
}

impl Sample {
    /// Pair a seed with the trace it produced.
    #[must_use]
    pub const fn new(seed: u64, trace: TraceNode) -> Self {
        Self { seed, trace }
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
}

/// Samples of one variant, in seed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResults {
    variant: String,
    samples: Vec<Sample>,
}

impl VariantResults {
    /// Variant name.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Samples in seed order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

/// Results of every variant at one block size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSizeResults {
    block_size: usize,
    variants: Vec<VariantResults>,
}

impl BlockSizeResults {
    /// Block size.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Per-variant results in grid order.
    #[must_use]
    pub fn variants(&self) -> &[VariantResults] {
        &self.variants
    }

    fn variant_mut(&mut self, variant: &str) -> &mut VariantResults {
        let pos = match self.variants.iter().position(|v| v.variant == variant) {
            Some(pos) => pos,
            None => {
                self.variants.push(VariantResults {
                    variant: variant.to_string(),
                    samples: Vec::new(),
                });
                self.variants.len() - 1
            }
        };
        &mut self.variants[pos]
    }
}

/// Results of every block size at one dimension.
///
/// A dimension whose block sizes were all skipped is present with no
/// block sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResults {
    dimension: usize,
    block_sizes: Vec<BlockSizeResults>,
}

impl DimensionResults {
    /// Lattice dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Per-block-size results in grid order.
    #[must_use]
    pub fn block_sizes(&self) -> &[BlockSizeResults] {
        &self.block_sizes
    }

    fn block_size_mut(&mut self, block_size: usize) -> &mut BlockSizeResults {
        let pos = match self.block_sizes.iter().position(|b| b.block_size == block_size) {
            Some(pos) => pos,
            None => {
                self.block_sizes.push(BlockSizeResults {
                    block_size,
                    variants: Vec::new(),
                });
                self.block_sizes.len() - 1
            }
        };
        &mut self.block_sizes[pos]
    }
}

/// Full results of a grid run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    created_at: DateTime<Utc>,
    dimensions: Vec<DimensionResults>,
}

impl Default for ResultsTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsTable {
    /// Create an empty table stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            dimensions: Vec::new(),
        }
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Per-dimension results in grid order.
    #[must_use]
    pub fn dimensions(&self) -> &[DimensionResults] {
        &self.dimensions
    }

    /// Check if no dimension has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Total number of samples across the table.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.dimensions
            .iter()
            .flat_map(|d| &d.block_sizes)
            .flat_map(|b| &b.variants)
            .map(|v| v.samples.len())
            .sum()
    }

    /// Look up one dimension.
    #[must_use]
    pub fn dimension(&self, dimension: usize) -> Option<&DimensionResults> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    /// Samples of `variant` at `(dimension, block_size)`.
    #[must_use]
    pub fn get(&self, dimension: usize, block_size: usize, variant: &str) -> Option<&[Sample]> {
        self.dimension(dimension)?
            .block_sizes
            .iter()
            .find(|b| b.block_size == block_size)?
            .variants
            .iter()
            .find(|v| v.variant == variant)
            .map(VariantResults::samples)
    }

    /// Make sure `dimension` has an entry, even if nothing runs under it.
    pub fn insert_dimension(&mut self, dimension: usize) {
        self.dimension_mut(dimension);
    }

    /// Make sure `variant` has a (possibly empty) entry at
    /// `(dimension, block_size)`.
    pub fn insert_variant(&mut self, dimension: usize, block_size: usize, variant: &str) {
        self.dimension_mut(dimension)
            .block_size_mut(block_size)
            .variant_mut(variant);
    }

    /// Append a sample, creating intermediate entries as needed.
    pub fn push(&mut self, dimension: usize, block_size: usize, variant: &str, sample: Sample) {
        self.dimension_mut(dimension)
            .block_size_mut(block_size)
            .variant_mut(variant)
            .samples
            .push(sample);
    }

    /// Mean root metrics of every variant at `(dimension, block_size)`, in
    /// grid order. Variants without samples are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the samples of a variant disagree on
    /// their root metric keys.
    pub fn averages(&self, dimension: usize, block_size: usize) -> Result<Vec<AggregateStats>> {
        let Some(entry) = self
            .dimension(dimension)
            .and_then(|d| d.block_sizes.iter().find(|b| b.block_size == block_size))
        else {
            return Ok(Vec::new());
        };

        entry
            .variants
            .iter()
            .filter(|v| !v.samples.is_empty())
            .map(|v| {
                Ok(AggregateStats::new(
                    dimension,
                    block_size,
                    v.variant.clone(),
                    v.samples.len(),
                    average_root_metrics(&v.variant, &v.samples)?,
                ))
            })
            .collect()
    }

    fn dimension_mut(&mut self, dimension: usize) -> &mut DimensionResults {
        let pos = match self.dimensions.iter().position(|d| d.dimension == dimension) {
            Some(pos) => pos,
            None => {
                self.dimensions.push(DimensionResults {
                    dimension,
                    block_sizes: Vec::new(),
                });
                self.dimensions.len() - 1
            }
        };
        &mut self.dimensions[pos]
    }
}
