//! Per-variant averages of root metrics

use serde::{Deserialize, Serialize};

use super::results::Sample;
use crate::trace::Metrics;
use crate::{Error, Result};

/// Mean root metrics of one variant at one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    dimension: usize,
    block_size: usize,
    variant: String,
    samples: usize,
    means: Metrics,
}

impl AggregateStats {
    /// Create aggregate stats.
    #[must_use]
    pub const fn new(
        dimension: usize,
        block_size: usize,
        variant: String,
        samples: usize,
        means: Metrics,
    ) -> Self {
        Self {
            dimension,
            block_size,
            variant,
            samples,
            means,
        }
    }

    /// Lattice dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Block size.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Variant name.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Number of samples averaged.
    #[must_use]
    pub const fn samples(&self) -> usize {
        self.samples
    }

    /// Arithmetic mean of each root metric.
    #[must_use]
    pub const fn means(&self) -> &Metrics {
        &self.means
    }
}

/// Arithmetic mean of every root metric over `samples`, keyed in the
/// order of the first sample.
///
/// ```rust
/// use bkz_compare::experiment::{average_root_metrics, Sample};
/// use bkz_compare::trace::TraceNode;
///
/// let samples: Vec<Sample> = [1.0, 2.0, 6.0]
///     .iter()
///     .enumerate()
///     .map(|(i, &rhf)| {
///         let mut trace = TraceNode::new("LLL", None);
///         trace.data_mut().insert("rhf", rhf);
///         Sample::new(i as u64, trace)
///     })
///     .collect();
/// let means = average_root_metrics("LLL", &samples)?;
/// assert_eq!(means.get("rhf"), Some(3.0));
/// # Ok::<(), bkz_compare::Error>(())
/// ```
///
/// # Errors
///
/// Returns `InvalidInput` for no samples and `SchemaMismatch` if a sample's
/// root keys differ from the first sample's.
#[allow(clippy::cast_precision_loss)]
pub fn average_root_metrics(variant: &str, samples: &[Sample]) -> Result<Metrics> {
    let Some(first) = samples.first() else {
        return Err(Error::InvalidInput(format!(
            "no samples to average for {variant}"
        )));
    };
    let expected: Vec<&str> = first.trace().data().keys().collect();
    let mut sums = vec![0.0; expected.len()];

    for sample in samples {
        let data = sample.trace().data();
        if !data.keys().eq(expected.iter().copied()) {
            return Err(Error::SchemaMismatch {
                variant: variant.to_string(),
                expected: expected.iter().map(ToString::to_string).collect(),
                found: data.keys().map(ToString::to_string).collect(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(data.values()) {
            *sum += value;
        }
    }

    let n = samples.len() as f64;
    Ok(expected
        .into_iter()
        .zip(sums)
        .map(|(key, sum)| (key, sum / n))
        .collect())
}
