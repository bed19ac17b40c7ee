//! Reduction variants - the algorithms under comparison
//!
//! A variant is a stateful reduction procedure over a private copy of a
//! basis. The grid never holds a variant across runs: every run builds a
//! fresh one from its [`VariantFactory`], so concurrent runs share nothing.
//!
//! ## Contract
//!
//! ```text
//! run_variant(variant, matrix, block_size, tours)
//!   ├── build variant from a clone of `matrix`
//!   ├── for i in 0..tours
//!   │     ├── tracer.context("tour", i) { variant.tour(block_size) }
//!   │     └── quality(basis) -> injected into ("tour", i)
//!   └── quality(basis) -> injected into the root
//! ```

mod lll;

pub use lll::Lll;

use std::fmt;
use std::sync::Arc;

use crate::matrix::IntegerMatrix;
use crate::quality::QualityFn;
use crate::trace::{TraceNode, Tracer};
use crate::Result;

/// Label of the per-tour trace nodes.
pub const TOUR: &str = "tour";

/// A lattice reduction procedure that can be driven one tour at a time.
pub trait ReductionVariant: Send {
    /// Run one tour at `block_size`, recording statistics into `tracer`.
    ///
    /// # Errors
    ///
    /// Any error aborts the run; runs are never retried.
    fn tour(&mut self, block_size: usize, tracer: &mut Tracer) -> Result<()>;

    /// The current basis.
    fn basis(&self) -> &IntegerMatrix;
}

/// Builds a fresh variant instance owning the given basis.
pub type VariantFactory =
    Arc<dyn Fn(IntegerMatrix) -> Result<Box<dyn ReductionVariant>> + Send + Sync>;

/// A variant resolved from the registry: stable name plus factory.
#[derive(Clone)]
pub struct RegisteredVariant {
    name: String,
    factory: VariantFactory,
}

impl RegisteredVariant {
    /// Pair a name with a factory.
    #[must_use]
    pub fn new(name: impl Into<String>, factory: VariantFactory) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }

    /// Pair a name with a closure building the variant.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(IntegerMatrix) -> Result<Box<dyn ReductionVariant>> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(build))
    }

    /// Variant name, used as the results key and trace root label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build an instance over `basis`.
    ///
    /// # Errors
    ///
    /// Propagates factory errors.
    pub fn build(&self, basis: IntegerMatrix) -> Result<Box<dyn ReductionVariant>> {
        (self.factory)(basis)
    }
}

impl fmt::Debug for RegisteredVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredVariant")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Run `tours` tours of `variant` on a private copy of `matrix`.
///
/// Quality metrics are injected into each `("tour", i)` node after the tour
/// and into the root after the last one.
///
/// # Errors
///
/// Propagates errors from the factory, the tours and the quality function.
pub fn run_variant(
    variant: &RegisteredVariant,
    matrix: &IntegerMatrix,
    block_size: usize,
    tours: usize,
    quality: QualityFn,
    record_timings: bool,
) -> Result<TraceNode> {
    let mut reduction = variant.build(matrix.clone())?;
    let mut tracer = Tracer::new(variant.name(), record_timings);
    let mut tour_quality = Vec::with_capacity(tours);

    for i in 0..tours {
        tracer.context(TOUR, Some(i), |t| reduction.tour(block_size, t))?;
        tour_quality.push(quality(reduction.basis())?);
    }

    let mut trace = tracer.finish();
    for (i, metrics) in tour_quality.iter().enumerate() {
        trace.node_mut(TOUR, Some(i))?.data_mut().extend_from(metrics);
    }
    let final_quality = quality(reduction.basis())?;
    trace.data_mut().extend_from(&final_quality);
    Ok(trace)
}
