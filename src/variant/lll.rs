//! Reference variant: textbook LLL, one full reduction per tour
//!
//! Exact integer basis, floating-point Gram-Schmidt data. Each row's GSO
//! is projected from the current integer row with modified Gram-Schmidt
//! whenever the row is visited, so unreduced bases with large entries keep
//! their small `r_i` accurate. Size reduction repeats until the projected
//! coefficients are all at most 1/2 (Schnorr-Euchner).
//! The block size is ignored; LLL is the block-size-2 end of the BKZ family.

use crate::matrix::IntegerMatrix;
use crate::trace::Tracer;
use crate::variant::{ReductionVariant, RegisteredVariant};
use crate::{Error, Result};

/// Upper bound on loop iterations per row before a tour gives up.
const MAX_LOOPS_PER_ROW: usize = 1 << 16;

/// Largest rounded coefficient accepted for an integer row operation.
const MAX_COEFFICIENT: f64 = 4.0e18;

/// Coefficients above `2^26` lose bits in `f64`; the row is projected again.
const REPROJECT_ABOVE: f64 = 67_108_864.0;

/// Size-reduction passes allowed on one row before a tour gives up.
const MAX_SIZE_REDUCTION_PASSES: usize = 64;

/// LLL with Lovasz constant `delta`.
#[derive(Debug, Clone)]
pub struct Lll {
    basis: IntegerMatrix,
    delta: f64,
}

/// Counters of one tour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TourStats {
    swaps: usize,
    size_reductions: usize,
}

/// Floating-point Gram-Schmidt data: `mu[i][j]`, `b*_i` and `r[i] = ||b*_i||^2`.
struct Gso {
    mu: Vec<Vec<f64>>,
    b_star: Vec<Vec<f64>>,
    r: Vec<f64>,
}

impl Lll {
    /// Wrap `basis` with Lovasz constant `delta`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `0.25 < delta < 1`.
    pub fn new(basis: IntegerMatrix, delta: f64) -> Result<Self> {
        if !(delta > 0.25 && delta < 1.0) {
            return Err(Error::InvalidInput(format!(
                "LLL delta must be in (0.25, 1), got {delta}"
            )));
        }
        Ok(Self { basis, delta })
    }

    /// Registry entry building `Lll` instances with `delta`.
    #[must_use]
    pub fn registered(name: impl Into<String>, delta: f64) -> RegisteredVariant {
        RegisteredVariant::from_fn(name, move |basis| {
            Ok(Box::new(Self::new(basis, delta)?) as Box<dyn ReductionVariant>)
        })
    }

    /// Lovasz constant.
    #[must_use]
    pub const fn delta(&self) -> f64 {
        self.delta
    }

    fn reduce(&mut self) -> Result<TourStats> {
        let n = self.basis.nrows();
        let mut stats = TourStats::default();
        if n < 2 {
            return Ok(stats);
        }
        let mut gso = Gso::new(n, self.basis.ncols());
        gso.project(&self.basis, 0)?;
        let max_loops = MAX_LOOPS_PER_ROW.saturating_mul(n);
        let mut loops = 0;
        let mut k = 1;

        while k < n {
            loops += 1;
            if loops > max_loops {
                return Err(Error::Other(format!(
                    "LLL did not terminate after {max_loops} iterations"
                )));
            }

            self.size_reduce(&mut gso, k, &mut stats)?;
            let mu = gso.mu[k][k - 1];
            if gso.r[k] < (self.delta - mu * mu) * gso.r[k - 1] {
                self.basis.swap_rows(k, k - 1);
                stats.swaps += 1;
                if k == 1 {
                    gso.project(&self.basis, 0)?;
                } else {
                    k -= 1;
                }
            } else {
                k += 1;
            }
        }
        Ok(stats)
    }

    /// Project row `k` and reduce it against rows `0..k` until every
    /// `|mu[k][j]| <= 1/2`.
    #[allow(clippy::cast_possible_truncation)]
    fn size_reduce(&mut self, gso: &mut Gso, k: usize, stats: &mut TourStats) -> Result<()> {
        for _ in 0..MAX_SIZE_REDUCTION_PASSES {
            gso.project(&self.basis, k)?;
            let mut largest: f64 = 0.0;
            for j in (0..k).rev() {
                let mu = gso.mu[k][j];
                if mu.abs() <= 0.5 {
                    continue;
                }
                let q = mu.round();
                if !q.is_finite() || q.abs() > MAX_COEFFICIENT {
                    return Err(Error::Other(format!(
                        "size reduction coefficient out of range: mu[{k}][{j}] = {mu}"
                    )));
                }
                self.basis.sub_row_multiple(k, j, q as i64)?;
                gso.mu[k][j] -= q;
                for l in 0..j {
                    gso.mu[k][l] -= q * gso.mu[j][l];
                }
                stats.size_reductions += 1;
                largest = largest.max(q.abs());
            }
            if largest <= REPROJECT_ABOVE {
                return Ok(());
            }
        }
        Err(Error::Other(format!(
            "size reduction of row {k} did not settle after {MAX_SIZE_REDUCTION_PASSES} passes"
        )))
    }
}

impl Gso {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            mu: vec![vec![0.0; rows]; rows],
            b_star: vec![vec![0.0; cols]; rows],
            r: vec![0.0; rows],
        }
    }

    /// Recompute `mu[k][..k]`, `b*_k` and `r[k]` from integer row `k`,
    /// assuming rows `0..k` are current.
    #[allow(clippy::cast_precision_loss)]
    fn project(&mut self, basis: &IntegerMatrix, k: usize) -> Result<()> {
        let (done, rest) = self.b_star.split_at_mut(k);
        let v = &mut rest[0];
        for (x, &b) in v.iter_mut().zip(basis.row(k)) {
            *x = b as f64;
        }
        for (j, b_star) in done.iter().enumerate() {
            let mu = dot(v, b_star) / self.r[j];
            for (x, y) in v.iter_mut().zip(b_star) {
                *x -= mu * y;
            }
            self.mu[k][j] = mu;
        }
        let r = dot(v, v);
        if !r.is_finite() || r <= 0.0 {
            return Err(Error::Other(format!(
                "basis row {k} is linearly dependent or not finite"
            )));
        }
        self.r[k] = r;
        self.mu[k][k] = 1.0;
        Ok(())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[allow(clippy::cast_precision_loss)]
impl ReductionVariant for Lll {
    fn tour(&mut self, _block_size: usize, tracer: &mut Tracer) -> Result<()> {
        let stats = self.reduce()?;
        tracer.increment("swaps", stats.swaps as f64);
        tracer.increment("size_reductions", stats.size_reductions as f64);
        Ok(())
    }

    fn basis(&self) -> &IntegerMatrix {
        &self.basis
    }
}
