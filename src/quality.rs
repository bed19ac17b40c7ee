//! Basis quality metrics
//!
//! All functions take the squared Gram-Schmidt norms `r_i = ||b*_i||^2` of a
//! basis, the same quantity lattice libraries expose as `get_r(i, i)`.
//!
//! - `rhf`: root Hermite factor `(||b_0|| / vol^(1/n))^(1/n)`
//! - `ghr`: `r_0` over the Gaussian heuristic of the full basis
//! - `hvr`: Gaussian heuristic of the first half over the second half

use std::f64::consts::PI;

use crate::matrix::IntegerMatrix;
use crate::trace::Metrics;
use crate::{Error, Result};

/// Pure function from a reduced basis to named quality scores.
pub type QualityFn = fn(&IntegerMatrix) -> Result<Metrics>;

/// Squared Gram-Schmidt norms of the rows of `basis` (modified Gram-Schmidt).
///
/// # Errors
///
/// Returns `InvalidInput` if the rows are linearly dependent or the
/// computation leaves the finite range.
pub fn gso_squared_norms(basis: &IntegerMatrix) -> Result<Vec<f64>> {
    let mut ortho = basis.to_f64_rows();
    let mut norms = Vec::with_capacity(ortho.len());
    for i in 0..ortho.len() {
        let (done, rest) = ortho.split_at_mut(i);
        let v = &mut rest[0];
        for (b_star, &r) in done.iter().zip(&norms) {
            let mu = dot(v, b_star) / r;
            for (x, y) in v.iter_mut().zip(b_star) {
                *x -= mu * y;
            }
        }
        let r = dot(v, v);
        if !r.is_finite() || r <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "basis row {i} is linearly dependent (r = {r})"
            )));
        }
        norms.push(r);
    }
    Ok(norms)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `ln Γ(n/2 + 1)`, exact for the half-integers a ball volume needs.
#[allow(clippy::cast_precision_loss)]
fn log_gamma_half(n: usize) -> f64 {
    let m = n / 2;
    if n % 2 == 0 {
        (1..=m).map(|j| (j as f64).ln()).sum()
    } else {
        0.5 * PI.ln() + (0..=m).map(|j| (j as f64 + 0.5).ln()).sum::<f64>()
    }
}

/// Log volume of the `n`-dimensional unit ball.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ball_log_vol(n: usize) -> f64 {
    (n as f64 / 2.0) * PI.ln() - log_gamma_half(n)
}

/// Gaussian heuristic (squared) for the lattice with squared GSO norms `r`.
///
/// Returns `NaN` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_heuristic(r: &[f64]) -> f64 {
    let n = r.len();
    if n == 0 {
        return f64::NAN;
    }
    let log_vol: f64 = r.iter().map(|x| x.ln()).sum();
    let log_gh = (log_vol - 2.0 * ball_log_vol(n)) / n as f64;
    log_gh.exp()
}

/// `rhf`, `ghr` and `hvr` from squared GSO norms, in that order.
///
/// ```rust
/// use bkz_compare::quality::basis_quality;
///
/// let quality = basis_quality(&[1.0; 8])?;
/// assert!((quality.get("rhf").unwrap() - 1.0).abs() < 1e-12);
/// assert!((quality.get("hvr").unwrap() - 1.0).abs() < 1e-12);
/// # Ok::<(), bkz_compare::Error>(())
/// ```
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than two norms.
#[allow(clippy::cast_precision_loss)]
pub fn basis_quality(r: &[f64]) -> Result<Metrics> {
    let n = r.len();
    if n < 2 {
        return Err(Error::InvalidInput(format!(
            "basis quality needs at least 2 vectors, got {n}"
        )));
    }
    let nf = n as f64;
    let log_volume: f64 = r.iter().map(|x| x.ln() / 2.0).sum();
    let rhf = ((r[0].ln() / 2.0 - log_volume / nf) / nf).exp();

    let half = n / 2;
    let hvr = if n % 2 == 1 {
        gaussian_heuristic(&r[..half]) / gaussian_heuristic(&r[half + 1..])
    } else {
        gaussian_heuristic(&r[..half]) / gaussian_heuristic(&r[half..])
    };
    let ghr = r[0] / gaussian_heuristic(r);

    let mut metrics = Metrics::new();
    metrics.insert("rhf", rhf);
    metrics.insert("ghr", ghr);
    metrics.insert("hvr", hvr);
    Ok(metrics)
}

/// Default [`QualityFn`]: GSO of `basis`, then [`basis_quality`].
///
/// # Errors
///
/// Propagates errors from [`gso_squared_norms`] and [`basis_quality`].
pub fn matrix_quality(basis: &IntegerMatrix) -> Result<Metrics> {
    basis_quality(&gso_squared_norms(basis)?)
}
