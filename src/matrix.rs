//! Integer matrices and seeded random problem instances
//!
//! A [`MatrixFactory`] maps `(dimension, block_size)` to [`MatrixParams`];
//! [`IntegerMatrix::random`] turns params plus a seed into one instance.
//! Seeding and generation happen in one call, so equal seeds always give
//! equal instances regardless of which thread asks.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Generator parameters for one random instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum MatrixParams {
    /// q-ary lattice: `k` rows `q * e_i`, the rest `[H | I]` with `H` uniform mod `q`.
    Qary {
        /// Number of `q * e_i` rows
        k: usize,
        /// Bit size of the prime modulus `q`
        bits: u32,
    },
    /// Entries uniform in `[0, 2^bits)`.
    Uniform {
        /// Entry bit size
        bits: u32,
    },
    /// Integer relation basis: first column uniform, identity after it.
    Intrel {
        /// Bit size of the first column
        bits: u32,
    },
}

/// Maps `(dimension, block_size)` to generator parameters.
pub type MatrixFactory = Arc<dyn Fn(usize, usize) -> MatrixParams + Send + Sync>;

/// Default factory: q-ary lattice with `k = d / 2` and a 30-bit modulus.
#[must_use]
pub const fn qary30(dimension: usize, _block_size: usize) -> MatrixParams {
    MatrixParams::Qary {
        k: dimension / 2,
        bits: 30,
    }
}

/// Dense row-major integer matrix. Rows are basis vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerMatrix {
    rows: usize,
    cols: usize,
    data: Vec<i64>,
}

impl IntegerMatrix {
    /// Zero matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Identity matrix.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1;
        }
        m
    }

    /// Build from row vectors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(Error::InvalidInput(format!(
                "row {bad} has {} entries, expected {cols}",
                rows[bad].len()
            )));
        }
        let n = rows.len();
        Ok(Self {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Generate a random instance from `params`, seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero dimension, `k > dimension`, or a bit
    /// size outside `2..=62`.
    pub fn random(dimension: usize, params: &MatrixParams, seed: u64) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidInput("dimension must be > 0".to_string()));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        match *params {
            MatrixParams::Qary { k, bits } => {
                check_bits(bits)?;
                if k > dimension {
                    return Err(Error::InvalidInput(format!(
                        "q-ary k = {k} exceeds dimension {dimension}"
                    )));
                }
                let q = random_prime(bits, &mut rng);
                let mut m = Self::zeros(dimension, dimension);
                for i in 0..k {
                    m.set(i, i, q);
                }
                for i in k..dimension {
                    for j in 0..k {
                        m.set(i, j, rng.gen_range(0..q));
                    }
                    m.set(i, i, 1);
                }
                Ok(m)
            }
            MatrixParams::Uniform { bits } => {
                check_bits(bits)?;
                let bound = 1_i64 << bits;
                let mut m = Self::zeros(dimension, dimension);
                for x in &mut m.data {
                    *x = rng.gen_range(0..bound);
                }
                Ok(m)
            }
            MatrixParams::Intrel { bits } => {
                check_bits(bits)?;
                let bound = 1_i64 << bits;
                let mut m = Self::zeros(dimension, dimension + 1);
                for i in 0..dimension {
                    m.set(i, 0, rng.gen_range(0..bound));
                    m.set(i, i + 1, 1);
                }
                Ok(m)
            }
        }
    }

    /// Number of rows (basis vectors).
    #[must_use]
    pub const fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns (ambient dimension).
    #[must_use]
    pub const fn ncols(&self) -> usize {
        self.cols
    }

    /// Entry at `(i, j)`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> i64 {
        self.data[i * self.cols + j]
    }

    /// Set entry at `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, value: i64) {
        self.data[i * self.cols + j] = value;
    }

    /// Row `i` as a slice.
    #[must_use]
    pub fn row(&self, i: usize) -> &[i64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Swap rows `i` and `j`.
    pub fn swap_rows(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(i * self.cols + c, j * self.cols + c);
        }
    }

    /// `row[i] -= factor * row[j]`, checked for overflow.
    ///
    /// # Errors
    ///
    /// Returns `Other` on `i64` overflow.
    pub fn sub_row_multiple(&mut self, i: usize, j: usize, factor: i64) -> Result<()> {
        if factor == 0 {
            return Ok(());
        }
        for c in 0..self.cols {
            let delta = self.data[j * self.cols + c]
                .checked_mul(factor)
                .ok_or_else(|| overflow(i, j))?;
            let slot = &mut self.data[i * self.cols + c];
            *slot = slot.checked_sub(delta).ok_or_else(|| overflow(i, j))?;
        }
        Ok(())
    }

    /// Rows converted to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|i| self.row(i).iter().map(|&x| x as f64).collect())
            .collect()
    }
}

impl fmt::Display for IntegerMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for i in 0..self.rows {
            writeln!(f, "  {:?}", self.row(i))?;
        }
        write!(f, "]")
    }
}

fn overflow(i: usize, j: usize) -> Error {
    Error::Other(format!("integer overflow reducing row {i} by row {j}"))
}

fn check_bits(bits: u32) -> Result<()> {
    if (2..=62).contains(&bits) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "bit size must be in 2..=62, got {bits}"
        )))
    }
}

fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Random prime in `[2^(bits-1), 2^bits)`.
fn random_prime(bits: u32, rng: &mut StdRng) -> i64 {
    let lo = 1_i64 << (bits - 1);
    let hi = 1_i64 << bits;
    loop {
        let mut candidate = rng.gen_range(lo..hi) | 1;
        while candidate < hi {
            if is_prime(candidate) {
                return candidate;
            }
            candidate += 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_instance() {
        let params = qary30(20, 10);
        let a = IntegerMatrix::random(20, &params, 0x1337).unwrap();
        let b = IntegerMatrix::random(20, &params, 0x1337).unwrap();
        let c = IntegerMatrix::random(20, &params, 0x1338).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_qary_shape() {
        let m = IntegerMatrix::random(10, &MatrixParams::Qary { k: 4, bits: 16 }, 1).unwrap();
        let q = m.get(0, 0);
        assert!(is_prime(q));
        assert!(q >= 1 << 15 && q < 1 << 16);
        for i in 0..4 {
            for j in 0..10 {
                assert_eq!(m.get(i, j), if i == j { q } else { 0 });
            }
        }
        for i in 4..10 {
            assert!((0..4).all(|j| (0..q).contains(&m.get(i, j))));
            assert_eq!(m.get(i, i), 1);
        }
    }

    #[test]
    fn test_intrel_shape() {
        let m = IntegerMatrix::random(5, &MatrixParams::Intrel { bits: 10 }, 3).unwrap();
        assert_eq!((m.nrows(), m.ncols()), (5, 6));
        assert_eq!(m.get(2, 3), 1);
    }

    #[test]
    fn test_invalid_params() {
        assert!(IntegerMatrix::random(0, &qary30(0, 0), 1).is_err());
        assert!(IntegerMatrix::random(4, &MatrixParams::Qary { k: 5, bits: 10 }, 1).is_err());
        assert!(IntegerMatrix::random(4, &MatrixParams::Uniform { bits: 63 }, 1).is_err());
    }

    #[test]
    fn test_sub_row_multiple_overflow() {
        let mut m = IntegerMatrix::from_rows(vec![vec![i64::MAX], vec![2]]).unwrap();
        assert!(m.sub_row_multiple(0, 1, -1).is_err());
        m.sub_row_multiple(0, 1, 1).unwrap();
        assert_eq!(m.get(0, 0), i64::MAX - 2);
    }

    #[test]
    fn test_from_rows_ragged() {
        assert!(IntegerMatrix::from_rows(vec![vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn test_params_json_tagged() {
        let json = serde_json::to_string(&qary30(80, 20)).unwrap();
        assert_eq!(json, r#"{"algorithm":"qary","k":40,"bits":30}"#);
    }
}
