//! Dense matrices over the rationals.
//!
//! Small exact-arithmetic workhorse for the linear family layer and the
//! homological actions: reduced row echelon form, rank, right kernel,
//! products and column permutations over `BigRational`. Nothing here is
//! asymptotically clever; matrices have one column per edge.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

/// Shorthand for an exact rational from an integer.
pub fn rational(v: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(v))
}

/// A dense matrix over `BigRational`.
///
/// # Examples
///
/// ```
/// use veering::matrix::QMatrix;
///
/// let mut m = QMatrix::from_int_rows(&[vec![2, 4], vec![1, 3]]);
/// let pivots = m.echelonize();
/// assert_eq!(pivots, vec![0, 1]);
/// assert_eq!(m, QMatrix::identity(2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QMatrix {
    ncols: usize,
    rows: Vec<Vec<BigRational>>,
}

impl QMatrix {
    pub fn zero(nrows: usize, ncols: usize) -> Self {
        QMatrix {
            ncols,
            rows: vec![vec![BigRational::zero(); ncols]; nrows],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = QMatrix::zero(n, n);
        for i in 0..n {
            m.rows[i][i] = BigRational::one();
        }
        m
    }

    /// Builds a matrix from rows of rationals. All rows must have length
    /// `ncols`; rows may be empty only when the matrix has no rows.
    pub fn from_rows(rows: Vec<Vec<BigRational>>, ncols: usize) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == ncols));
        QMatrix { ncols, rows }
    }

    /// Builds a matrix from integer rows.
    pub fn from_int_rows<R: AsRef<[i64]>>(rows: &[R]) -> Self {
        let ncols = rows.first().map_or(0, |r| r.as_ref().len());
        QMatrix {
            ncols,
            rows: rows
                .iter()
                .map(|r| r.as_ref().iter().map(|&v| rational(v)).collect())
                .collect(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn entry(&self, i: usize, j: usize) -> &BigRational {
        &self.rows[i][j]
    }

    pub fn row(&self, i: usize) -> &[BigRational] {
        &self.rows[i]
    }

    pub fn rows(&self) -> &[Vec<BigRational>] {
        &self.rows
    }

    pub fn set_row(&mut self, i: usize, row: Vec<BigRational>) {
        debug_assert_eq!(row.len(), self.ncols);
        self.rows[i] = row;
    }

    pub fn push_row(&mut self, row: Vec<BigRational>) {
        debug_assert_eq!(row.len(), self.ncols);
        self.rows.push(row);
    }

    /// In-place reduced row echelon form. Returns the pivot columns; zero
    /// rows are kept (at the bottom), so `nrows` is unchanged.
    pub fn echelonize(&mut self) -> Vec<usize> {
        let nrows = self.rows.len();
        let mut pivots = Vec::new();
        let mut r = 0;
        for c in 0..self.ncols {
            if r == nrows {
                break;
            }
            let Some(pr) = (r..nrows).find(|&i| !self.rows[i][c].is_zero()) else {
                continue;
            };
            self.rows.swap(r, pr);
            let pivot = self.rows[r][c].clone();
            for v in self.rows[r].iter_mut() {
                *v = &*v / &pivot;
            }
            let pivot_row = self.rows[r].clone();
            for (i, row) in self.rows.iter_mut().enumerate() {
                if i != r && !row[c].is_zero() {
                    let factor = row[c].clone();
                    for (v, p) in row.iter_mut().zip(pivot_row.iter()) {
                        *v = &*v - &(&factor * p);
                    }
                }
            }
            pivots.push(c);
            r += 1;
        }
        pivots
    }

    /// The rank, computed on a copy.
    pub fn rank(&self) -> usize {
        self.clone().echelonize().len()
    }

    /// Whether the matrix already is in reduced row echelon form.
    pub fn is_echelonized(&self) -> bool {
        let mut copy = self.clone();
        copy.echelonize();
        copy == *self
    }

    /// Removes zero rows (used after echelonizing a spanning set down to a
    /// basis).
    pub fn drop_zero_rows(&mut self) {
        self.rows.retain(|r| r.iter().any(|v| !v.is_zero()));
    }

    /// An echelonized basis of the right kernel `{v : M v = 0}`.
    pub fn right_kernel(&self) -> QMatrix {
        let mut m = self.clone();
        let pivots = m.echelonize();
        let mut is_pivot = vec![false; self.ncols];
        for &c in &pivots {
            is_pivot[c] = true;
        }
        let mut basis = Vec::new();
        for free in (0..self.ncols).filter(|&c| !is_pivot[c]) {
            let mut v = vec![BigRational::zero(); self.ncols];
            v[free] = BigRational::one();
            for (i, &pc) in pivots.iter().enumerate() {
                v[pc] = -m.rows[i][free].clone();
            }
            basis.push(v);
        }
        let mut kernel = QMatrix::from_rows(basis, self.ncols);
        kernel.echelonize();
        kernel
    }

    /// Matrix product `self * other`.
    pub fn mul(&self, other: &QMatrix) -> QMatrix {
        debug_assert_eq!(self.ncols, other.nrows());
        let mut out = QMatrix::zero(self.nrows(), other.ncols());
        for i in 0..self.nrows() {
            for k in 0..self.ncols {
                let a = &self.rows[i][k];
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.ncols {
                    let prod = a * &other.rows[k][j];
                    out.rows[i][j] += prod;
                }
            }
        }
        out
    }

    /// Applies a column relabelling: column `j` moves to column `perm[j]`.
    pub fn permute_columns(&mut self, perm: &[usize]) {
        debug_assert_eq!(perm.len(), self.ncols);
        for row in self.rows.iter_mut() {
            let mut new_row = vec![BigRational::zero(); row.len()];
            for (j, v) in row.drain(..).enumerate() {
                new_row[perm[j]] = v;
            }
            *row = new_row;
        }
    }
}

impl fmt::Display for QMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self
            .rows
            .iter()
            .map(|row| {
                let inner = row
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({inner})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{body}]")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echelon_and_kernel() {
        // x1 = x0 + x2, written as -x0 + x1 - x2 = 0
        let eqs = QMatrix::from_int_rows(&[vec![-1, 1, -1]]);
        let kernel = eqs.right_kernel();
        assert_eq!(kernel, QMatrix::from_int_rows(&[vec![1, 0, -1], vec![0, 1, 1]]));
        assert_eq!(eqs.rank(), 1);
        assert!(kernel.is_echelonized());
    }

    #[test]
    fn kernel_orthogonality() {
        let m = QMatrix::from_int_rows(&[vec![1, 2, 3, 4], vec![0, 1, -1, 2]]);
        let k = m.right_kernel();
        assert_eq!(k.nrows(), 2);
        for row in k.rows() {
            for eq in m.rows() {
                let dot: BigRational = eq.iter().zip(row).map(|(a, b)| a * b).sum();
                assert!(dot.is_zero());
            }
        }
    }

    #[test]
    fn zero_rows_kept_then_dropped() {
        let mut m = QMatrix::from_int_rows(&[vec![1, 1], vec![2, 2], vec![0, 1]]);
        let pivots = m.echelonize();
        assert_eq!(pivots.len(), 2);
        assert_eq!(m.nrows(), 3);
        m.drop_zero_rows();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m, QMatrix::identity(2));
    }

    #[test]
    fn column_permutation() {
        let mut m = QMatrix::from_int_rows(&[vec![1, 2, 3]]);
        m.permute_columns(&[2, 0, 1]);
        assert_eq!(m, QMatrix::from_int_rows(&[vec![2, 3, 1]]));
    }
}
