//! Dense matrix kernel.
//!
//! A `Matrix` carries a `transposed` flag alongside its physical row-major
//! buffer. Calling [`Matrix::transpose`] flips the flag only — the backing
//! storage is never rewritten — so every indexing and product routine below
//! must account for the flag rather than assume row-major layout. This is a
//! representation choice, not an implementation shortcut: it lets a caller
//! hand the same buffer to a routine as either `A` or `Aᵀ` for free.

use crate::error::{EstimatorError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Physical row count of the backing buffer — does not change on transpose.
    rows: usize,
    /// Physical column count of the backing buffer — does not change on transpose.
    cols: usize,
    transposed: bool,
    data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            transposed: false,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(EstimatorError::ShapeMismatch(format!(
                "expected {} elements for a {}x{} matrix, got {}",
                rows * cols,
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Matrix { rows, cols, transposed: false, data })
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Matrix::zeros(n, n);
        m.set_diag();
        m
    }

    /// Logical row count as seen by callers (swaps with `cols` when transposed).
    pub fn logical_rows(&self) -> usize {
        if self.transposed { self.cols } else { self.rows }
    }

    /// Logical column count as seen by callers (swaps with `rows` when transposed).
    pub fn logical_cols(&self) -> usize {
        if self.transposed { self.rows } else { self.cols }
    }

    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    fn physical_index(&self, logical_row: usize, logical_col: usize) -> usize {
        if self.transposed {
            logical_col * self.cols + logical_row
        } else {
            logical_row * self.cols + logical_col
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[self.physical_index(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        let idx = self.physical_index(row, col);
        self.data[idx] = value;
    }

    /// Flips the transpose flag. The physical buffer is untouched.
    pub fn transpose(&mut self) {
        self.transposed = !self.transposed;
    }

    pub fn transposed_view(&self) -> Matrix {
        let mut m = self.clone();
        m.transpose();
        m
    }

    pub fn set_zero(&mut self) {
        for v in self.data.iter_mut() {
            *v = 0.0;
        }
    }

    /// Zeroes the buffer, then writes 1s along the leading diagonal up to
    /// `min(logical_rows, logical_cols)`. Leaves the transpose flag alone.
    pub fn set_diag(&mut self) {
        self.set_zero();
        let n = self.logical_rows().min(self.logical_cols());
        for i in 0..n {
            self.set(i, i, 1.0);
        }
    }

    pub fn scale(&mut self, s: f32) {
        for v in self.data.iter_mut() {
            *v *= s;
        }
    }

    fn check_same_shape(&self, other: &Matrix, op: &str) -> Result<()> {
        if self.logical_rows() != other.logical_rows() || self.logical_cols() != other.logical_cols() {
            return Err(EstimatorError::ShapeMismatch(format!(
                "{op}: {}x{} vs {}x{}",
                self.logical_rows(),
                self.logical_cols(),
                other.logical_rows(),
                other.logical_cols()
            )));
        }
        Ok(())
    }

    /// `self + other`, respecting each operand's own transpose flag.
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "add")?;
        let mut out = Matrix::zeros(self.logical_rows(), self.logical_cols());
        for r in 0..out.rows {
            for c in 0..out.cols {
                out.set(r, c, self.get(r, c) + other.get(r, c));
            }
        }
        Ok(out)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "sub")?;
        let mut out = Matrix::zeros(self.logical_rows(), self.logical_cols());
        for r in 0..out.rows {
            for c in 0..out.cols {
                out.set(r, c, self.get(r, c) - other.get(r, c));
            }
        }
        Ok(out)
    }

    pub fn add_in_place(&mut self, other: &Matrix) -> Result<()> {
        self.check_same_shape(other, "add_in_place")?;
        for r in 0..self.logical_rows() {
            for c in 0..self.logical_cols() {
                let v = self.get(r, c) + other.get(r, c);
                self.set(r, c, v);
            }
        }
        Ok(())
    }

    pub fn sub_in_place(&mut self, other: &Matrix) -> Result<()> {
        self.check_same_shape(other, "sub_in_place")?;
        for r in 0..self.logical_rows() {
            for c in 0..self.logical_cols() {
                let v = self.get(r, c) - other.get(r, c);
                self.set(r, c, v);
            }
        }
        Ok(())
    }

    pub fn approx_eq(&self, other: &Matrix, eps: f32) -> bool {
        if self.logical_rows() != other.logical_rows() || self.logical_cols() != other.logical_cols() {
            return false;
        }
        for r in 0..self.logical_rows() {
            for c in 0..self.logical_cols() {
                if (self.get(r, c) - other.get(r, c)).abs() > eps {
                    return false;
                }
            }
        }
        true
    }

    /// Dense matrix product `self * other`. All four combinations of
    /// transpose flags on the two operands are handled by `get`, which
    /// already accounts for each matrix's own flag — so the product itself
    /// needs no branching, unlike the historical four-branch C
    /// implementation this is modeled on.
    pub fn prod(&self, other: &Matrix) -> Result<Matrix> {
        if self.logical_cols() != other.logical_rows() {
            return Err(EstimatorError::ShapeMismatch(format!(
                "prod: {}x{} * {}x{}",
                self.logical_rows(),
                self.logical_cols(),
                other.logical_rows(),
                other.logical_cols()
            )));
        }
        let inner = self.logical_cols();
        let mut out = Matrix::zeros(self.logical_rows(), other.logical_cols());
        for r in 0..out.rows {
            for c in 0..out.cols {
                let mut acc = 0.0f32;
                for k in 0..inner {
                    acc += self.get(r, k) * other.get(k, c);
                }
                out.set(r, c, acc);
            }
        }
        Ok(out)
    }

    /// Same as [`Matrix::prod`] but skips inner terms where `self`'s entry is
    /// exactly zero. Correct for any input; a net win when `self` (typically
    /// a measurement or prediction Jacobian) is sparse.
    pub fn sparse_prod(&self, other: &Matrix) -> Result<Matrix> {
        if self.logical_cols() != other.logical_rows() {
            return Err(EstimatorError::ShapeMismatch(format!(
                "sparse_prod: {}x{} * {}x{}",
                self.logical_rows(),
                self.logical_cols(),
                other.logical_rows(),
                other.logical_cols()
            )));
        }
        let inner = self.logical_cols();
        let mut out = Matrix::zeros(self.logical_rows(), other.logical_cols());
        for r in 0..out.rows {
            for k in 0..inner {
                let a = self.get(r, k);
                if a == 0.0 {
                    continue;
                }
                for c in 0..out.cols {
                    let v = out.get(r, c) + a * other.get(k, c);
                    out.set(r, c, v);
                }
            }
        }
        Ok(out)
    }

    fn check_sandwich_shape(&self, b: &Matrix) -> Result<()> {
        if self.logical_cols() != b.logical_rows() || b.logical_cols() != self.logical_cols() {
            return Err(EstimatorError::ShapeMismatch(format!(
                "sandwich: A {}x{}, B {}x{}",
                self.logical_rows(),
                self.logical_cols(),
                b.logical_rows(),
                b.logical_cols()
            )));
        }
        Ok(())
    }

    /// `self * b * self^T`.
    pub fn sandwich(&self, b: &Matrix) -> Result<Matrix> {
        self.check_sandwich_shape(b)?;
        let tmp = self.prod(b)?;
        tmp.prod(&self.transposed_view())
    }

    /// Sparse-aware `self * b * self^T`, using [`Matrix::sparse_prod`] for
    /// both factors.
    pub fn sparse_sandwich(&self, b: &Matrix) -> Result<Matrix> {
        self.check_sandwich_shape(b)?;
        let tmp = self.sparse_prod(b)?;
        tmp.sparse_prod(&self.transposed_view())
    }

    /// Copies a `rows x cols` block from `src` into `self`, placed with its
    /// top-left corner at `(row_off, col_off)`. Only correct when `self` is
    /// not transposed, matching the source library's own constraint — the
    /// write is expressed as the physical memcpy-per-row it models, which
    /// only makes sense against a row-major destination.
    pub fn write_submatrix(
        &mut self,
        row_off: usize,
        col_off: usize,
        src: &Matrix,
    ) -> Result<()> {
        if self.transposed {
            return Err(EstimatorError::ShapeMismatch(
                "write_submatrix requires a non-transposed destination".into(),
            ));
        }
        if row_off + src.logical_rows() > self.logical_rows()
            || col_off + src.logical_cols() > self.logical_cols()
        {
            return Err(EstimatorError::ShapeMismatch(format!(
                "write_submatrix: {}x{} block at ({row_off},{col_off}) does not fit in {}x{}",
                src.logical_rows(),
                src.logical_cols(),
                self.logical_rows(),
                self.logical_cols()
            )));
        }
        for r in 0..src.logical_rows() {
            for c in 0..src.logical_cols() {
                self.set(row_off + r, col_off + c, src.get(r, c));
            }
        }
        Ok(())
    }

    /// Gauss-Jordan inversion via an augmented `[A | I]` workspace. No
    /// partial pivoting — fails with `SingularMatrix` on a zero pivot rather
    /// than searching for a better row, matching the deliberately simple
    /// source algorithm this generalizes.
    pub fn inverse(&self) -> Result<Matrix> {
        let n = self.logical_rows();
        if n != self.logical_cols() {
            return Err(EstimatorError::ShapeMismatch(format!(
                "inverse: matrix is {}x{}, must be square",
                self.logical_rows(),
                self.logical_cols()
            )));
        }

        let mut aug = vec![0.0f32; n * 2 * n];
        for r in 0..n {
            for c in 0..n {
                aug[r * 2 * n + c] = self.get(r, c);
            }
            aug[r * 2 * n + n + r] = 1.0;
        }

        for pivot in 0..n {
            let p = aug[pivot * 2 * n + pivot];
            if p.abs() < 1e-9 {
                return Err(EstimatorError::SingularMatrix);
            }
            let inv_p = 1.0 / p;
            for c in 0..2 * n {
                aug[pivot * 2 * n + c] *= inv_p;
            }
            for r in 0..n {
                if r == pivot {
                    continue;
                }
                let factor = aug[r * 2 * n + pivot];
                if factor == 0.0 {
                    continue;
                }
                for c in 0..2 * n {
                    aug[r * 2 * n + c] -= factor * aug[pivot * 2 * n + c];
                }
            }
        }

        let mut out = Matrix::zeros(n, n);
        for r in 0..n {
            for c in 0..n {
                out.set(r, c, aug[r * 2 * n + n + c]);
            }
        }
        Ok(out)
    }
}
