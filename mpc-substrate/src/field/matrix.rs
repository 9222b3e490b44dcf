use crate::codec::{ROW_SEPARATOR, join_parts, split_parts};
use crate::errors::MpcError;
use crate::field::{Fp, Vector};

use std::fmt;

use rand::Rng;

use serde::{Deserialize, Serialize};

/// An `m x n` grid of field elements stored as `m` rows of equal length.
///
/// Rows are never exposed mutably as whole vectors, so the grid stays
/// rectangular for the lifetime of the value.
///
/// The derived `==` is structural and answers `false` for different shapes.
/// Protocol code compares with [`Matrix::equals`], which fails on a shape
/// mismatch instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matrix<const P: u64> {
    rows: Vec<Vector<Fp<P>>>,
}

impl<const P: u64> Matrix<P> {
    /// A zero-filled `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Vector::zeros(cols)).collect(),
        }
    }

    /// A `rows x cols` matrix with each cell drawn uniformly from the field.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self {
            rows: (0..rows).map(|_| Vector::random(cols, rng)).collect(),
        }
    }

    /// Builds a matrix from already constructed rows.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::DimensionMismatch` if the rows differ in length.
    pub fn from_rows(rows: Vec<Vector<Fp<P>>>) -> Result<Self, MpcError> {
        if let Some(first) = rows.first() {
            let n = first.len();
            for (i, row) in rows.iter().enumerate() {
                if row.len() != n {
                    return Err(MpcError::DimensionMismatch(format!(
                        "Row {} has length {} but expected {}",
                        i,
                        row.len(),
                        n
                    )));
                }
            }
        }
        Ok(Self { rows })
    }

    /// The `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            rows: (0..n)
                .map(|i| (0..n).map(|j| Fp::new(u64::from(i == j))).collect())
                .collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns, read off the first row. Zero for an empty matrix.
    pub fn num_cols(&self) -> usize {
        self.rows.first().map_or(0, Vector::len)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_cols())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Fp<P>, MpcError> {
        self.row(row)?.get(col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: Fp<P>) -> Result<(), MpcError> {
        let len = self.rows.len();
        self.rows
            .get_mut(row)
            .ok_or(MpcError::IndexOutOfBounds { index: row, len })?
            .set(col, value)
    }

    pub fn row(&self, index: usize) -> Result<&Vector<Fp<P>>, MpcError> {
        self.rows.get(index).ok_or(MpcError::IndexOutOfBounds {
            index,
            len: self.rows.len(),
        })
    }

    pub fn rows(&self) -> &[Vector<Fp<P>>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vector<Fp<P>>> {
        self.rows
    }

    /// Re-lays the matrix into a zero-filled `rows x cols` grid, keeping every
    /// cell inside both the old and the new bounds. Cells outside the new
    /// bounds are dropped.
    pub fn set_dims(&mut self, rows: usize, cols: usize) {
        let resized = (0..rows)
            .map(|i| {
                let old = self.rows.get(i).map(Vector::as_slice).unwrap_or_default();
                (0..cols)
                    .map(|j| old.get(j).copied().unwrap_or_default())
                    .collect()
            })
            .collect();
        self.rows = resized;
    }

    fn check_shape(&self, other: &Self, op: &str) -> Result<(), MpcError> {
        if self.shape() != other.shape() {
            return Err(MpcError::DimensionMismatch(format!(
                "Matrix shapes must match for {} ({:?} vs {:?})",
                op,
                self.shape(),
                other.shape()
            )));
        }
        Ok(())
    }

    fn zip_rows(
        &self,
        other: &Self,
        op: &str,
        f: impl Fn(&Vector<Fp<P>>, &Vector<Fp<P>>) -> Result<Vector<Fp<P>>, MpcError>,
    ) -> Result<Self, MpcError> {
        self.check_shape(other, op)?;
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| f(a, b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn negate(&self) -> Self {
        Self {
            rows: self.rows.iter().map(Vector::negate).collect(),
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self, MpcError> {
        self.zip_rows(other, "addition", Vector::add)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, MpcError> {
        self.zip_rows(other, "subtraction", Vector::sub)
    }

    /// Elementwise (Hadamard) product; see [`Matrix::mat_mul`] for the matrix product.
    pub fn mul(&self, other: &Self) -> Result<Self, MpcError> {
        self.zip_rows(other, "multiplication", Vector::mul)
    }

    pub fn add_assign(&mut self, other: &Self) -> Result<&mut Self, MpcError> {
        *self = Matrix::add(self, other)?;
        Ok(self)
    }

    pub fn sub_assign(&mut self, other: &Self) -> Result<&mut Self, MpcError> {
        *self = Matrix::sub(self, other)?;
        Ok(self)
    }

    pub fn mul_assign(&mut self, other: &Self) -> Result<&mut Self, MpcError> {
        *self = Matrix::mul(self, other)?;
        Ok(self)
    }

    /// Shape-checked comparison.
    pub fn equals(&self, other: &Self) -> Result<bool, MpcError> {
        self.check_shape(other, "comparison")?;
        Ok(self.rows == other.rows)
    }

    pub fn transpose(&self) -> Self {
        let (m, n) = self.shape();
        Self {
            rows: (0..n)
                .map(|j| {
                    (0..m)
                        .map(|i| self.rows[i].as_slice()[j])
                        .collect::<Vector<_>>()
                })
                .collect(),
        }
    }

    /// Matrix product `C = AB`.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::DimensionMismatch` if the inner dimensions differ.
    pub fn mat_mul(&self, other: &Self) -> Result<Self, MpcError> {
        if self.num_cols() != other.num_rows() {
            return Err(MpcError::DimensionMismatch(format!(
                "Inner dimensions must match for matrix multiplication ({} vs {})",
                self.num_cols(),
                other.num_rows()
            )));
        }
        let columns = other.transpose();
        let rows = self
            .rows
            .iter()
            .map(|row| columns.rows.iter().map(|col| row.dot(col)).collect())
            .collect::<Result<Vec<Vector<_>>, _>>()?;
        Ok(Self { rows })
    }

    /// A·x where A is `m x n` and x has length `n`.
    pub fn mat_vec_mul(&self, x: &Vector<Fp<P>>) -> Result<Vector<Fp<P>>, MpcError> {
        if self.num_cols() != x.len() {
            return Err(MpcError::DimensionMismatch(format!(
                "Matrix columns ({}) must match vector length ({})",
                self.num_cols(),
                x.len()
            )));
        }
        self.rows.iter().map(|row| row.dot(x)).collect()
    }

    /// Each row's vector encoding, rows joined by `;`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::field::{Fp, Matrix, Vector};
    /// let m = Matrix::<97>::from_rows(vec![
    ///     Vector::from_values(vec![Fp::new(1), Fp::new(2)]),
    ///     Vector::from_values(vec![Fp::new(3), Fp::new(40)]),
    /// ]).unwrap();
    /// assert_eq!(m.to_bytes(), b"1.2;3.40".to_vec());
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        join_parts(self.rows.iter().map(Vector::to_bytes), ROW_SEPARATOR)
    }

    /// Inverse of [`Matrix::to_bytes`] for matrices with at least one column.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MpcError> {
        let rows = split_parts(bytes, ROW_SEPARATOR)
            .into_iter()
            .map(Vector::from_bytes)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(rows)
    }
}

impl<const P: u64> fmt::Display for Matrix<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for row in &self.rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
