//! Dense compositional arrays with a runtime rank.
//!
//! A [`Composition`] stores one or more compositions as the rows of an
//! N × D matrix (N samples, D parts). Inputs that arrive as a single vector
//! keep that shape through every transform, so a rank-1 input produces a
//! rank-1 output.

use crate::error::{CodaError, Result};
use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

/// Rank of the array a composition was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// A single composition (rank 1).
    Vector,
    /// A collection of row compositions (rank 2).
    Matrix,
}

/// One or more compositions stored row-wise (samples × parts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    data: DMatrix<f64>,
    shape: Shape,
}

impl Composition {
    /// Build a rank-1 composition from its parts.
    pub fn from_vector(parts: &[f64]) -> Result<Self> {
        if parts.is_empty() {
            return Err(CodaError::EmptyData(
                "Composition has no parts".to_string(),
            ));
        }
        Ok(Self {
            data: DMatrix::from_row_slice(1, parts.len(), parts),
            shape: Shape::Vector,
        })
    }

    /// Build a rank-2 composition from rows of equal length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n_rows = rows.len();
        if n_rows == 0 {
            return Err(CodaError::EmptyData(
                "Composition has no rows".to_string(),
            ));
        }
        let n_parts = rows[0].as_ref().len();
        if n_parts == 0 {
            return Err(CodaError::EmptyData(
                "Composition has no parts".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(n_rows * n_parts);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_parts {
                return Err(CodaError::dimension(
                    format!("row {} of composition", i),
                    n_parts,
                    row.len(),
                ));
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            data: DMatrix::from_row_slice(n_rows, n_parts, &flat),
            shape: Shape::Matrix,
        })
    }

    /// Wrap an existing samples × parts matrix.
    pub fn from_matrix(data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(CodaError::EmptyData(
                "Composition matrix is empty".to_string(),
            ));
        }
        Ok(Self {
            data,
            shape: Shape::Matrix,
        })
    }

    /// Build from an arbitrary array shape and row-major data.
    ///
    /// Only rank 1 (`[D]`) and rank 2 (`[N, D]`) shapes are accepted; any
    /// other rank (including scalars and 3-D arrays such as `[1, 1, 5]`)
    /// fails with [`CodaError::UnsupportedRank`].
    pub fn from_shape(shape: &[usize], data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        match shape.len() {
            1 | 2 => {}
            rank => return Err(CodaError::UnsupportedRank(rank)),
        }
        if data.len() != expected {
            return Err(CodaError::dimension(
                format!("array data for shape {:?}", shape),
                expected,
                data.len(),
            ));
        }
        if shape.len() == 1 {
            Self::from_vector(&data)
        } else {
            if expected == 0 {
                return Err(CodaError::EmptyData(
                    "Composition matrix is empty".to_string(),
                ));
            }
            Ok(Self {
                data: DMatrix::from_row_slice(shape[0], shape[1], &data),
                shape: Shape::Matrix,
            })
        }
    }

    /// Shape tag of the original input.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Whether this is a single rank-1 composition.
    pub fn is_vector(&self) -> bool {
        self.shape == Shape::Vector
    }

    /// Number of compositions (1 for a vector).
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of parts per composition.
    pub fn n_parts(&self) -> usize {
        self.data.ncols()
    }

    /// Get a part value.
    pub fn get(&self, row: usize, part: usize) -> f64 {
        self.data[(row, part)]
    }

    /// Get a row as a vector.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().cloned().collect()
    }

    /// All rows as vectors.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_rows()).map(|i| self.row(i)).collect()
    }

    /// Row sums (one per composition).
    pub fn row_sums(&self) -> Vec<f64> {
        self.data.row_iter().map(|r| r.sum()).collect()
    }

    /// Get reference to the underlying samples × parts matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Consume into the underlying matrix.
    pub fn into_matrix(self) -> DMatrix<f64> {
        self.data
    }

    /// Flattened row-major values (the shape of the original input).
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.transpose().iter().cloned().collect()
    }

    /// Replace the data while keeping this composition's shape tag.
    pub(crate) fn with_data(&self, data: DMatrix<f64>) -> Self {
        Self {
            data,
            shape: self.shape,
        }
    }

    /// A copy of `row` broadcast to `n_rows` rows.
    pub(crate) fn broadcast_row(row: &RowDVector<f64>, n_rows: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n_rows, row.len(), |_, j| row[j])
    }

    /// Fail with a domain error unless every part is strictly positive and finite.
    pub(crate) fn require_positive(&self, operation: &str) -> Result<()> {
        for i in 0..self.n_rows() {
            for j in 0..self.n_parts() {
                let val = self.data[(i, j)];
                if val <= 0.0 || !val.is_finite() {
                    return Err(CodaError::Domain(format!(
                        "{} requires strictly positive parts; found {} at ({}, {})",
                        operation, val, i, j
                    )));
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Vec<f64>>> for Composition {
    type Error = CodaError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(&rows)
    }
}

impl TryFrom<Vec<f64>> for Composition {
    type Error = CodaError;

    fn try_from(parts: Vec<f64>) -> Result<Self> {
        Self::from_vector(&parts)
    }
}
