//! Closure: rescale compositions so each sums to one.

use crate::data::Composition;
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;

/// Divide every composition by its total.
///
/// The output has the same shape as the input and every row sums to 1.
///
/// # Formula
/// For row i: C(x)_ij = x_ij / sum_k(x_ik)
///
/// # Errors
/// Fails with a domain error if a part is negative or not finite, or if a
/// row sums to zero.
///
/// # Example
/// ```
/// use coda_perm::composition::closure;
/// use coda_perm::data::Composition;
///
/// let x = Composition::from_rows(&[vec![2.0, 2.0, 6.0], vec![4.0, 4.0, 2.0]]).unwrap();
/// let c = closure(&x).unwrap();
/// assert!((c.get(0, 2) - 0.6).abs() < 1e-12);
/// ```
pub fn closure(data: &Composition) -> Result<Composition> {
    Ok(data.with_data(close_matrix(data.matrix())?))
}

/// Row-wise closure of a samples × parts matrix.
pub(crate) fn close_matrix(mat: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (n_rows, n_parts) = mat.shape();
    let mut closed = mat.clone();

    for i in 0..n_rows {
        let mut total = 0.0;
        for j in 0..n_parts {
            let val = mat[(i, j)];
            if val < 0.0 || !val.is_finite() {
                return Err(CodaError::Domain(format!(
                    "Closure requires non-negative finite parts; found {} at ({}, {})",
                    val, i, j
                )));
            }
            total += val;
        }
        if total <= 0.0 {
            return Err(CodaError::Domain(format!(
                "Row {} sums to zero and cannot be closed",
                i
            )));
        }
        for j in 0..n_parts {
            closed[(i, j)] /= total;
        }
    }

    Ok(closed)
}
