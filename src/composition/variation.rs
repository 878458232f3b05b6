//! Variation matrix and total variation of a compositional data set.

use crate::data::Composition;
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;

/// Compute the D × D variation matrix.
///
/// Entry (i, j) is the population variance, across rows, of `ln(x_i / x_j)`.
/// The matrix is symmetric with a zero diagonal, and does not depend on the
/// closure of the rows.
pub fn variation_matrix(data: &Composition) -> Result<DMatrix<f64>> {
    if data.is_vector() {
        return Err(CodaError::Domain(
            "Variation matrix requires a matrix of compositions, got a single vector".to_string(),
        ));
    }
    data.require_positive("Variation matrix")?;

    let logs = data.matrix().map(f64::ln);
    let n_rows = logs.nrows() as f64;
    let n_parts = logs.ncols();

    let mut variation = DMatrix::zeros(n_parts, n_parts);
    for i in 0..n_parts {
        for j in (i + 1)..n_parts {
            let ratios = logs.column(i) - logs.column(j);
            let mean = ratios.sum() / n_rows;
            let var = ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n_rows;
            variation[(i, j)] = var;
            variation[(j, i)] = var;
        }
    }
    Ok(variation)
}

/// Total variation: the sum of the variation matrix divided by `2D`.
///
/// Equals the mean squared Aitchison distance of the rows to their centre,
/// i.e. the trace of the CLR covariance with a population denominator.
pub fn total_variation(data: &Composition) -> Result<f64> {
    let variation = variation_matrix(data)?;
    Ok(variation.sum() / (2.0 * data.n_parts() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::clr;
    use approx::assert_relative_eq;

    fn sample() -> Composition {
        Composition::from_rows(&[
            vec![0.2, 0.2, 0.6],
            vec![0.4, 0.4, 0.2],
            vec![0.1, 0.5, 0.4],
        ])
        .unwrap()
    }

    #[test]
    fn test_variation_symmetric_zero_diagonal() {
        let v = variation_matrix(&sample()).unwrap();
        for i in 0..3 {
            assert_eq!(v[(i, i)], 0.0);
            for j in 0..3 {
                assert_relative_eq!(v[(i, j)], v[(j, i)], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_variation_known_pair() {
        // parts 0 and 1 are equal in the first two rows, ln(0.1 / 0.5) in the third
        let v = variation_matrix(&sample()).unwrap();
        let r = (0.2f64).ln();
        let mean = r / 3.0;
        let expected = (2.0 * mean * mean + (r - mean).powi(2)) / 3.0;
        assert_relative_eq!(v[(0, 1)], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_total_variation_matches_clr_variance() {
        let x = sample();
        let c = clr(&x).unwrap();
        let n = c.nrows() as f64;
        let mut trace = 0.0;
        for j in 0..c.ncols() {
            let col = c.column(j);
            let mean = col.sum() / n;
            trace += col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        }
        assert_relative_eq!(total_variation(&x).unwrap(), trace, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_rows_have_no_variation() {
        let x = Composition::from_rows(&[vec![1.0, 2.0, 3.0], vec![2.0, 4.0, 6.0]]).unwrap();
        assert_relative_eq!(total_variation(&x).unwrap(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_variation_rejects_vector() {
        let x = Composition::from_vector(&[0.2, 0.3, 0.5]).unwrap();
        assert!(matches!(variation_matrix(&x), Err(CodaError::Domain(_))));
    }
}
