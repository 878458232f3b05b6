//! Multiplicative replacement of zero parts.
//!
//! Log-ratio transforms cannot handle zeros. Unlike an additive pseudocount,
//! multiplicative replacement rescales only the non-zero parts, so the
//! ratios between them are unchanged.

use crate::composition::closure::close_matrix;
use crate::data::Composition;
use crate::error::{CodaError, Result};

/// Replace zeros with a small value and shrink the non-zero parts.
///
/// For a row with `z` zeros, each zero becomes `delta` and every non-zero
/// part is multiplied by `1 - z * delta`; the row is then closed. The
/// default `delta` is `1 / D²` for D parts.
///
/// # Arguments
/// * `data` - Compositions, possibly containing exact zeros
/// * `delta` - Replacement value (detection threshold); `None` for `1 / D²`
///
/// # Errors
/// Negative or non-finite parts fail with [`CodaError::Domain`]. A `delta`
/// that is not positive, or for which `z * delta >= 1` in some row, fails
/// with [`CodaError::InvalidParameter`].
///
/// # Example
/// ```
/// use coda_perm::composition::multiplicative_replacement;
/// use coda_perm::data::Composition;
///
/// let x = Composition::from_vector(&[1.0, 2.0, 3.0, 0.0, 5.0]).unwrap();
/// let r = multiplicative_replacement(&x, None).unwrap();
/// assert!((r.get(0, 3) - 0.00377358).abs() < 1e-6);
/// ```
pub fn multiplicative_replacement(data: &Composition, delta: Option<f64>) -> Result<Composition> {
    let n_parts = data.n_parts();
    let delta = delta.unwrap_or_else(|| 1.0 / (n_parts * n_parts) as f64);
    if delta <= 0.0 || !delta.is_finite() {
        return Err(CodaError::InvalidParameter(format!(
            "Replacement delta must be positive, got {}",
            delta
        )));
    }

    let mut replaced = data.matrix().clone();
    for (i, mut row) in replaced.row_iter_mut().enumerate() {
        if let Some(bad) = row.iter().find(|&&v| v < 0.0 || !v.is_finite()) {
            return Err(CodaError::Domain(format!(
                "Zero replacement requires non-negative finite parts; found {} in row {}",
                bad, i
            )));
        }

        let n_zeros = row.iter().filter(|&&v| v == 0.0).count();
        if n_zeros == 0 {
            continue;
        }
        let shrink = 1.0 - n_zeros as f64 * delta;
        if shrink <= 0.0 {
            return Err(CodaError::InvalidParameter(format!(
                "Row {} has {} zeros; delta {} leaves no mass for the remaining parts",
                i, n_zeros, delta
            )));
        }

        for v in row.iter_mut() {
            *v = if *v == 0.0 { delta } else { *v * shrink };
        }
    }

    Ok(data.with_data(close_matrix(&replaced)?))
}
