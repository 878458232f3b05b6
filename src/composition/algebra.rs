//! Simplex algebra: perturbation, its inverse, powering and the Aitchison
//! inner product.
//!
//! Perturbation is the compositional analogue of vector addition and
//! powering the analogue of scalar multiplication. Both are followed by
//! closure, so compositions that differ only by scale are treated as equal.

use crate::composition::closure::close_matrix;
use crate::composition::logratio::clr_matrix;
use crate::data::Composition;
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;

/// Perturb `x` by `y`: element-wise product followed by closure.
///
/// `y` is either a single composition applied to every row of `x`, or a
/// composition with the same number of rows as `x`.
///
/// # Example
/// ```
/// use coda_perm::composition::{closure, perturb};
/// use coda_perm::data::Composition;
///
/// let x = closure(&Composition::from_vector(&[2.0, 2.0, 6.0]).unwrap()).unwrap();
/// let y = Composition::from_vector(&[1.0, 2.0, 1.0]).unwrap();
/// let p = perturb(&x, &y).unwrap();
/// assert!((p.get(0, 1) - 2.0 / 6.0).abs() < 1e-12);
/// ```
pub fn perturb(x: &Composition, y: &Composition) -> Result<Composition> {
    let y_mat = aligned_operand(x, y, "perturbation")?;
    let product = x.matrix().component_mul(&y_mat);
    Ok(x.with_data(close_matrix(&product)?))
}

/// Inverse perturbation: perturb `x` by the reciprocal of `y`.
///
/// `perturb_inverse(&perturb(&x, &y)?, &y)?` equals `closure(&x)?`.
pub fn perturb_inverse(x: &Composition, y: &Composition) -> Result<Composition> {
    let y_mat = aligned_operand(x, y, "inverse perturbation")?;
    if let Some(bad) = y_mat.iter().find(|&&v| v <= 0.0 || !v.is_finite()) {
        return Err(CodaError::Domain(format!(
            "Inverse perturbation requires strictly positive parts; found {}",
            bad
        )));
    }
    let quotient = x.matrix().component_div(&y_mat);
    Ok(x.with_data(close_matrix(&quotient)?))
}

/// Power `x` by scalar `p`: element-wise `x^p` followed by closure.
pub fn power(x: &Composition, p: f64) -> Result<Composition> {
    if !p.is_finite() {
        return Err(CodaError::InvalidParameter(format!(
            "Power must be finite, got {}",
            p
        )));
    }
    let powered = x.matrix().map(|v| v.powf(p));
    Ok(x.with_data(close_matrix(&powered)?))
}

/// Aitchison inner product of each row of `x` with the matching row of `y`.
///
/// Computed as the dot product of the CLR coordinates. `y` broadcasts as in
/// [`perturb`]. Both inputs must be strictly positive.
pub fn inner(x: &Composition, y: &Composition) -> Result<Vec<f64>> {
    x.require_positive("Inner product")?;
    y.require_positive("Inner product")?;
    let y_mat = aligned_operand(x, y, "inner product")?;
    let cx = clr_matrix(x.matrix());
    let cy = clr_matrix(&y_mat);
    Ok((0..cx.nrows())
        .map(|i| cx.row(i).dot(&cy.row(i)))
        .collect())
}

/// Bring `y` to the row count of `x`, broadcasting a single row.
fn aligned_operand(x: &Composition, y: &Composition, operation: &str) -> Result<DMatrix<f64>> {
    if x.n_parts() != y.n_parts() {
        return Err(CodaError::dimension(
            format!("parts of {} operand", operation),
            x.n_parts(),
            y.n_parts(),
        ));
    }
    if y.n_rows() == x.n_rows() {
        Ok(y.matrix().clone())
    } else if y.n_rows() == 1 {
        Ok(Composition::broadcast_row(&y.matrix().row(0).into_owned(), x.n_rows()))
    } else {
        Err(CodaError::dimension(
            format!("rows of {} operand", operation),
            x.n_rows(),
            y.n_rows(),
        ))
    }
}
