//! Log-ratio transforms: CLR, ILR and their inverses, plus centring.
//!
//! These map the open simplex onto real coordinate space so ordinary
//! statistics apply. All of them require strictly positive parts; run
//! [`multiplicative_replacement`](crate::composition::multiplicative_replacement)
//! first when the data contain zeros.
//!
//! | Transform | Output per row | Constraint |
//! |-----------|----------------|------------|
//! | CLR | D coordinates | Sums to zero |
//! | ILR | D − 1 coordinates | None (isometric) |

use crate::composition::algebra::perturb_inverse;
use crate::composition::closure::close_matrix;
use crate::data::Composition;
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;

/// Apply the centered log-ratio transformation.
///
/// # Formula
/// For row i: CLR(x_ij) = ln(x_ij) − mean_k(ln(x_ik))
///
/// Returns an N × D matrix (1 × D for vector input) whose rows sum to zero.
///
/// # Errors
/// Non-positive or non-finite parts fail with [`CodaError::Domain`]; the
/// transform never emits `-inf` or `NaN`.
pub fn clr(data: &Composition) -> Result<DMatrix<f64>> {
    data.require_positive("CLR")?;
    Ok(clr_matrix(data.matrix()))
}

/// Inverse CLR: exponentiate and close.
pub fn clr_inverse(coords: &DMatrix<f64>) -> Result<Composition> {
    require_finite_coords(coords, "Inverse CLR")?;
    let closed = close_matrix(&coords.map(f64::exp))?;
    Composition::from_matrix(closed)
}

/// Orthonormal basis of the CLR hyperplane for `n_parts` parts.
///
/// Returns a D × (D − 1) matrix. Column j (with i = j + 1) balances the
/// first i parts against part i:
/// `sqrt(i / (i + 1)) * [1/i, ..., 1/i, -1, 0, ..., 0]`.
pub fn ilr_basis(n_parts: usize) -> Result<DMatrix<f64>> {
    if n_parts < 2 {
        return Err(CodaError::InvalidParameter(format!(
            "ILR basis needs at least 2 parts, got {}",
            n_parts
        )));
    }
    let mut basis = DMatrix::zeros(n_parts, n_parts - 1);
    for j in 0..n_parts - 1 {
        let i = (j + 1) as f64;
        let scale = (i / (i + 1.0)).sqrt();
        for k in 0..=j {
            basis[(k, j)] = scale / i;
        }
        basis[(j + 1, j)] = -scale;
    }
    Ok(basis)
}

/// Apply the isometric log-ratio transformation.
///
/// Projects CLR coordinates onto [`ilr_basis`], giving N × (D − 1) real
/// coordinates.
///
/// # Example
/// ```
/// use coda_perm::composition::{closure, ilr};
/// use coda_perm::data::Composition;
///
/// let e = std::f64::consts::E;
/// let x = closure(&Composition::from_rows(&[vec![e, 1.0, 1.0]]).unwrap()).unwrap();
/// let z = ilr(&x).unwrap();
/// assert!((z[(0, 0)] - 0.70710678).abs() < 1e-8);
/// assert!((z[(0, 1)] - 0.40824829).abs() < 1e-8);
/// ```
pub fn ilr(data: &Composition) -> Result<DMatrix<f64>> {
    let basis = ilr_basis(data.n_parts())?;
    Ok(clr(data)? * basis)
}

/// Inverse ILR: map N × (D − 1) coordinates back onto the simplex.
///
/// `ilr_inverse(&ilr(&x)?)?` recovers `closure(&x)?`.
pub fn ilr_inverse(coords: &DMatrix<f64>) -> Result<Composition> {
    if coords.nrows() == 0 || coords.ncols() == 0 {
        return Err(CodaError::EmptyData(
            "ILR coordinates are empty".to_string(),
        ));
    }
    require_finite_coords(coords, "Inverse ILR")?;
    let basis = ilr_basis(coords.ncols() + 1)?;
    let clr_coords = coords * basis.transpose();
    clr_inverse(&clr_coords)
}

/// Centre compositions at their geometric-mean composition.
///
/// The centre is the closed, exponentiated column mean of the log parts;
/// every row is then inverse-perturbed by it, so the centred data have the
/// uniform composition as their centre.
///
/// # Errors
/// Vector input fails with [`CodaError::Domain`] because a centre needs a
/// collection of rows.
pub fn centralize(data: &Composition) -> Result<Composition> {
    if data.is_vector() {
        return Err(CodaError::Domain(
            "Centralize requires a matrix of compositions, got a single vector".to_string(),
        ));
    }
    data.require_positive("Centralize")?;

    let n_rows = data.n_rows() as f64;
    let log_means = data.matrix().map(f64::ln).row_sum() / n_rows;
    let center = close_matrix(&DMatrix::from_row_slice(
        1,
        data.n_parts(),
        &log_means.iter().map(|v| v.exp()).collect::<Vec<_>>(),
    ))?;

    perturb_inverse(data, &Composition::from_matrix(center)?)
}

/// CLR without validation; callers check positivity.
pub(crate) fn clr_matrix(mat: &DMatrix<f64>) -> DMatrix<f64> {
    let mut logs = mat.map(f64::ln);
    let n_parts = mat.ncols() as f64;
    for mut row in logs.row_iter_mut() {
        let mean = row.sum() / n_parts;
        row.add_scalar_mut(-mean);
    }
    logs
}

fn require_finite_coords(coords: &DMatrix<f64>, operation: &str) -> Result<()> {
    if let Some(bad) = coords.iter().find(|v| !v.is_finite()) {
        return Err(CodaError::Domain(format!(
            "{} requires finite coordinates; found {}",
            operation, bad
        )));
    }
    Ok(())
}
