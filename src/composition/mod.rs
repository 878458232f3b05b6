//! Compositional data geometry.
//!
//! This module provides the operations of the Aitchison simplex:
//!
//! - **Closure**: rescale rows to sum to one
//! - **Algebra**: perturbation, inverse perturbation, powering, inner product
//! - **Zero replacement**: multiplicative replacement of zero parts
//! - **Log-ratio transforms**: CLR, ILR and their inverses, centring
//! - **Variation**: variation matrix and total variation
//!
//! Every operation returns a new value; inputs are never modified.

pub mod algebra;
pub mod closure;
pub mod logratio;
pub mod variation;
pub mod zero;

pub use algebra::{inner, perturb, perturb_inverse, power};
pub use closure::closure;
pub use logratio::{centralize, clr, clr_inverse, ilr, ilr_basis, ilr_inverse};
pub use variation::{total_variation, variation_matrix};
pub use zero::multiplicative_replacement;
