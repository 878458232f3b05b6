//! Permutation hypothesis testing for differential abundance.

pub mod pvalue;

pub use config::PermutationConfig;
pub use permutation::{permutation_test, permutation_test_quick, run_permutation_test};
pub use pvalue::{empirical_pvalues, Alternative};
