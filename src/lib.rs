//! Compositional Data Transforms and Permutation Testing
//!
//! This library maps compositional data (proportions across parts, such as
//! microbiome relative abundances) into real coordinates and tests features
//! for differential abundance between groups with label permutations.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (Composition, FeatureMatrix, Categories, Results)
//! - **composition**: Simplex operations (closure, perturbation, zero replacement, CLR, ILR)
//! - **permutation**: Label-permutation matrices
//! - **engine**: Statistic engines (naive, vectorized, accelerated)
//! - **device**: Compute devices for the accelerated engine
//! - **test**: Permutation test driver, configuration and p-values
//!
//! # Example
//!
//! ```
//! use coda_perm::prelude::*;
//!
//! // Six samples over four parts, one zero
//! let counts = Composition::from_rows(&[
//!     vec![10.0, 20.0, 30.0, 40.0],
//!     vec![12.0, 18.0, 33.0, 37.0],
//!     vec![11.0, 0.0, 29.0, 41.0],
//!     vec![40.0, 20.0, 30.0, 10.0],
//!     vec![38.0, 22.0, 31.0, 9.0],
//!     vec![42.0, 19.0, 28.0, 11.0],
//! ])
//! .unwrap();
//!
//! let replaced = multiplicative_replacement(&counts, None).unwrap();
//! let coords = clr(&replaced).unwrap();
//! let features = FeatureMatrix::from_coordinates(&coords).unwrap();
//! let groups = Categories::new(&["a", "a", "a", "b", "b", "b"]).unwrap();
//!
//! let results = run_permutation_test(&features, &groups, &PermutationConfig::quick()).unwrap();
//! assert_eq!(results.len(), 4);
//! ```

pub mod composition;
pub mod data;
pub mod device;
pub mod engine;
pub mod error;
pub mod permutation;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::composition::{
        centralize, closure, clr, clr_inverse, ilr, ilr_basis, ilr_inverse, inner,
        multiplicative_replacement, perturb, perturb_inverse, power, total_variation,
        variation_matrix,
    };
    pub use crate::data::{
        Categories, Composition, FeatureMatrix, FeatureResult, PermutationResults, Shape,
    };
    pub use crate::device::{
        ComputeDevice, CpuDevice, DeviceContext, DeviceInfo, DeviceKind, DeviceMatrix,
        DeviceSource,
    };
    pub use crate::engine::{
        AcceleratedEngine, Backend, NaiveEngine, Statistic, StatisticEngine, VectorizedEngine,
    };
    pub use crate::error::{CodaError, Result};
    pub use crate::permutation::{
        build_permutations, categorical_permutations, reciprocal_permutations, PermutationKind,
        PermutationMatrix,
    };
    pub use crate::test::{
        empirical_pvalues, permutation_test, permutation_test_quick, run_permutation_test,
        Alternative, PermutationConfig,
    };
}
