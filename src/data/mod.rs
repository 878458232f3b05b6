//! Data structures for compositional analysis and permutation testing.

mod categories;
mod composition;
mod feature_matrix;
mod result;

pub use categories::Categories;
pub use composition::{Composition, Shape};
pub use feature_matrix::FeatureMatrix;
pub use result::{FeatureResult, PermutationResults};
