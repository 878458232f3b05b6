//! Group-label permutations for the permutation test.

pub mod generator;

pub use generator::{
    build_permutations, categorical_permutations, reciprocal_permutations, PermutationKind,
    PermutationMatrix,
};
