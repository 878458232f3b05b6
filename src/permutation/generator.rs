//! Label-permutation matrices.
//!
//! A permutation matrix stacks, for the observed labeling and for P random
//! relabelings, an N × K indicator block of group membership. Block 0 is
//! always the observed labeling, so column order must never be changed by
//! a consumer.
//!
//! ```text
//!             perm 0 (observed)   perm 1          ...   perm P
//! sample 0  [ g0 g1 .. gK-1     | g0 g1 .. gK-1 | ... |          ]
//! sample 1  [                   |               |     |          ]
//! ```

use crate::data::Categories;
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Layout of the indicator blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermutationKind {
    /// One-hot blocks `[g0, g1, .., gK-1]` for any number of groups.
    Categorical,
    /// Two groups only; each block pairs the group-1 indicator with its
    /// complement: `[g1, g0]`.
    Reciprocal,
}

/// N × K·(P+1) group-indicator matrix.
#[derive(Debug, Clone)]
pub struct PermutationMatrix {
    data: DMatrix<f64>,
    kind: PermutationKind,
    n_groups: usize,
    n_permutations: usize,
}

impl PermutationMatrix {
    /// Layout of the blocks.
    pub fn kind(&self) -> PermutationKind {
        self.kind
    }

    /// Number of groups (K).
    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    /// Number of random relabelings (P), excluding the observed one.
    pub fn n_permutations(&self) -> usize {
        self.n_permutations
    }

    /// Number of labelings including the observed one (P + 1).
    pub fn n_labelings(&self) -> usize {
        self.n_permutations + 1
    }

    /// Number of samples (N).
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Column holding the indicator of `group` under labeling `perm`.
    #[inline]
    pub fn group_column(&self, perm: usize, group: usize) -> usize {
        match self.kind {
            PermutationKind::Categorical => perm * self.n_groups + group,
            PermutationKind::Reciprocal => perm * 2 + (1 - group),
        }
    }

    /// Whether `sample` belongs to `group` under labeling `perm`.
    #[inline]
    pub fn is_member(&self, sample: usize, perm: usize, group: usize) -> bool {
        self.data[(sample, self.group_column(perm, group))] > 0.5
    }

    /// Group label of every sample under labeling `perm`.
    pub fn labels(&self, perm: usize) -> Vec<usize> {
        (0..self.n_samples())
            .map(|s| {
                (0..self.n_groups)
                    .find(|&g| self.is_member(s, perm, g))
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Column sums: the size of every group under every labeling.
    pub fn group_counts(&self) -> Vec<f64> {
        self.data.row_sum().iter().cloned().collect()
    }

    /// Get reference to the underlying indicator matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

/// One-hot permutation blocks for any number of groups.
///
/// With `permutations = 0` the result is the one-hot encoding of the
/// observed labels alone.
pub fn categorical_permutations(
    categories: &Categories,
    permutations: usize,
    seed: u64,
) -> Result<PermutationMatrix> {
    let k = categories.n_levels();
    let data = stack_blocks(categories, permutations, seed, k, |block, row, code| {
        block[(row, code)] = 1.0;
    });
    Ok(PermutationMatrix {
        data,
        kind: PermutationKind::Categorical,
        n_groups: k,
        n_permutations: permutations,
    })
}

/// Reciprocal permutation blocks for a two-group design.
///
/// Every block holds a labeling and its complement, so a two-sample
/// statistic sees both test directions.
pub fn reciprocal_permutations(
    categories: &Categories,
    permutations: usize,
    seed: u64,
) -> Result<PermutationMatrix> {
    if categories.n_levels() != 2 {
        return Err(CodaError::InvalidParameter(format!(
            "Reciprocal permutations need exactly 2 groups, got {}",
            categories.n_levels()
        )));
    }
    let data = stack_blocks(categories, permutations, seed, 2, |block, row, code| {
        block[(row, 1 - code)] = 1.0;
    });
    Ok(PermutationMatrix {
        data,
        kind: PermutationKind::Reciprocal,
        n_groups: 2,
        n_permutations: permutations,
    })
}

/// Build permutations of the requested kind.
pub fn build_permutations(
    categories: &Categories,
    kind: PermutationKind,
    permutations: usize,
    seed: u64,
) -> Result<PermutationMatrix> {
    match kind {
        PermutationKind::Categorical => categorical_permutations(categories, permutations, seed),
        PermutationKind::Reciprocal => reciprocal_permutations(categories, permutations, seed),
    }
}

/// Write the observed block, then one block per Fisher-Yates shuffle.
fn stack_blocks<F>(
    categories: &Categories,
    permutations: usize,
    seed: u64,
    width: usize,
    mark: F,
) -> DMatrix<f64>
where
    F: Fn(&mut nalgebra::DMatrixViewMut<'_, f64>, usize, usize),
{
    let n = categories.len();
    let mut data = DMatrix::zeros(n, width * (permutations + 1));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut labels = categories.codes().to_vec();

    for m in 0..=permutations {
        {
            let mut block = data.columns_mut(m * width, width);
            for (row, &code) in labels.iter().enumerate() {
                mark(&mut block, row, code);
            }
        }
        if m < permutations {
            labels.shuffle(&mut rng);
        }
    }
    data
}
