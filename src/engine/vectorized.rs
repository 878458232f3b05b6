//! Vectorized engine: group sums for all labelings in two matrix products.
//!
//! With X the M × N feature matrix and P the N × K(P+1) indicator matrix,
//! `S = X·P` holds every group sum and `Q = (X∘X)·P` every group sum of
//! squares. Group sizes are the column sums of P. X is centred per row
//! first, which leaves every statistic unchanged.

use crate::engine::{
    center_rows, check_inputs, evaluate, GroupMoments, Spread, Statistic, StatisticEngine,
    VARIANCE_EPSILON,
};
use crate::error::Result;
use crate::permutation::PermutationMatrix;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Dense matrix-product engine on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorizedEngine;

impl StatisticEngine for VectorizedEngine {
    fn name(&self) -> &'static str {
        "vectorized"
    }

    fn permutation_statistics(
        &self,
        features: &DMatrix<f64>,
        perms: &PermutationMatrix,
        statistic: Statistic,
    ) -> Result<DMatrix<f64>> {
        check_inputs(features, perms, statistic)?;
        let (centered, totals) = center_rows(features);
        let sums = &centered * perms.matrix();
        let sq_sums = centered.component_mul(&centered) * perms.matrix();
        Ok(derive_statistics(
            &sums,
            &sq_sums,
            &totals,
            perms,
            statistic,
            VARIANCE_EPSILON,
        ))
    }
}

/// Turn group sums and sums of squares into the M × (P+1) statistic matrix.
///
/// Shared with the accelerated engine, which computes the two products on a
/// device. `totals` are the per-row sums of squares from `center_rows`;
/// `tolerance` depends on the precision the products were computed in.
pub(crate) fn derive_statistics(
    sums: &DMatrix<f64>,
    sq_sums: &DMatrix<f64>,
    totals: &[f64],
    perms: &PermutationMatrix,
    statistic: Statistic,
    tolerance: f64,
) -> DMatrix<f64> {
    let n_features = sums.nrows();
    let n_labelings = perms.n_labelings();
    let n_groups = perms.n_groups();
    let counts = perms.group_counts();
    let n_samples = perms.n_samples() as f64;
    let spreads: Vec<Spread> = totals
        .iter()
        .map(|&t| Spread::new(t, n_samples, tolerance))
        .collect();

    // one column of the output per labeling, computed in parallel
    let columns: Vec<Vec<f64>> = (0..n_labelings)
        .into_par_iter()
        .map(|p| {
            let cols: Vec<usize> = (0..n_groups).map(|g| perms.group_column(p, g)).collect();
            let mut groups = vec![GroupMoments::default(); n_groups];
            (0..n_features)
                .map(|i| {
                    let spread = &spreads[i];
                    for (g, &c) in cols.iter().enumerate() {
                        groups[g] =
                            GroupMoments::from_sums(counts[c], sums[(i, c)], sq_sums[(i, c)], spread);
                    }
                    evaluate(statistic, &groups, spread)
                })
                .collect()
        })
        .collect();

    DMatrix::from_fn(n_features, n_labelings, |i, p| columns[p][i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Categories;
    use crate::engine::NaiveEngine;
    use crate::permutation::{categorical_permutations, reciprocal_permutations};
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_constant_groups() {
        let mut labels = vec![0; 5];
        labels.extend(vec![1; 5]);
        let cats = Categories::new(&labels).unwrap();
        let perms = reciprocal_permutations(&cats, 100, 42).unwrap();
        let x = DMatrix::from_fn(2, 10, |i, j| if j < 5 { 0.0 } else { 10.0 * (i + 1) as f64 });
        let stats = VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap();
        assert_eq!(stats.shape(), (2, 101));
        assert_relative_eq!(stats[(0, 0)], 10.0, epsilon = 1e-12);
        assert_relative_eq!(stats[(1, 0)], 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_range_rows() {
        // row values 0..9, first half group 0: mean(5..9) - mean(0..4) = 5
        let labels: Vec<usize> = (0..10).map(|j| if j < 5 { 0 } else { 1 }).collect();
        let cats = Categories::new(&labels).unwrap();
        let perms = reciprocal_permutations(&cats, 10, 0).unwrap();
        let x = DMatrix::from_fn(3, 10, |_, j| j as f64);
        let stats = VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap();
        for i in 0..3 {
            assert_relative_eq!(stats[(i, 0)], 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_offset_matches_naive() {
        let cats = Categories::new(&[0, 0, 0, 0, 1, 1, 1, 1]).unwrap();
        let perms = categorical_permutations(&cats, 40, 8).unwrap();
        let x = DMatrix::from_row_slice(1, 8, &[0.0, 0.5, -0.5, 0.2, 1.0, 1.5, 0.5, 1.2])
            .add_scalar(1e6);
        for statistic in [Statistic::T, Statistic::F] {
            let v = VectorizedEngine.permutation_statistics(&x, &perms, statistic).unwrap();
            let n = NaiveEngine.permutation_statistics(&x, &perms, statistic).unwrap();
            for (a, b) in v.iter().zip(n.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-7, max_relative = 1e-7);
            }
        }
        let t = VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::T)
            .unwrap();
        assert_relative_eq!(t[(0, 0)], 3.36463292455, epsilon = 1e-8);
    }

    #[test]
    fn test_constant_fractional_groups() {
        // all-0.1 against all-0.3: zero within-group variance, distinct means
        let cats = Categories::new(&[0, 0, 0, 1, 1, 1]).unwrap();
        let perms = categorical_permutations(&cats, 10, 2).unwrap();
        let x = DMatrix::from_row_slice(1, 6, &[0.1, 0.1, 0.1, 0.3, 0.3, 0.3]);
        let stats = VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::T)
            .unwrap();
        assert_eq!(stats[(0, 0)], f64::INFINITY);
    }

    #[test]
    fn test_rejects_sample_mismatch() {
        let cats = Categories::new(&[0, 0, 1, 1]).unwrap();
        let perms = categorical_permutations(&cats, 5, 1).unwrap();
        let x = DMatrix::zeros(2, 5);
        assert!(VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::T)
            .unwrap_err()
            .is_dimension_error());
    }

    #[test]
    fn test_mean_rejects_three_groups() {
        let cats = Categories::new(&[0, 1, 2, 0, 1, 2]).unwrap();
        let perms = categorical_permutations(&cats, 5, 1).unwrap();
        let x = DMatrix::zeros(1, 6);
        assert!(VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .is_err());
        assert!(VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::F)
            .is_ok());
    }
}
