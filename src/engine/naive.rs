//! Reference engine: recompute every group from the raw values.

use crate::engine::{
    center_rows, check_inputs, evaluate, GroupMoments, Spread, Statistic, StatisticEngine,
    VARIANCE_EPSILON,
};
use crate::error::Result;
use crate::permutation::PermutationMatrix;
use nalgebra::DMatrix;

/// Loops over labelings and features, one group at a time.
///
/// Slow, but each statistic is computed directly from the values, which
/// makes it the baseline the other engines are checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveEngine;

impl StatisticEngine for NaiveEngine {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn permutation_statistics(
        &self,
        features: &DMatrix<f64>,
        perms: &PermutationMatrix,
        statistic: Statistic,
    ) -> Result<DMatrix<f64>> {
        check_inputs(features, perms, statistic)?;
        let n_features = features.nrows();
        let n_samples = features.ncols();
        let n_groups = perms.n_groups();
        let (centered, totals) = center_rows(features);
        let spreads: Vec<Spread> = totals
            .iter()
            .map(|&t| Spread::new(t, n_samples as f64, VARIANCE_EPSILON))
            .collect();

        let mut stats = DMatrix::zeros(n_features, perms.n_labelings());
        let mut groups = vec![GroupMoments::default(); n_groups];
        for p in 0..perms.n_labelings() {
            let members: Vec<Vec<usize>> = (0..n_groups)
                .map(|g| {
                    (0..n_samples)
                        .filter(|&s| perms.is_member(s, p, g))
                        .collect()
                })
                .collect();

            for i in 0..n_features {
                let row = centered.row(i);
                let spread = &spreads[i];
                for (g, idx) in members.iter().enumerate() {
                    groups[g] = GroupMoments::from_values(idx.iter().map(|&s| row[s]), spread);
                }
                stats[(i, p)] = evaluate(statistic, &groups, spread);
            }
        }
        Ok(stats)
    }
}
