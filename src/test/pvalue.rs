//! Empirical p-values from a permutation distribution.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Relative tolerance for ties between a permuted and the observed statistic.
const TIE_TOLERANCE: f64 = 1e-9;

/// Direction of the alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alternative {
    /// |s_k| ≥ |s_0|.
    #[default]
    TwoSided,
    /// s_k ≥ s_0.
    Greater,
    /// s_k ≤ s_0.
    Less,
}

impl Alternative {
    /// Whether permuted statistic `permuted` is at least as extreme as `observed`.
    #[inline]
    pub fn is_extreme(self, permuted: f64, observed: f64) -> bool {
        let (permuted, observed) = match self {
            Alternative::TwoSided => (permuted.abs(), observed.abs()),
            Alternative::Greater => (permuted, observed),
            Alternative::Less => (-permuted, -observed),
        };
        if !observed.is_finite() {
            return permuted >= observed;
        }
        permuted >= observed - TIE_TOLERANCE * observed.abs().max(1.0)
    }
}

/// Empirical p-values for every row of an M × (P+1) statistic matrix.
///
/// Column 0 holds the observed statistic and always counts as extreme, so
/// `p = n_extreme / (P + 1)` lies in `[1/(P+1), 1]`. A NaN observed
/// statistic yields `p = 1` with every column counted.
///
/// Returns `(p_values, n_extreme)`, both index-aligned with the rows.
pub fn empirical_pvalues(stats: &DMatrix<f64>, alternative: Alternative) -> (Vec<f64>, Vec<usize>) {
    let n_labelings = stats.ncols();
    let total = n_labelings as f64;

    stats
        .row_iter()
        .map(|row| {
            let observed = row[0];
            let n_extreme = if observed.is_nan() {
                n_labelings
            } else {
                1 + row
                    .iter()
                    .skip(1)
                    .filter(|&&s| alternative.is_extreme(s, observed))
                    .count()
            };
            (n_extreme as f64 / total, n_extreme)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_observed_always_counted() {
        let stats = DMatrix::from_row_slice(1, 5, &[10.0, 0.0, 1.0, -2.0, 3.0]);
        let (p, n) = empirical_pvalues(&stats, Alternative::TwoSided);
        assert_eq!(n, vec![1]);
        assert_relative_eq!(p[0], 0.2);
    }

    #[test]
    fn test_alternatives() {
        let stats = DMatrix::from_row_slice(1, 6, &[2.0, 3.0, -3.0, 1.0, 2.0, -1.0]);
        let (_, two) = empirical_pvalues(&stats, Alternative::TwoSided);
        let (_, greater) = empirical_pvalues(&stats, Alternative::Greater);
        let (_, less) = empirical_pvalues(&stats, Alternative::Less);
        // |3|, |-3|, |2| and the observed one
        assert_eq!(two, vec![4]);
        // 3, 2 and the observed one
        assert_eq!(greater, vec![3]);
        // -3, 1, 2, -1 and the observed one
        assert_eq!(less, vec![5]);
    }

    #[test]
    fn test_ties_within_tolerance() {
        let stats = DMatrix::from_row_slice(1, 3, &[0.3, 0.1 + 0.2, 0.0]);
        let (_, n) = empirical_pvalues(&stats, Alternative::Greater);
        assert_eq!(n, vec![2]);
    }

    #[test]
    fn test_nan_observed() {
        let stats = DMatrix::from_row_slice(2, 4, &[f64::NAN, 1.0, 2.0, 3.0, 5.0, f64::NAN, 6.0, 1.0]);
        let (p, n) = empirical_pvalues(&stats, Alternative::TwoSided);
        assert_eq!(p[0], 1.0);
        assert_eq!(n[0], 4);
        // NaN permuted statistics never count
        assert_eq!(n[1], 2);
    }

    #[test]
    fn test_infinite_observed() {
        let stats = DMatrix::from_row_slice(1, 4, &[f64::INFINITY, f64::INFINITY, 1e300, 0.0]);
        let (_, n) = empirical_pvalues(&stats, Alternative::Greater);
        assert_eq!(n, vec![2]);
    }

    #[test]
    fn test_pvalue_bounds() {
        let stats = DMatrix::from_fn(3, 101, |i, j| ((i * 31 + j * 17) % 23) as f64 - 11.0);
        let (p, _) = empirical_pvalues(&stats, Alternative::TwoSided);
        for v in p {
            assert!(v >= 1.0 / 101.0 && v <= 1.0);
        }
    }
}
