//! Statistic engines for the permutation test.
//!
//! An engine evaluates one statistic per feature under every labeling held
//! by a [`PermutationMatrix`], giving an M × (P+1) matrix whose column 0 is
//! the observed statistic. Three interchangeable backends are provided:
//!
//! - [`NaiveEngine`]: explicit loops, one labeling and one feature at a time
//! - [`VectorizedEngine`]: two dense products `X·P` and `(X∘X)·P`
//! - [`AcceleratedEngine`]: the same products on a [`ComputeDevice`]
//!
//! All backends share the group-moment arithmetic below, so they agree on
//! degenerate cases (zero variance, equal means).
//!
//! [`ComputeDevice`]: crate::device::ComputeDevice

pub mod accelerated;
pub mod naive;
pub mod vectorized;

pub use accelerated::AcceleratedEngine;
pub use naive::NaiveEngine;
pub use vectorized::VectorizedEngine;

use crate::error::{CodaError, Result};
use crate::permutation::PermutationMatrix;
use crate::test::pvalue::{empirical_pvalues, Alternative};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of a row's total sum of squares below which a within-group sum
/// of squares counts as zero, for f64 arithmetic.
pub(crate) const VARIANCE_EPSILON: f64 = 1e-12;

/// Degeneracy tolerance for arithmetic with the given unit roundoff.
///
/// Scales [`VARIANCE_EPSILON`] so that f32 devices get a proportionally
/// looser threshold.
pub(crate) fn variance_tolerance(unit_roundoff: f64) -> f64 {
    VARIANCE_EPSILON * (unit_roundoff / f64::EPSILON).max(1.0)
}

/// Per-feature test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Difference of group means, `mean(g1) - mean(g0)`.
    #[default]
    Mean,
    /// Welch's t statistic for `g1` against `g0`.
    T,
    /// One-way ANOVA F statistic across all groups.
    F,
}

impl Statistic {
    /// Minimum number of samples every group must hold.
    pub fn min_group_size(self) -> usize {
        match self {
            Statistic::Mean => 1,
            Statistic::T => 2,
            Statistic::F => 1,
        }
    }

    /// Alternative actually used for p-values; F is one-sided by construction.
    pub fn effective_alternative(self, requested: Alternative) -> Alternative {
        match self {
            Statistic::F => Alternative::Greater,
            _ => requested,
        }
    }

    /// Check that a permutation matrix has a usable group count.
    pub(crate) fn check_groups(self, perms: &PermutationMatrix) -> Result<()> {
        let k = perms.n_groups();
        let ok = match self {
            Statistic::Mean | Statistic::T => k == 2,
            Statistic::F => k >= 2,
        };
        if !ok {
            return Err(CodaError::InvalidParameter(format!(
                "{} statistic cannot be computed for {} groups",
                self, k
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean difference"),
            Self::T => write!(f, "Welch t"),
            Self::F => write!(f, "ANOVA F"),
        }
    }
}

/// Execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Naive,
    #[default]
    Vectorized,
    Accelerated,
}

/// Computes permutation statistics for a feature matrix.
pub trait StatisticEngine: Send + Sync {
    /// Short engine name, recorded in results.
    fn name(&self) -> &'static str;

    /// Statistic of every feature under every labeling.
    ///
    /// `features` is M × N; `perms` must hold N samples. Returns an
    /// M × (P+1) matrix with the observed statistic in column 0.
    fn permutation_statistics(
        &self,
        features: &DMatrix<f64>,
        perms: &PermutationMatrix,
        statistic: Statistic,
    ) -> Result<DMatrix<f64>>;

    /// Observed statistics and empirical p-values, one per feature.
    fn test(
        &self,
        features: &DMatrix<f64>,
        perms: &PermutationMatrix,
        statistic: Statistic,
        alternative: Alternative,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let stats = self.permutation_statistics(features, perms, statistic)?;
        let (p_values, _) =
            empirical_pvalues(&stats, statistic.effective_alternative(alternative));
        Ok((stats.column(0).iter().cloned().collect(), p_values))
    }
}

/// Shared argument checks for every engine.
pub(crate) fn check_inputs(
    features: &DMatrix<f64>,
    perms: &PermutationMatrix,
    statistic: Statistic,
) -> Result<()> {
    if features.ncols() != perms.n_samples() {
        return Err(CodaError::dimension(
            "feature matrix columns vs permutation samples",
            perms.n_samples(),
            features.ncols(),
        ));
    }
    statistic.check_groups(perms)
}

/// Subtract each row's mean, returning the centred rows and their total
/// sums of squares.
///
/// Every statistic is invariant to a per-feature shift, and the products
/// `X·P` and `(X∘X)·P` lose far less to cancellation on centred data. A row
/// whose spread is below the rounding of its mean is set exactly to zero.
pub(crate) fn center_rows(features: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>) {
    let n = features.ncols() as f64;
    let mut centered = features.clone();
    let mut totals = Vec::with_capacity(features.nrows());
    for mut row in centered.row_iter_mut() {
        let mean = row.sum() / n;
        row.add_scalar_mut(-mean);
        let total: f64 = row.iter().map(|v| v * v).sum();
        let noise = 16.0 * f64::EPSILON * mean.abs();
        if total <= n * noise * noise {
            row.fill(0.0);
            totals.push(0.0);
        } else {
            totals.push(total);
        }
    }
    (centered, totals)
}

/// Degeneracy thresholds for one feature row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Spread {
    /// Within-group sums of squares at or below this are zero.
    ss_floor: f64,
    /// Means closer than this are equal.
    mean_gap: f64,
}

impl Spread {
    /// From the row's total sum of squares over `n` samples.
    pub fn new(total_ss: f64, n: f64, tolerance: f64) -> Self {
        let ss_floor = tolerance * total_ss;
        Self {
            ss_floor,
            mean_gap: (ss_floor / n).sqrt(),
        }
    }

    fn same_mean(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.mean_gap
    }
}

/// Size, mean and within-group sum of squares of one group.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GroupMoments {
    pub n: f64,
    pub mean: f64,
    pub ss: f64,
}

impl GroupMoments {
    /// From a group's sum and sum of squares.
    pub fn from_sums(n: f64, sum: f64, sum_sq: f64, spread: &Spread) -> Self {
        let mean = sum / n;
        Self::clamped(n, mean, sum_sq - n * mean * mean, spread)
    }

    /// From the values themselves, two-pass.
    pub fn from_values<I>(values: I, spread: &Spread) -> Self
    where
        I: Iterator<Item = f64> + Clone,
    {
        let (n, sum) = values.clone().fold((0.0, 0.0), |(n, s), v| (n + 1.0, s + v));
        let mean = sum / n;
        let ss = values.map(|v| (v - mean).powi(2)).sum();
        Self::clamped(n, mean, ss, spread)
    }

    fn clamped(n: f64, mean: f64, ss: f64, spread: &Spread) -> Self {
        let ss = if ss <= spread.ss_floor { 0.0 } else { ss };
        Self { n, mean, ss: ss.max(0.0) }
    }

    /// Unbiased sample variance.
    pub fn variance(&self) -> f64 {
        self.ss / (self.n - 1.0)
    }
}

/// Evaluate `statistic` from per-group moments (group order = level order).
pub(crate) fn evaluate(statistic: Statistic, groups: &[GroupMoments], spread: &Spread) -> f64 {
    match statistic {
        Statistic::Mean => groups[1].mean - groups[0].mean,
        Statistic::T => welch_t(&groups[1], &groups[0], spread),
        Statistic::F => anova_f(groups, spread),
    }
}

fn welch_t(g1: &GroupMoments, g0: &GroupMoments, spread: &Spread) -> f64 {
    let diff = g1.mean - g0.mean;
    let se = (g1.variance() / g1.n + g0.variance() / g0.n).sqrt();
    if se > 0.0 {
        diff / se
    } else if se.is_nan() {
        f64::NAN
    } else if spread.same_mean(g1.mean, g0.mean) {
        0.0
    } else {
        diff.signum() * f64::INFINITY
    }
}

fn anova_f(groups: &[GroupMoments], spread: &Spread) -> f64 {
    let k = groups.len() as f64;
    let n: f64 = groups.iter().map(|g| g.n).sum();
    let grand = groups.iter().map(|g| g.n * g.mean).sum::<f64>() / n;

    let ssb: f64 = groups.iter().map(|g| g.n * (g.mean - grand).powi(2)).sum();
    let ssw: f64 = groups.iter().map(|g| g.ss).sum();
    let df_within = n - k;

    if ssw > 0.0 && df_within > 0.0 {
        (ssb / (k - 1.0)) / (ssw / df_within)
    } else if groups.iter().all(|g| spread.same_mean(g.mean, grand)) {
        0.0
    } else {
        f64::INFINITY
    }
}

/// Build the engine for a backend.
///
/// Only the accelerated backend touches a device, and it acquires one per
/// call, so construction never fails.
pub fn engine_for(
    backend: Backend,
    device: crate::device::DeviceKind,
    fallback_to_vectorized: bool,
) -> Box<dyn StatisticEngine> {
    match backend {
        Backend::Naive => Box::new(NaiveEngine),
        Backend::Vectorized => Box::new(VectorizedEngine),
        Backend::Accelerated => {
            Box::new(AcceleratedEngine::new(device).with_fallback(fallback_to_vectorized))
        }
    }
}
