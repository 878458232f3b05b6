//! Result types for permutation testing.

use crate::error::Result;
use crate::test::config::PermutationConfig;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of a permutation test for a single feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureResult {
    /// Feature identifier.
    pub feature_id: String,
    /// Observed test statistic (permutation 0).
    pub statistic: f64,
    /// Empirical p-value.
    pub p_value: f64,
    /// Number of permutations, the observed one included, at least as
    /// extreme as the observed statistic.
    pub n_extreme: usize,
}

/// Results of permutation testing across all features.
///
/// `results[i]` belongs to row `i` of the tested feature matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermutationResults {
    /// Results for each feature.
    pub results: Vec<FeatureResult>,
    /// Configuration used.
    pub config: PermutationConfig,
    /// Name of the engine that computed the statistics.
    pub engine: String,
}

impl PermutationResults {
    /// Get the number of features tested.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if results are empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Observed statistics, index-aligned with the feature rows.
    pub fn statistics(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.statistic).collect()
    }

    /// P-values, index-aligned with the feature rows.
    pub fn p_values(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.p_value).collect()
    }

    /// Look up a feature by identifier.
    pub fn get(&self, feature_id: &str) -> Option<&FeatureResult> {
        self.results.iter().find(|r| r.feature_id == feature_id)
    }

    /// Get results sorted by p-value, ties kept in feature order.
    pub fn sorted_by_pvalue(&self) -> Vec<&FeatureResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.p_value.partial_cmp(&b.p_value).unwrap_or(Ordering::Equal));
        sorted
    }

    /// Get results with p-value below `alpha` (no multiplicity adjustment).
    pub fn significant(&self, alpha: f64) -> Vec<&FeatureResult> {
        self.results.iter().filter(|r| r.p_value < alpha).collect()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
