//! Category vectors: group labels for each sample.

use crate::error::{CodaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group labels for N samples, coded as `0..K` in sorted level order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    codes: Vec<usize>,
    levels: Vec<String>,
}

impl Categories {
    /// Encode a sequence of labels.
    ///
    /// Distinct labels are sorted and numbered from zero, so for labels
    /// `[0, 1]` group 0 is label `0` and group 1 is label `1`.
    ///
    /// Labels must be `Ord`, which floats are not. Convert float-coded
    /// groups to integer codes and use [`Categories::from_codes`].
    pub fn new<L>(labels: &[L]) -> Result<Self>
    where
        L: Ord + Clone + ToString,
    {
        if labels.is_empty() {
            return Err(CodaError::EmptyData(
                "Category vector is empty".to_string(),
            ));
        }

        let mut index: BTreeMap<L, usize> = labels.iter().cloned().map(|l| (l, 0)).collect();
        for (code, slot) in index.values_mut().enumerate() {
            *slot = code;
        }

        let codes = labels.iter().map(|l| index[l]).collect();
        let levels = index.keys().map(|l| l.to_string()).collect();
        Ok(Self { codes, levels })
    }

    /// Build directly from codes `0..K`.
    ///
    /// Every code below the maximum must occur at least once.
    pub fn from_codes(codes: Vec<usize>) -> Result<Self> {
        let n_levels = match codes.iter().max() {
            Some(&max) => max + 1,
            None => {
                return Err(CodaError::EmptyData(
                    "Category vector is empty".to_string(),
                ))
            }
        };
        let mut seen = vec![false; n_levels];
        for &c in &codes {
            seen[c] = true;
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(CodaError::InvalidParameter(format!(
                "Category code {} is unused; codes must be contiguous from 0",
                missing
            )));
        }
        let levels = (0..n_levels).map(|c| c.to_string()).collect();
        Ok(Self { codes, levels })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if empty (never true for a constructed value).
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of distinct levels (K).
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Level names in code order.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Group code of every sample.
    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Number of samples in each group.
    pub fn group_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_levels()];
        for &c in &self.codes {
            sizes[c] += 1;
        }
        sizes
    }
}
