//! Feature matrix: the subject of permutation testing.

use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// A real-valued matrix of features × samples.
///
/// Rows are independent hypotheses (e.g. CLR coordinates of taxa), columns
/// are samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMatrix {
    /// The data (features × samples).
    pub data: DMatrix<f64>,
    /// Feature identifiers.
    pub feature_ids: Vec<String>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
}

impl FeatureMatrix {
    /// Create a feature matrix with explicit identifiers.
    pub fn new(
        data: DMatrix<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows == 0 || ncols == 0 {
            return Err(CodaError::EmptyData(
                "Feature matrix is empty".to_string(),
            ));
        }
        if nrows != feature_ids.len() {
            return Err(CodaError::dimension("feature ids", nrows, feature_ids.len()));
        }
        if ncols != sample_ids.len() {
            return Err(CodaError::dimension("sample ids", ncols, sample_ids.len()));
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Create a feature matrix with generated identifiers (`F0..`, `S0..`).
    pub fn from_matrix(data: DMatrix<f64>) -> Result<Self> {
        let feature_ids = (0..data.nrows()).map(|i| format!("F{}", i)).collect();
        let sample_ids = (0..data.ncols()).map(|j| format!("S{}", j)).collect();
        Self::new(data, feature_ids, sample_ids)
    }

    /// Create from rows of feature values.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        if rows.is_empty() {
            return Err(CodaError::EmptyData(
                "Feature matrix has no rows".to_string(),
            ));
        }
        let n_samples = rows[0].as_ref().len();
        let mut flat = Vec::with_capacity(rows.len() * n_samples);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_samples {
                return Err(CodaError::dimension(
                    format!("feature row {}", i),
                    n_samples,
                    row.len(),
                ));
            }
            flat.extend_from_slice(row);
        }
        Self::from_matrix(DMatrix::from_row_slice(rows.len(), n_samples, &flat))
    }

    /// Turn a samples × coordinates matrix (e.g. the output of `clr`) into a
    /// features × samples matrix, one feature per coordinate.
    pub fn from_coordinates(coords: &DMatrix<f64>) -> Result<Self> {
        Self::from_matrix(coords.transpose())
    }

    /// Get the value for a feature and sample.
    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.data[(feature, sample)]
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Get a row (feature) as a vector.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().cloned().collect()
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Fail with a domain error on NaN or infinite entries.
    pub(crate) fn require_finite(&self) -> Result<()> {
        for i in 0..self.n_features() {
            for j in 0..self.n_samples() {
                let val = self.data[(i, j)];
                if !val.is_finite() {
                    return Err(CodaError::Domain(format!(
                        "Feature matrix must be finite; found {} for feature '{}' in sample '{}'",
                        val, self.feature_ids[i], self.sample_ids[j]
                    )));
                }
            }
        }
        Ok(())
    }
}
