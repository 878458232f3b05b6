//! Error types for the coda-perm library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum CodaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape or length mismatch between inputs.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Array rank outside the supported {1, 2}.
    #[error("Unsupported rank {0}: only vectors (rank 1) and matrices (rank 2) are accepted")]
    UnsupportedRank(usize),

    /// Value outside the domain of an operation (non-positive parts fed to
    /// a log-ratio transform, vector input where rows are required, ...).
    #[error("Domain error: {0}")]
    Domain(String),

    /// The accelerated compute device is unavailable or an operation on it failed.
    #[error("Device error: {0}")]
    Device(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodaError {
    /// Shorthand for a [`CodaError::DimensionMismatch`].
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// True for the dimension class of errors (rank or shape).
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::UnsupportedRank(_)
        )
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CodaError>;
