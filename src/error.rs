//! Error types for tessella.

use std::fmt;

/// Errors that can occur while training models or encoding vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Too few vectors for the requested partition or codebook count.
    InsufficientData { available: usize, required: usize },
    /// Vector length disagrees with the model or dataset dimension.
    DimensionMismatch { expected: usize, actual: usize },
    /// Distance metric name outside {l2, cosine, dot}.
    UnsupportedMetric(String),
    /// Subvector count does not divide the vector dimension evenly.
    InvalidSubvectorCount {
        dimension: usize,
        num_subvectors: usize,
    },
    /// A bulk-compute backend was requested but cannot be used.
    AcceleratorUnavailable { backend: String, reason: String },
    /// Invalid parameter value.
    InvalidParameter(String),
    /// The dataset failed while streaming rows.
    Dataset(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::InsufficientData {
                available,
                required,
            } => write!(
                f,
                "Insufficient data: {available} vectors available, {required} required",
            ),
            IndexError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {expected} dimensions, got {actual}",
            ),
            IndexError::UnsupportedMetric(name) => write!(
                f,
                "Unsupported distance metric: {name} (expected one of l2, cosine, dot)",
            ),
            IndexError::InvalidSubvectorCount {
                dimension,
                num_subvectors,
            } => write!(
                f,
                "Invalid subvector count: dimension {dimension} is not divisible by {num_subvectors}",
            ),
            IndexError::AcceleratorUnavailable { backend, reason } => {
                write!(f, "Accelerator '{backend}' unavailable: {reason}")
            }
            IndexError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            IndexError::Dataset(msg) => write!(f, "Dataset error: {msg}"),
        }
    }
}

impl std::error::Error for IndexError {}

pub type Result<T> = std::result::Result<T, IndexError>;
