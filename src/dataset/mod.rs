//! Dataset access abstractions.
//!
//! The build pipeline never owns vector storage. It consumes one named,
//! fixed-dimension vector column through the traits here:
//!
//! - a [`VectorSource`] is an ordered set of fragments
//! - a [`VectorFragment`] yields a lazy, restartable stream of batches
//! - a [`VectorBatch`] carries row ids plus vectors in SoA layout
//!
//! Streams are pull-based so that sampling, assignment, and transform all
//! run in memory bounded by one batch, regardless of dataset size. Opening
//! `batches()` again restarts the fragment from its first row, which lets
//! multi-pass consumers (training, then transform) share one handle.

pub mod memory;

pub use memory::{InMemoryDataset, MemoryFragment};

use crate::error::{IndexError, Result};

/// Default number of rows per batch when streaming fragments.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// One batch of rows pulled from a fragment.
///
/// Vectors are stored flat (SoA): row `i` occupies
/// `[i * dimension, (i + 1) * dimension)`.
#[derive(Debug, Clone)]
pub struct VectorBatch {
    row_ids: Vec<u64>,
    vectors: Vec<f32>,
    dimension: usize,
}

impl VectorBatch {
    /// Create a batch, validating that the vector buffer matches the row
    /// count and dimension.
    pub fn new(row_ids: Vec<u64>, vectors: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(IndexError::InvalidParameter(
                "batch dimension must be greater than 0".to_string(),
            ));
        }
        if vectors.len() != row_ids.len() * dimension {
            return Err(IndexError::InvalidParameter(format!(
                "batch vector buffer holds {} values, expected {} rows x {} dims",
                vectors.len(),
                row_ids.len(),
                dimension,
            )));
        }
        Ok(Self {
            row_ids,
            vectors,
            dimension,
        })
    }

    /// Number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Row identifiers, in source order.
    #[must_use]
    pub fn row_ids(&self) -> &[u64] {
        &self.row_ids
    }

    /// Flat vector buffer (SoA).
    #[must_use]
    pub fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// The `idx`-th vector of the batch.
    #[must_use]
    pub fn vector(&self, idx: usize) -> &[f32] {
        let start = idx * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}

/// A boxed, restartable stream of batches from one fragment.
pub type BatchStream<'a> = Box<dyn Iterator<Item = Result<VectorBatch>> + 'a>;

/// An ordered unit of dataset storage holding a contiguous run of rows.
pub trait VectorFragment {
    /// Stable identifier of this fragment within its dataset.
    fn id(&self) -> u32;

    /// Total rows in this fragment.
    fn num_rows(&self) -> usize;

    /// Open a fresh batch stream over this fragment.
    ///
    /// Every call restarts from the first row. Failures from the
    /// underlying store surface as [`IndexError::Dataset`].
    fn batches(&self) -> Result<BatchStream<'_>>;
}

/// A dataset exposing one fixed-dimension vector column across fragments.
pub trait VectorSource {
    /// Dimension of the vector column, from the schema.
    fn dimension(&self) -> usize;

    /// Total rows across all fragments.
    fn num_rows(&self) -> usize;

    /// The dataset's fragments, in order.
    fn fragments(&self) -> Vec<&dyn VectorFragment>;
}
