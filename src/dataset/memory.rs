//! In-memory dataset implementation.
//!
//! Backs tests and small builds. Rows live in one flat buffer per fragment
//! and are re-chunked into batches on every `batches()` call, so the
//! streaming consumers see the same restartable contract a real storage
//! engine would provide.

use super::{BatchStream, VectorBatch, VectorFragment, VectorSource, DEFAULT_BATCH_SIZE};
use crate::error::{IndexError, Result};

/// A fragment whose rows live in memory.
#[derive(Debug, Clone)]
pub struct MemoryFragment {
    id: u32,
    row_ids: Vec<u64>,
    vectors: Vec<f32>,
    dimension: usize,
    batch_size: usize,
}

impl MemoryFragment {
    /// Create a fragment from parallel row-id and vector buffers.
    pub fn new(id: u32, row_ids: Vec<u64>, vectors: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(IndexError::InvalidParameter(
                "fragment dimension must be greater than 0".to_string(),
            ));
        }
        if vectors.len() != row_ids.len() * dimension {
            return Err(IndexError::InvalidParameter(format!(
                "fragment {} vector buffer holds {} values, expected {} rows x {} dims",
                id,
                vectors.len(),
                row_ids.len(),
                dimension,
            )));
        }
        Ok(Self {
            id,
            row_ids,
            vectors,
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Override the batch size used when streaming this fragment.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl VectorFragment for MemoryFragment {
    fn id(&self) -> u32 {
        self.id
    }

    fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    fn batches(&self) -> Result<BatchStream<'_>> {
        let dimension = self.dimension;
        let batch_size = self.batch_size;
        let num_rows = self.row_ids.len();

        let iter = (0..num_rows).step_by(batch_size).map(move |start| {
            let end = (start + batch_size).min(num_rows);
            VectorBatch::new(
                self.row_ids[start..end].to_vec(),
                self.vectors[start * dimension..end * dimension].to_vec(),
                dimension,
            )
        });
        Ok(Box::new(iter))
    }
}

/// A dataset whose fragments all live in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    fragments: Vec<MemoryFragment>,
    dimension: usize,
}

impl InMemoryDataset {
    /// Assemble a dataset from prepared fragments.
    ///
    /// All fragments must share one dimension and carry distinct ids.
    pub fn from_fragments(fragments: Vec<MemoryFragment>) -> Result<Self> {
        let dimension = match fragments.first() {
            Some(first) => first.dimension,
            None => {
                return Err(IndexError::Dataset(
                    "dataset must contain at least one fragment".to_string(),
                ))
            }
        };
        for fragment in &fragments {
            if fragment.dimension != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: fragment.dimension,
                });
            }
        }
        for (i, fragment) in fragments.iter().enumerate() {
            if fragments[..i].iter().any(|f| f.id == fragment.id) {
                return Err(IndexError::Dataset(format!(
                    "duplicate fragment id {}",
                    fragment.id
                )));
            }
        }
        Ok(Self {
            fragments,
            dimension,
        })
    }

    /// Split one flat buffer into `num_fragments` equal-sized fragments
    /// with sequential row ids. Convenience for tests and examples.
    pub fn from_flat(vectors: Vec<f32>, dimension: usize, num_fragments: usize) -> Result<Self> {
        if dimension == 0 || num_fragments == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension and num_fragments must be greater than 0".to_string(),
            ));
        }
        if vectors.len() % dimension != 0 {
            return Err(IndexError::InvalidParameter(format!(
                "vector buffer of {} values is not a multiple of dimension {}",
                vectors.len(),
                dimension,
            )));
        }
        let num_rows = vectors.len() / dimension;
        if num_rows % num_fragments != 0 {
            return Err(IndexError::InvalidParameter(format!(
                "{num_rows} rows cannot be split into {num_fragments} equal fragments",
            )));
        }

        let rows_per_fragment = num_rows / num_fragments;
        let mut fragments = Vec::with_capacity(num_fragments);
        for frag in 0..num_fragments {
            let row_start = frag * rows_per_fragment;
            let row_end = row_start + rows_per_fragment;
            let row_ids = (row_start as u64..row_end as u64).collect();
            let data = vectors[row_start * dimension..row_end * dimension].to_vec();
            fragments.push(MemoryFragment::new(frag as u32, row_ids, data, dimension)?);
        }
        Self::from_fragments(fragments)
    }
}

impl VectorSource for InMemoryDataset {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn num_rows(&self) -> usize {
        self.fragments.iter().map(|f| f.row_ids.len()).sum()
    }

    fn fragments(&self) -> Vec<&dyn VectorFragment> {
        self.fragments
            .iter()
            .map(|f| f as &dyn VectorFragment)
            .collect()
    }
}
