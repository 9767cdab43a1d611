//! Bounded random sampling of training vectors.
//!
//! Training cost must not scale with dataset size, so both trainers work
//! from a sample. The sampler streams every fragment once and keeps a
//! uniform reservoir, which makes each fragment's share of the sample
//! proportional to its row count without a second pass or any knowledge of
//! fragment sizes up front.

use crate::dataset::VectorSource;
use crate::error::{IndexError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A sample of rows drawn without replacement from a dataset.
#[derive(Debug, Clone)]
pub struct SampledVectors {
    row_ids: Vec<u64>,
    vectors: Vec<f32>,
    dimension: usize,
}

impl SampledVectors {
    /// Number of sampled rows.
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

    /// Row identifiers of the sampled rows.
    #[must_use]
    pub fn row_ids(&self) -> &[u64] {
        &self.row_ids
    }

    /// Flat vector buffer (SoA).
    #[must_use]
    pub fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// The `idx`-th sampled vector.
    #[must_use]
    pub fn vector(&self, idx: usize) -> &[f32] {
        let start = idx * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}

/// Draw up to `target` vectors uniformly at random across all fragments.
///
/// Single-pass reservoir sampling (Algorithm R): peak memory is bounded by
/// the sample itself, each row is kept with equal probability, and no row
/// is drawn twice. A fixed `seed` makes the draw deterministic; `None`
/// seeds from entropy.
///
/// Returns all rows when the dataset holds fewer than `target`. Fails with
/// `InsufficientData` when the dataset holds no rows at all.
pub fn sample_vectors(
    source: &dyn VectorSource,
    target: usize,
    seed: Option<u64>,
) -> Result<SampledVectors> {
    if target == 0 {
        return Err(IndexError::InvalidParameter(
            "sample target must be greater than 0".to_string(),
        ));
    }

    let dimension = source.dimension();
    if dimension == 0 {
        return Err(IndexError::InvalidParameter(
            "dataset dimension must be greater than 0".to_string(),
        ));
    }

    let seed = seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut row_ids: Vec<u64> = Vec::with_capacity(target.min(source.num_rows()));
    let mut vectors: Vec<f32> = Vec::with_capacity(row_ids.capacity() * dimension);
    let mut seen = 0usize;

    for fragment in source.fragments() {
        for batch in fragment.batches()? {
            let batch = batch?;
            if batch.dimension() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: batch.dimension(),
                });
            }
            for i in 0..batch.len() {
                if row_ids.len() < target {
                    row_ids.push(batch.row_ids()[i]);
                    vectors.extend_from_slice(batch.vector(i));
                } else {
                    // Replace slot j with probability target / (seen + 1).
                    let j = rng.random_range(0..=seen);
                    if j < target {
                        row_ids[j] = batch.row_ids()[i];
                        let dst = j * dimension;
                        vectors[dst..dst + dimension].copy_from_slice(batch.vector(i));
                    }
                }
                seen += 1;
            }
        }
    }

    if seen == 0 {
        return Err(IndexError::InsufficientData {
            available: 0,
            required: 1,
        });
    }

    Ok(SampledVectors {
        row_ids,
        vectors,
        dimension,
    })
}
