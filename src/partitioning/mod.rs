//! Partition assignment and the k-means trainer behind it.
//!
//! Assignment is the hot loop of both training and indexing, so it sits
//! behind [`BulkDistanceComputer`]: the default implementation runs in
//! process, and an accelerated backend can be swapped in without touching
//! the trainers. Whatever the backend, the assignment contract is fixed,
//! so swapping backends never changes which partition a vector lands in.

pub mod kmeans;

pub use kmeans::KMeans;

use crate::distance::DistanceType;
use crate::error::{IndexError, Result};

/// Batch nearest-centroid assignment.
///
/// Implementations must return exactly one centroid index per input vector,
/// in input order, resolving distance ties toward the lowest centroid
/// index. Any backend that deviates from [`InProcessComputer`] on the same
/// input is broken, not merely different.
pub trait BulkDistanceComputer {
    /// Backend name, for logs and error messages.
    fn name(&self) -> &str;

    /// Assign each vector in the flat `vectors` buffer to its nearest
    /// centroid under `metric`.
    fn assign(
        &self,
        vectors: &[f32],
        centroids: &[f32],
        dimension: usize,
        metric: DistanceType,
    ) -> Result<Vec<u32>>;
}

/// Scalar in-process assignment. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessComputer;

impl BulkDistanceComputer for InProcessComputer {
    fn name(&self) -> &str {
        "local"
    }

    fn assign(
        &self,
        vectors: &[f32],
        centroids: &[f32],
        dimension: usize,
        metric: DistanceType,
    ) -> Result<Vec<u32>> {
        if dimension == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if vectors.len() % dimension != 0 {
            return Err(IndexError::InvalidParameter(format!(
                "vector buffer length {} is not a multiple of dimension {}",
                vectors.len(),
                dimension
            )));
        }
        if centroids.is_empty() || centroids.len() % dimension != 0 {
            return Err(IndexError::InvalidParameter(format!(
                "centroid buffer length {} is not a positive multiple of dimension {}",
                centroids.len(),
                dimension
            )));
        }

        let num_vectors = vectors.len() / dimension;
        let num_centroids = centroids.len() / dimension;
        let mut assignments = Vec::with_capacity(num_vectors);

        for i in 0..num_vectors {
            let vector = &vectors[i * dimension..(i + 1) * dimension];
            let mut best = 0u32;
            let mut best_key = f32::INFINITY;
            for c in 0..num_centroids {
                let centroid = &centroids[c * dimension..(c + 1) * dimension];
                let key = metric.ordering_key(vector, centroid);
                // Strict < keeps the lowest index on ties.
                if key < best_key {
                    best_key = key;
                    best = c as u32;
                }
            }
            assignments.push(best);
        }

        Ok(assignments)
    }
}

/// Resolve an accelerator request to a computer.
///
/// `None` and `"local"` select the in-process path. Any other name fails
/// with `AcceleratorUnavailable` rather than silently falling back, so a
/// requested backend that is missing never degrades into a slow build.
pub fn resolve_computer(accelerator: Option<&str>) -> Result<Box<dyn BulkDistanceComputer>> {
    match accelerator {
        None => Ok(Box::new(InProcessComputer)),
        Some(name) if name.eq_ignore_ascii_case("local") => Ok(Box::new(InProcessComputer)),
        Some(name) => Err(IndexError::AcceleratorUnavailable {
            backend: name.to_string(),
            reason: "no such backend is registered in this build".to_string(),
        }),
    }
}
