//! IVF coarse quantizer: partition centroids and residual computation.

use crate::distance::DistanceType;
use crate::error::{IndexError, Result};
use crate::partitioning::{BulkDistanceComputer, InProcessComputer, KMeans};
use tracing::debug;

/// Element-wise difference between a vector and its partition centroid.
///
/// PQ codebooks are trained on residuals and rows are encoded from them,
/// so both sides must compute the residual the same way. This is that way.
#[inline]
#[must_use]
pub fn residual(vector: &[f32], centroid: &[f32]) -> Vec<f32> {
    vector
        .iter()
        .zip(centroid.iter())
        .map(|(v, c)| v - c)
        .collect()
}

/// Trained IVF partition centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct IvfModel {
    /// Centroids, `num_partitions * dimension` values.
    centroids: Vec<f32>,
    dimension: usize,
    num_partitions: usize,
    distance_type: DistanceType,
}

impl IvfModel {
    /// Build a model from a flat centroid buffer.
    pub fn new(
        centroids: Vec<f32>,
        dimension: usize,
        distance_type: DistanceType,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if centroids.is_empty() || centroids.len() % dimension != 0 {
            return Err(IndexError::InvalidParameter(format!(
                "centroid buffer length {} is not a positive multiple of dimension {}",
                centroids.len(),
                dimension
            )));
        }

        let num_partitions = centroids.len() / dimension;
        Ok(Self {
            centroids,
            dimension,
            num_partitions,
            distance_type,
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    #[must_use]
    pub fn distance_type(&self) -> DistanceType {
        self.distance_type
    }

    /// Flat centroid buffer, `num_partitions * dimension` values.
    #[must_use]
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    /// Centroid of partition `idx`.
    #[must_use]
    pub fn centroid(&self, idx: usize) -> &[f32] {
        let start = idx * self.dimension;
        &self.centroids[start..start + self.dimension]
    }

    /// Index of the partition whose centroid is nearest to `vector` under
    /// the model's distance type. Ties resolve to the lowest index.
    pub fn nearest_partition(&self, vector: &[f32]) -> Result<u32> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let mut best = 0u32;
        let mut best_key = f32::INFINITY;
        for p in 0..self.num_partitions {
            let key = self.distance_type.ordering_key(vector, self.centroid(p));
            if key < best_key {
                best_key = key;
                best = p as u32;
            }
        }
        Ok(best)
    }

    /// Nearest partition plus the residual against its centroid.
    pub fn partition_and_residual(&self, vector: &[f32]) -> Result<(u32, Vec<f32>)> {
        let partition = self.nearest_partition(vector)?;
        let res = residual(vector, self.centroid(partition as usize));
        Ok((partition, res))
    }
}

/// Trains IVF partition centroids with k-means.
pub struct IvfTrainer {
    num_partitions: usize,
    distance_type: DistanceType,
    max_iterations: usize,
    seed: Option<u64>,
}

impl IvfTrainer {
    /// Create a trainer for `num_partitions` partitions under
    /// `distance_type`.
    pub fn new(num_partitions: usize, distance_type: DistanceType) -> Result<Self> {
        if num_partitions == 0 {
            return Err(IndexError::InvalidParameter(
                "num_partitions must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            num_partitions,
            distance_type,
            max_iterations: crate::partitioning::kmeans::DEFAULT_MAX_ITERATIONS,
            seed: None,
        })
    }

    /// Cap the number of k-means refinement iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Configure a deterministic seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Train on `num_vectors` sample vectors using the in-process
    /// assignment path.
    pub fn train(
        &self,
        vectors: &[f32],
        num_vectors: usize,
        dimension: usize,
    ) -> Result<IvfModel> {
        self.train_with(vectors, num_vectors, dimension, &InProcessComputer)
    }

    /// Train on `num_vectors` sample vectors, delegating assignment to
    /// `computer`.
    pub fn train_with(
        &self,
        vectors: &[f32],
        num_vectors: usize,
        dimension: usize,
        computer: &dyn BulkDistanceComputer,
    ) -> Result<IvfModel> {
        let mut km = KMeans::new(dimension, self.num_partitions, self.distance_type)?
            .with_max_iterations(self.max_iterations);
        if let Some(seed) = self.seed {
            km = km.with_seed(seed);
        }
        km.fit_with(vectors, num_vectors, computer)?;

        debug!(
            partitions = self.num_partitions,
            dimension,
            samples = num_vectors,
            "trained IVF centroids"
        );
        IvfModel::new(km.into_centroids(), dimension, self.distance_type)
    }
}
