//! k-means clustering.
//!
//! Shared by IVF training (partition centroids) and PQ training (one run
//! per subspace). Initialization is k-means++; refinement runs through a
//! [`BulkDistanceComputer`] so an accelerated backend speeds up training
//! without changing its results.

use crate::distance::{l2_distance_squared, DistanceType};
use crate::error::{IndexError, Result};
use crate::partitioning::{BulkDistanceComputer, InProcessComputer};
use tracing::{debug, warn};

/// Iteration cap applied when the caller does not set one.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Training stops once no centroid moved farther than this (squared L2)
/// between consecutive iterations.
const CONVERGENCE_THRESHOLD: f32 = 1e-6;

/// k-means clustering over flat (SoA) vector storage.
pub struct KMeans {
    /// Centroids, `k * dimension` values.
    centroids: Vec<f32>,
    dimension: usize,
    k: usize,
    metric: DistanceType,
    max_iterations: usize,
    seed: Option<u64>,
}

impl KMeans {
    /// Create new k-means with `k` clusters under `metric`.
    pub fn new(dimension: usize, k: usize, metric: DistanceType) -> Result<Self> {
        if dimension == 0 || k == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension and k must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            centroids: Vec::new(),
            dimension,
            k,
            metric,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        })
    }

    /// Configure a deterministic seed for k-means++ initialization.
    ///
    /// When set, repeated `fit(...)` calls on the same inputs produce
    /// identical results.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Cap the number of refinement iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Train k-means on `num_vectors` vectors using the in-process
    /// assignment path.
    pub fn fit(&mut self, vectors: &[f32], num_vectors: usize) -> Result<()> {
        self.fit_with(vectors, num_vectors, &InProcessComputer)
    }

    /// Train k-means on `num_vectors` vectors, delegating nearest-centroid
    /// assignment to `computer`.
    pub fn fit_with(
        &mut self,
        vectors: &[f32],
        num_vectors: usize,
        computer: &dyn BulkDistanceComputer,
    ) -> Result<()> {
        if num_vectors < self.k {
            return Err(IndexError::InsufficientData {
                available: num_vectors,
                required: self.k,
            });
        }
        if vectors.len() != num_vectors * self.dimension {
            return Err(IndexError::InvalidParameter(format!(
                "vector buffer holds {} values, expected {} ({} vectors x {} dimensions)",
                vectors.len(),
                num_vectors * self.dimension,
                num_vectors,
                self.dimension
            )));
        }

        self.centroids = self.kmeans_plus_plus(vectors, num_vectors);

        for iteration in 0..self.max_iterations {
            let assignments =
                computer.assign(vectors, &self.centroids, self.dimension, self.metric)?;
            let (mut new_centroids, counts) =
                self.update_centroids(vectors, num_vectors, &assignments);
            self.reseed_empty_clusters(
                &mut new_centroids,
                &counts,
                vectors,
                num_vectors,
                &assignments,
            );

            // Squared L2 keeps the convergence test metric-independent:
            // it measures how far centroids moved, not how they rank.
            let mut movement = 0.0f32;
            for c in 0..self.k {
                let start = c * self.dimension;
                let end = start + self.dimension;
                let shift =
                    l2_distance_squared(&self.centroids[start..end], &new_centroids[start..end]);
                movement = movement.max(shift);
            }

            self.centroids = new_centroids;
            if movement <= CONVERGENCE_THRESHOLD {
                debug!(
                    iteration,
                    movement = f64::from(movement),
                    "k-means converged"
                );
                break;
            }
        }

        Ok(())
    }

    /// k-means++ initialization.
    ///
    /// Weights are squared L2 distances to the nearest chosen centroid
    /// regardless of the training metric, so they stay non-negative.
    fn kmeans_plus_plus(&self, vectors: &[f32], num_vectors: usize) -> Vec<f32> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        // Use an explicit seed when configured; otherwise derive one from
        // entropy.
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut centroids = Vec::with_capacity(self.k * self.dimension);

        // First centroid: random vector.
        let first_idx = rng.random_range(0..num_vectors);
        centroids.extend_from_slice(self.get_vector(vectors, first_idx));

        // Subsequent centroids: weighted by distance to nearest existing
        // centroid.
        for _ in 1..self.k {
            let mut weights = Vec::with_capacity(num_vectors);
            let mut total_weight = 0.0f64;

            for i in 0..num_vectors {
                let vector = self.get_vector(vectors, i);
                let num_chosen = centroids.len() / self.dimension;
                let mut min_dist = f32::INFINITY;
                for c in 0..num_chosen {
                    let centroid = &centroids[c * self.dimension..(c + 1) * self.dimension];
                    min_dist = min_dist.min(l2_distance_squared(vector, centroid));
                }

                weights.push(min_dist);
                total_weight += f64::from(min_dist);
            }

            let threshold = rng.random::<f64>() * total_weight;
            let mut cumulative = 0.0f64;
            let mut chosen = None;
            for (i, &weight) in weights.iter().enumerate() {
                cumulative += f64::from(weight);
                if cumulative >= threshold {
                    chosen = Some(i);
                    break;
                }
            }
            // Rounding can leave the cumulative walk short of the
            // threshold; fall back to the last sample.
            let chosen = chosen.unwrap_or(num_vectors - 1);
            centroids.extend_from_slice(self.get_vector(vectors, chosen));
        }

        centroids
    }

    /// Recompute each centroid as the mean of its members.
    ///
    /// Empty clusters are left zeroed here and repaired by
    /// `reseed_empty_clusters` before the centroids are adopted.
    fn update_centroids(
        &self,
        vectors: &[f32],
        num_vectors: usize,
        assignments: &[u32],
    ) -> (Vec<f32>, Vec<usize>) {
        let mut sums = vec![0.0f32; self.k * self.dimension];
        let mut counts = vec![0usize; self.k];

        for (i, &cluster) in assignments.iter().enumerate().take(num_vectors) {
            let cluster = cluster as usize;
            counts[cluster] += 1;

            let vector = self.get_vector(vectors, i);
            let dst = cluster * self.dimension;
            for (j, &val) in vector.iter().enumerate() {
                sums[dst + j] += val;
            }
        }

        for (cluster, &count) in counts.iter().enumerate() {
            if count > 0 {
                let start = cluster * self.dimension;
                for val in &mut sums[start..start + self.dimension] {
                    *val /= count as f32;
                }
            }
        }

        (sums, counts)
    }

    /// Replace empty clusters with the samples their current centroids
    /// represent worst.
    ///
    /// Samples are ranked by distance to their assigned centroid under the
    /// training metric; each empty cluster consumes the next-farthest
    /// donor, so no two empty clusters land on the same vector.
    fn reseed_empty_clusters(
        &self,
        new_centroids: &mut [f32],
        counts: &[usize],
        vectors: &[f32],
        num_vectors: usize,
        assignments: &[u32],
    ) {
        let empties: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(cluster, _)| cluster)
            .collect();
        if empties.is_empty() {
            return;
        }

        let mut donors: Vec<(usize, f32)> = (0..num_vectors)
            .map(|i| {
                let vector = self.get_vector(vectors, i);
                let assigned = assignments[i] as usize * self.dimension;
                let centroid = &self.centroids[assigned..assigned + self.dimension];
                (i, self.metric.ordering_key(vector, centroid))
            })
            .collect();
        donors.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (cluster, (donor, _)) in empties.iter().zip(donors.iter()) {
            let dst = cluster * self.dimension;
            new_centroids[dst..dst + self.dimension]
                .copy_from_slice(self.get_vector(vectors, *donor));
        }

        warn!(
            clusters = empties.len(),
            "re-seeded empty clusters from outliers"
        );
    }

    /// Assign vectors to nearest clusters.
    pub fn assign_clusters(&self, vectors: &[f32], num_vectors: usize) -> Result<Vec<u32>> {
        if vectors.len() != num_vectors * self.dimension {
            return Err(IndexError::InvalidParameter(format!(
                "vector buffer holds {} values, expected {} ({} vectors x {} dimensions)",
                vectors.len(),
                num_vectors * self.dimension,
                num_vectors,
                self.dimension
            )));
        }
        InProcessComputer.assign(vectors, &self.centroids, self.dimension, self.metric)
    }

    /// Get vector from SoA storage.
    fn get_vector<'a>(&self, vectors: &'a [f32], idx: usize) -> &'a [f32] {
        let start = idx * self.dimension;
        let end = start + self.dimension;
        &vectors[start..end]
    }

    /// Trained centroids, `k * dimension` values.
    #[must_use]
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    /// Consume the trainer and take its centroid buffer.
    #[must_use]
    pub fn into_centroids(self) -> Vec<f32> {
        self.centroids
    }
}
