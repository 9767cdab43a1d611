//! Product quantizer: per-subspace codebooks trained on IVF residuals.

use crate::distance::{l2_distance_squared, DistanceType};
use crate::error::{IndexError, Result};
use crate::ivf_pq::ivf::IvfModel;
use crate::partitioning::KMeans;
use tracing::debug;

/// Codewords per subspace. Fixed so one code always fits in a byte.
pub const CODEBOOK_SIZE: usize = 256;

/// Trained PQ codebooks.
///
/// The codebook buffer is laid out subspace-major: all 256 codewords of
/// subspace 0, then all 256 of subspace 1, and so on. Each codeword is
/// `dimension / num_subvectors` values.
#[derive(Debug, Clone, PartialEq)]
pub struct PqModel {
    codebook: Vec<f32>,
    dimension: usize,
    num_subvectors: usize,
}

impl PqModel {
    /// Build a model from a flat codebook buffer.
    pub fn new(codebook: Vec<f32>, dimension: usize, num_subvectors: usize) -> Result<Self> {
        if dimension == 0 || num_subvectors == 0 {
            return Err(IndexError::InvalidParameter(
                "dimension and num_subvectors must be greater than 0".to_string(),
            ));
        }
        if dimension % num_subvectors != 0 {
            return Err(IndexError::InvalidSubvectorCount {
                dimension,
                num_subvectors,
            });
        }
        let sub_dimension = dimension / num_subvectors;
        let expected = num_subvectors * CODEBOOK_SIZE * sub_dimension;
        if codebook.len() != expected {
            return Err(IndexError::InvalidParameter(format!(
                "codebook holds {} values, expected {} ({} subspaces x {} codes x {} dims)",
                codebook.len(),
                expected,
                num_subvectors,
                CODEBOOK_SIZE,
                sub_dimension
            )));
        }

        Ok(Self {
            codebook,
            dimension,
            num_subvectors,
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn num_subvectors(&self) -> usize {
        self.num_subvectors
    }

    /// Values per subvector.
    #[must_use]
    pub fn sub_dimension(&self) -> usize {
        self.dimension / self.num_subvectors
    }

    /// Flat codebook buffer.
    #[must_use]
    pub fn codebook(&self) -> &[f32] {
        &self.codebook
    }

    /// Codeword `code` of `subspace`.
    #[must_use]
    pub fn codeword(&self, subspace: usize, code: u8) -> &[f32] {
        let sub_dimension = self.sub_dimension();
        let start = (subspace * CODEBOOK_SIZE + code as usize) * sub_dimension;
        &self.codebook[start..start + sub_dimension]
    }

    /// Encode a residual as one code byte per subspace.
    ///
    /// Each subvector maps to its nearest codeword by squared L2, ties
    /// resolving to the lowest code.
    pub fn encode(&self, residual: &[f32]) -> Result<Vec<u8>> {
        if residual.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: residual.len(),
            });
        }

        let sub_dimension = self.sub_dimension();
        let mut codes = Vec::with_capacity(self.num_subvectors);
        for subspace in 0..self.num_subvectors {
            let sub = &residual[subspace * sub_dimension..(subspace + 1) * sub_dimension];
            let mut best = 0u8;
            let mut best_dist = f32::INFINITY;
            for code in 0..CODEBOOK_SIZE {
                let codeword = self.codeword(subspace, code as u8);
                let dist = l2_distance_squared(sub, codeword);
                if dist < best_dist {
                    best_dist = dist;
                    best = code as u8;
                }
            }
            codes.push(best);
        }
        Ok(codes)
    }
}

/// Trains PQ codebooks on residuals, one k-means run per subspace.
pub struct PqTrainer {
    num_subvectors: usize,
    max_iterations: usize,
    seed: Option<u64>,
}

impl PqTrainer {
    /// Create a trainer that splits vectors into `num_subvectors`
    /// subspaces.
    pub fn new(num_subvectors: usize) -> Result<Self> {
        if num_subvectors == 0 {
            return Err(IndexError::InvalidParameter(
                "num_subvectors must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            num_subvectors,
            max_iterations: crate::partitioning::kmeans::DEFAULT_MAX_ITERATIONS,
            seed: None,
        })
    }

    /// Cap the number of k-means refinement iterations per subspace.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Configure a deterministic seed. Each subspace derives its own seed
    /// from it, so subspaces still train independently.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Train codebooks on `num_vectors` sample vectors.
    ///
    /// Residuals against `ivf` are computed here; callers pass raw
    /// vectors. Codebook k-means always runs under squared L2 whatever the
    /// IVF distance type, because residuals live in a recentered space
    /// where only reconstruction error matters.
    pub fn train(
        &self,
        ivf: &IvfModel,
        vectors: &[f32],
        num_vectors: usize,
        dimension: usize,
    ) -> Result<PqModel> {
        if dimension != ivf.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: ivf.dimension(),
                actual: dimension,
            });
        }
        if dimension % self.num_subvectors != 0 {
            return Err(IndexError::InvalidSubvectorCount {
                dimension,
                num_subvectors: self.num_subvectors,
            });
        }
        if num_vectors < CODEBOOK_SIZE {
            return Err(IndexError::InsufficientData {
                available: num_vectors,
                required: CODEBOOK_SIZE,
            });
        }
        if vectors.len() != num_vectors * dimension {
            return Err(IndexError::InvalidParameter(format!(
                "vector buffer holds {} values, expected {} ({} vectors x {} dimensions)",
                vectors.len(),
                num_vectors * dimension,
                num_vectors,
                dimension
            )));
        }

        let mut residuals = Vec::with_capacity(vectors.len());
        for i in 0..num_vectors {
            let vector = &vectors[i * dimension..(i + 1) * dimension];
            let (_, res) = ivf.partition_and_residual(vector)?;
            residuals.extend_from_slice(&res);
        }

        let sub_dimension = dimension / self.num_subvectors;
        let mut codebook = Vec::with_capacity(self.num_subvectors * CODEBOOK_SIZE * sub_dimension);
        let mut subspace_buf = vec![0.0f32; num_vectors * sub_dimension];

        for subspace in 0..self.num_subvectors {
            for i in 0..num_vectors {
                let src = i * dimension + subspace * sub_dimension;
                let dst = i * sub_dimension;
                subspace_buf[dst..dst + sub_dimension]
                    .copy_from_slice(&residuals[src..src + sub_dimension]);
            }

            let mut km = KMeans::new(sub_dimension, CODEBOOK_SIZE, DistanceType::L2)?
                .with_max_iterations(self.max_iterations);
            if let Some(seed) = self.seed {
                km = km.with_seed(seed + subspace as u64);
            }
            km.fit(&subspace_buf, num_vectors)?;
            codebook.extend_from_slice(km.centroids());
        }

        debug!(
            subvectors = self.num_subvectors,
            sub_dimension,
            samples = num_vectors,
            "trained PQ codebooks"
        );
        PqModel::new(codebook, dimension, self.num_subvectors)
    }
}
