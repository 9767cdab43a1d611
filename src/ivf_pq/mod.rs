//! IVF-PQ index construction.
//!
//! The index layout behind billion-scale similarity search, built from two
//! ideas:
//!
//! 1. **IVF (Inverted File)**: partition space into Voronoi cells around
//!    k-means centroids, so a query only has to visit nearby cells
//! 2. **PQ (Product Quantization)**: compress each vector to a few bytes,
//!    one codebook index per subspace ([Jégou et al. 2011](https://lear.inrialpes.fr/pubs/2011/JDS11/jegou_searching_with_quantization.pdf))
//!
//! This module covers the build side: training both models from a sample
//! and streaming the dataset through them into encoded rows.
//!
//! ```text
//!  sample ──> IVF k-means ─────────────> partition centroids
//!                                              │
//!  sample residuals (vector − centroid) ──> PQ k-means per subspace
//!                                              │
//!  dataset rows ──> assign + encode ──> (_rowid, __ivf_part_id, __pq_code)
//! ```
//!
//! ## Why residuals?
//!
//! After IVF assignment, what remains of a vector is its offset from the
//! partition centroid. Residuals from all partitions cluster around the
//! origin, so one set of codebooks serves every partition and each
//! codeword covers a much smaller volume than it would on raw vectors.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessella::ivf_pq::{train_ivf_model, train_pq_model, IvfBuildParams, PqBuildParams};
//! use tessella::ivf_pq::{MemoryEncodedSink, VectorTransformer};
//!
//! let ivf = train_ivf_model(&dataset, &IvfBuildParams::default())?;
//! let pq = train_pq_model(&dataset, &ivf, &PqBuildParams::new(8))?;
//!
//! let mut sink = MemoryEncodedSink::new();
//! VectorTransformer::new(&ivf, &pq)?.transform(&dataset, None, &mut sink)?;
//! ```

pub mod assign;
pub mod ivf;
pub mod pq;
pub mod transform;

pub use assign::{MemoryPartitionSink, PartitionAssigner, PartitionBatch, PartitionSink};
pub use ivf::{residual, IvfModel, IvfTrainer};
pub use pq::{PqModel, PqTrainer, CODEBOOK_SIZE};
pub use transform::{
    EncodedBatch, EncodedSink, MemoryEncodedSink, VectorTransformer, PARTITION_ID_COLUMN,
    PQ_CODE_COLUMN, ROW_ID_COLUMN,
};

pub use crate::partitioning::kmeans::DEFAULT_MAX_ITERATIONS;

use crate::dataset::VectorSource;
use crate::distance::DistanceType;
use crate::error::{IndexError, Result};
use crate::partitioning::resolve_computer;
use crate::sampler::sample_vectors;
use tracing::debug;

/// Default multiplier on the centroid count for the training sample size.
pub const DEFAULT_SAMPLE_RATE: usize = 256;

/// Parameters for [`train_ivf_model`].
#[derive(Debug, Clone)]
pub struct IvfBuildParams {
    /// Partition count. `None` derives `round(sqrt(row_count))`.
    pub num_partitions: Option<usize>,
    /// Distance type the partitions are trained and assigned under.
    pub distance_type: DistanceType,
    /// k-means refinement iteration cap.
    pub max_iterations: usize,
    /// Training samples drawn per partition.
    pub sample_rate: usize,
    /// Seed for sampling and k-means init. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Named compute backend for bulk assignment. `None` runs in process.
    pub accelerator: Option<String>,
}

impl Default for IvfBuildParams {
    fn default() -> Self {
        Self {
            num_partitions: None,
            distance_type: DistanceType::L2,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            seed: None,
            accelerator: None,
        }
    }
}

/// Parameters for [`train_pq_model`].
#[derive(Debug, Clone)]
pub struct PqBuildParams {
    /// Subspace count. Must divide the vector dimension.
    pub num_subvectors: usize,
    /// k-means refinement iteration cap, per subspace.
    pub max_iterations: usize,
    /// Training samples drawn per codeword.
    pub sample_rate: usize,
    /// Seed for sampling and k-means init. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl PqBuildParams {
    /// Defaults with `num_subvectors` subspaces.
    #[must_use]
    pub fn new(num_subvectors: usize) -> Self {
        Self {
            num_subvectors,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            seed: None,
        }
    }
}

/// `round(sqrt(row_count))`, the usual partition count when the caller
/// has no better one.
fn default_num_partitions(row_count: usize) -> usize {
    (row_count as f64).sqrt().round() as usize
}

/// Train IVF partition centroids from a bounded sample of `source`.
///
/// The sample holds `sample_rate` rows per partition (capped at the
/// dataset size), so training cost scales with the partition count, not
/// the dataset.
pub fn train_ivf_model(source: &dyn VectorSource, params: &IvfBuildParams) -> Result<IvfModel> {
    if params.sample_rate == 0 {
        return Err(IndexError::InvalidParameter(
            "sample_rate must be greater than 0".to_string(),
        ));
    }

    let row_count = source.num_rows();
    if row_count == 0 {
        return Err(IndexError::InsufficientData {
            available: 0,
            required: params.num_partitions.unwrap_or(1).max(1),
        });
    }

    let num_partitions = params
        .num_partitions
        .unwrap_or_else(|| default_num_partitions(row_count));
    if num_partitions == 0 {
        return Err(IndexError::InvalidParameter(
            "num_partitions must be greater than 0".to_string(),
        ));
    }
    if row_count < num_partitions {
        return Err(IndexError::InsufficientData {
            available: row_count,
            required: num_partitions,
        });
    }

    let computer = resolve_computer(params.accelerator.as_deref())?;
    let target = params.sample_rate.saturating_mul(num_partitions).min(row_count);
    debug!(
        rows = row_count,
        partitions = num_partitions,
        sample = target,
        backend = computer.name(),
        "training IVF model"
    );
    let samples = sample_vectors(source, target, params.seed)?;

    let mut trainer = IvfTrainer::new(num_partitions, params.distance_type)?
        .with_max_iterations(params.max_iterations);
    if let Some(seed) = params.seed {
        trainer = trainer.with_seed(seed);
    }
    trainer.train_with(
        samples.vectors(),
        samples.len(),
        samples.dimension(),
        computer.as_ref(),
    )
}

/// Train PQ codebooks on residuals against `ivf` from a bounded sample of
/// `source`.
pub fn train_pq_model(
    source: &dyn VectorSource,
    ivf: &IvfModel,
    params: &PqBuildParams,
) -> Result<PqModel> {
    if source.dimension() != ivf.dimension() {
        return Err(IndexError::DimensionMismatch {
            expected: ivf.dimension(),
            actual: source.dimension(),
        });
    }
    if params.sample_rate == 0 {
        return Err(IndexError::InvalidParameter(
            "sample_rate must be greater than 0".to_string(),
        ));
    }

    let row_count = source.num_rows();
    if row_count == 0 {
        return Err(IndexError::InsufficientData {
            available: 0,
            required: CODEBOOK_SIZE,
        });
    }

    let target = params.sample_rate.saturating_mul(CODEBOOK_SIZE).min(row_count);
    debug!(
        rows = row_count,
        subvectors = params.num_subvectors,
        sample = target,
        "training PQ model"
    );
    let samples = sample_vectors(source, target, params.seed)?;

    let mut trainer =
        PqTrainer::new(params.num_subvectors)?.with_max_iterations(params.max_iterations);
    if let Some(seed) = params.seed {
        trainer = trainer.with_seed(seed);
    }
    trainer.train(ivf, samples.vectors(), samples.len(), samples.dimension())
}
