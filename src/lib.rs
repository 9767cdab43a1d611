//! tessella: IVF-PQ index construction primitives.
//!
//! Turns a fragmented vector dataset into the three artifacts an IVF-PQ
//! index is built from:
//!
//! - `ivf_pq::IvfModel`: k-means partition centroids (the coarse quantizer)
//! - `ivf_pq::PqModel`: per-subspace codebooks trained on residuals
//! - encoded rows: `(_rowid, __ivf_part_id, __pq_code)` per source row
//!
//! Both models train on a bounded random sample, so build cost scales with
//! the model size rather than the dataset. The final transform then
//! streams every row through batch-at-a-time, keeping peak memory flat
//! across datasets of any size.
//!
//! # Critical Nuances
//!
//! ## Train PQ on residuals, not raw vectors
//!
//! Codebooks trained on raw vectors must cover the whole data
//! distribution, spending most of their 256 codewords on where a vector
//! is rather than what distinguishes it from its neighbors. Subtracting
//! the partition centroid first collapses every partition onto the
//! origin, so the codebooks only model local structure. Same bytes per
//! vector, far less quantization error.
//!
//! ## Assignment must be reproducible
//!
//! Partition assignment runs twice with different implementations: per
//! vector during training, in bulk during the transform, possibly on an
//! accelerator. Results must agree row for row, which is why ties always
//! resolve to the lowest centroid index and a requested backend that is
//! unavailable is an error instead of a silent fallback.

pub mod dataset;
pub mod distance;
pub mod error;
pub mod ivf_pq;
pub mod partitioning;
pub mod persistence;
pub mod sampler;
pub mod simd;

// Re-exports
pub use distance::DistanceType;
pub use error::{IndexError, Result};
pub use ivf_pq::{
    train_ivf_model, train_pq_model, IvfBuildParams, IvfModel, PqBuildParams, PqModel,
};
pub use persistence::{ModelPersistence, PersistenceError};
