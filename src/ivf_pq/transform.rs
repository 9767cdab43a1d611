//! Streaming transform of raw vectors into encoded index rows.

use crate::dataset::VectorSource;
use crate::error::{IndexError, Result};
use crate::ivf_pq::ivf::IvfModel;
use crate::ivf_pq::pq::PqModel;
use tracing::debug;

/// Column name carrying the source row id through the index build.
pub const ROW_ID_COLUMN: &str = "_rowid";
/// Column name for the assigned IVF partition.
pub const PARTITION_ID_COLUMN: &str = "__ivf_part_id";
/// Column name for the PQ code bytes.
pub const PQ_CODE_COLUMN: &str = "__pq_code";

/// One batch of encoded rows, in dataset order.
///
/// `codes` is flat with stride `num_subvectors`: row `i` owns bytes
/// `i * num_subvectors .. (i + 1) * num_subvectors`.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    pub row_ids: Vec<u64>,
    pub partition_ids: Vec<u32>,
    pub codes: Vec<u8>,
    pub num_subvectors: usize,
}

impl EncodedBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    /// Code bytes of row `idx`.
    #[must_use]
    pub fn code(&self, idx: usize) -> &[u8] {
        let start = idx * self.num_subvectors;
        &self.codes[start..start + self.num_subvectors]
    }
}

/// Receives encoded batches as they are produced, in dataset order.
pub trait EncodedSink {
    fn write(&mut self, batch: EncodedBatch) -> Result<()>;
}

/// Sink that collects all encoded rows in memory.
#[derive(Debug, Default)]
pub struct MemoryEncodedSink {
    row_ids: Vec<u64>,
    partition_ids: Vec<u32>,
    codes: Vec<u8>,
    num_subvectors: usize,
}

impl MemoryEncodedSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn row_ids(&self) -> &[u64] {
        &self.row_ids
    }

    #[must_use]
    pub fn partition_ids(&self) -> &[u32] {
        &self.partition_ids
    }

    /// Flat code buffer, stride `num_subvectors`.
    #[must_use]
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Code bytes of row `idx`.
    #[must_use]
    pub fn code(&self, idx: usize) -> &[u8] {
        let start = idx * self.num_subvectors;
        &self.codes[start..start + self.num_subvectors]
    }
}

impl EncodedSink for MemoryEncodedSink {
    fn write(&mut self, batch: EncodedBatch) -> Result<()> {
        self.num_subvectors = batch.num_subvectors;
        self.row_ids.extend_from_slice(&batch.row_ids);
        self.partition_ids.extend_from_slice(&batch.partition_ids);
        self.codes.extend_from_slice(&batch.codes);
        Ok(())
    }
}

/// Encodes dataset rows as (row id, partition id, PQ code) triples.
///
/// Fragments stream through one batch at a time, so peak memory tracks
/// the batch size rather than the dataset. Row order in the output is the
/// dataset's row order.
#[derive(Debug)]
pub struct VectorTransformer<'a> {
    ivf: &'a IvfModel,
    pq: &'a PqModel,
}

impl<'a> VectorTransformer<'a> {
    /// Pair an IVF model with a PQ model trained for it.
    pub fn new(ivf: &'a IvfModel, pq: &'a PqModel) -> Result<Self> {
        if ivf.dimension() != pq.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: ivf.dimension(),
                actual: pq.dimension(),
            });
        }
        Ok(Self { ivf, pq })
    }

    /// Encode `source` into `sink`, returning the number of rows written.
    ///
    /// `fragments` limits the transform to the named fragment ids; `None`
    /// transforms the whole dataset. Naming a fragment the dataset does
    /// not have is an error, not a no-op.
    pub fn transform(
        &self,
        source: &dyn VectorSource,
        fragments: Option<&[u32]>,
        sink: &mut dyn EncodedSink,
    ) -> Result<u64> {
        if source.dimension() != self.ivf.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.ivf.dimension(),
                actual: source.dimension(),
            });
        }

        let available = source.fragments();
        if let Some(requested) = fragments {
            for &id in requested {
                if !available.iter().any(|f| f.id() == id) {
                    return Err(IndexError::InvalidParameter(format!(
                        "fragment {id} does not exist in the dataset"
                    )));
                }
            }
        }

        let num_subvectors = self.pq.num_subvectors();
        let mut total = 0u64;
        for fragment in available {
            if let Some(requested) = fragments {
                if !requested.contains(&fragment.id()) {
                    continue;
                }
            }

            let mut fragment_rows = 0u64;
            for batch in fragment.batches()? {
                let batch = batch?;
                if batch.dimension() != self.ivf.dimension() {
                    return Err(IndexError::DimensionMismatch {
                        expected: self.ivf.dimension(),
                        actual: batch.dimension(),
                    });
                }

                let mut encoded = EncodedBatch {
                    row_ids: Vec::with_capacity(batch.len()),
                    partition_ids: Vec::with_capacity(batch.len()),
                    codes: Vec::with_capacity(batch.len() * num_subvectors),
                    num_subvectors,
                };
                for i in 0..batch.len() {
                    let (partition, res) = self.ivf.partition_and_residual(batch.vector(i))?;
                    let codes = self.pq.encode(&res)?;
                    encoded.row_ids.push(batch.row_ids()[i]);
                    encoded.partition_ids.push(partition);
                    encoded.codes.extend_from_slice(&codes);
                }

                fragment_rows += encoded.len() as u64;
                sink.write(encoded)?;
            }
            debug!(
                fragment = fragment.id(),
                rows = fragment_rows,
                "encoded fragment"
            );
            total += fragment_rows;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::distance::DistanceType;
    use crate::ivf_pq::pq::CODEBOOK_SIZE;

    /// Two partitions in 2-D; codeword `c` of each 1-D subspace is `c`.
    fn toy_models() -> (IvfModel, PqModel) {
        let ivf = IvfModel::new(vec![0.0, 0.0, 100.0, 100.0], 2, DistanceType::L2).unwrap();
        let mut codebook = Vec::new();
        for _ in 0..2 {
            for code in 0..CODEBOOK_SIZE {
                codebook.push(code as f32);
            }
        }
        let pq = PqModel::new(codebook, 2, 2).unwrap();
        (ivf, pq)
    }

    fn toy_dataset() -> InMemoryDataset {
        // 3 fragments x 4 rows; values kept small and non-negative so the
        // ramp codebook encodes them exactly.
        let mut vectors = Vec::new();
        for i in 0..12u32 {
            vectors.push((i % 7) as f32);
            vectors.push((i % 5) as f32);
        }
        InMemoryDataset::from_flat(vectors, 2, 3).unwrap()
    }

    #[test]
    fn transforms_whole_dataset_in_order() {
        let (ivf, pq) = toy_models();
        let dataset = toy_dataset();
        let mut sink = MemoryEncodedSink::new();

        let written = VectorTransformer::new(&ivf, &pq)
            .unwrap()
            .transform(&dataset, None, &mut sink)
            .unwrap();

        assert_eq!(written, 12);
        assert_eq!(sink.num_rows(), 12);
        let expected: Vec<u64> = (0..12).collect();
        assert_eq!(sink.row_ids(), expected.as_slice());
        assert_eq!(sink.codes().len(), 12 * 2);
    }

    #[test]
    fn encodes_rows_exactly_like_the_scalar_path() {
        let (ivf, pq) = toy_models();
        let dataset = toy_dataset();
        let mut sink = MemoryEncodedSink::new();
        VectorTransformer::new(&ivf, &pq)
            .unwrap()
            .transform(&dataset, None, &mut sink)
            .unwrap();

        let mut row = 0usize;
        for fragment in dataset.fragments() {
            for batch in fragment.batches().unwrap() {
                let batch = batch.unwrap();
                for i in 0..batch.len() {
                    let (partition, res) = ivf.partition_and_residual(batch.vector(i)).unwrap();
                    let codes = pq.encode(&res).unwrap();
                    assert_eq!(sink.partition_ids()[row], partition);
                    assert_eq!(sink.code(row), codes.as_slice());
                    row += 1;
                }
            }
        }
        assert_eq!(row, 12);
    }

    #[test]
    fn fragment_selection_limits_the_transform() {
        let (ivf, pq) = toy_models();
        let dataset = toy_dataset();
        let mut sink = MemoryEncodedSink::new();

        let written = VectorTransformer::new(&ivf, &pq)
            .unwrap()
            .transform(&dataset, Some(&[0, 2]), &mut sink)
            .unwrap();

        assert_eq!(written, 8);
        let expected: Vec<u64> = (0..4).chain(8..12).collect();
        assert_eq!(sink.row_ids(), expected.as_slice());
    }

    #[test]
    fn unknown_fragment_id_is_an_error() {
        let (ivf, pq) = toy_models();
        let dataset = toy_dataset();
        let mut sink = MemoryEncodedSink::new();

        let err = VectorTransformer::new(&ivf, &pq)
            .unwrap()
            .transform(&dataset, Some(&[1, 9]), &mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::InvalidParameter("fragment 9 does not exist in the dataset".to_string())
        );
        // Nothing may be written for a rejected request.
        assert_eq!(sink.num_rows(), 0);
    }

    #[test]
    fn mismatched_models_are_rejected() {
        let (ivf, _) = toy_models();
        let codebook = vec![0.0f32; 4 * CODEBOOK_SIZE];
        let pq = PqModel::new(codebook, 4, 1).unwrap();
        let err = VectorTransformer::new(&ivf, &pq).unwrap_err();
        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 4
            }
        );
    }
}
