//! Bulk partition assignment over a dataset.

use crate::dataset::VectorSource;
use crate::error::{IndexError, Result};
use crate::ivf_pq::ivf::IvfModel;
use crate::partitioning::{BulkDistanceComputer, InProcessComputer};
use tracing::debug;

/// One batch of (row id, partition id) pairs, in dataset order.
#[derive(Debug, Clone)]
pub struct PartitionBatch {
    pub row_ids: Vec<u64>,
    pub partition_ids: Vec<u32>,
}

impl PartitionBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }
}

/// Receives assignment batches as they are produced.
///
/// Batches arrive in dataset order: fragments in declaration order, rows
/// in fragment order.
pub trait PartitionSink {
    fn write(&mut self, batch: PartitionBatch) -> Result<()>;
}

/// Sink that collects all assignments in memory.
#[derive(Debug, Default)]
pub struct MemoryPartitionSink {
    rows: Vec<(u64, u32)>,
}

impl MemoryPartitionSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected (row id, partition id) pairs.
    #[must_use]
    pub fn rows(&self) -> &[(u64, u32)] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<(u64, u32)> {
        self.rows
    }
}

impl PartitionSink for MemoryPartitionSink {
    fn write(&mut self, batch: PartitionBatch) -> Result<()> {
        self.rows
            .extend(batch.row_ids.into_iter().zip(batch.partition_ids));
        Ok(())
    }
}

/// Maps every row of a dataset to its nearest IVF partition.
///
/// Assignment runs batch-at-a-time through a [`BulkDistanceComputer`], so
/// memory stays bounded by the batch size. Whatever the computer, results
/// match [`IvfModel::nearest_partition`] row for row.
pub struct PartitionAssigner<'a> {
    model: &'a IvfModel,
    computer: Box<dyn BulkDistanceComputer>,
}

impl<'a> PartitionAssigner<'a> {
    /// Assigner over the in-process computer.
    #[must_use]
    pub fn new(model: &'a IvfModel) -> Self {
        Self {
            model,
            computer: Box::new(InProcessComputer),
        }
    }

    /// Assigner over a caller-supplied computer.
    #[must_use]
    pub fn with_computer(model: &'a IvfModel, computer: Box<dyn BulkDistanceComputer>) -> Self {
        Self { model, computer }
    }

    /// Assign every row of `source` and stream the results into `sink`.
    ///
    /// Returns the number of rows assigned.
    pub fn assign(&self, source: &dyn VectorSource, sink: &mut dyn PartitionSink) -> Result<u64> {
        if source.dimension() != self.model.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.model.dimension(),
                actual: source.dimension(),
            });
        }

        let mut total = 0u64;
        for fragment in source.fragments() {
            let mut fragment_rows = 0u64;
            for batch in fragment.batches()? {
                let batch = batch?;
                if batch.dimension() != self.model.dimension() {
                    return Err(IndexError::DimensionMismatch {
                        expected: self.model.dimension(),
                        actual: batch.dimension(),
                    });
                }

                let partition_ids = self.computer.assign(
                    batch.vectors(),
                    self.model.centroids(),
                    self.model.dimension(),
                    self.model.distance_type(),
                )?;
                fragment_rows += batch.len() as u64;
                sink.write(PartitionBatch {
                    row_ids: batch.row_ids().to_vec(),
                    partition_ids,
                })?;
            }
            debug!(
                fragment = fragment.id(),
                rows = fragment_rows,
                backend = self.computer.name(),
                "assigned partitions"
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

    fn grid_dataset(rows: usize, num_fragments: usize) -> InMemoryDataset {
        let vectors: Vec<f32> = (0..rows * 2).map(|i| (i % 17) as f32).collect();
        InMemoryDataset::from_flat(vectors, 2, num_fragments).unwrap()
    }

    fn toy_model() -> IvfModel {
        IvfModel::new(
            vec![0.0, 0.0, 8.0, 8.0, 16.0, 0.0],
            2,
            DistanceType::L2,
        )
        .unwrap()
    }

    #[test]
    fn assigns_every_row_in_dataset_order() {
        let dataset = grid_dataset(90, 3);
        let model = toy_model();
        let mut sink = MemoryPartitionSink::new();

        let assigned = PartitionAssigner::new(&model)
            .assign(&dataset, &mut sink)
            .unwrap();

        assert_eq!(assigned, 90);
        let ids: Vec<u64> = sink.rows().iter().map(|&(id, _)| id).collect();
        let expected: Vec<u64> = (0..90).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn bulk_path_matches_scalar_path() {
        let dataset = grid_dataset(60, 2);
        let model = toy_model();
        let mut sink = MemoryPartitionSink::new();
        PartitionAssigner::new(&model)
            .assign(&dataset, &mut sink)
            .unwrap();

        for fragment in dataset.fragments() {
            for batch in fragment.batches().unwrap() {
                let batch = batch.unwrap();
                for i in 0..batch.len() {
                    let row_id = batch.row_ids()[i];
                    let scalar = model.nearest_partition(batch.vector(i)).unwrap();
                    let bulk = sink
                        .rows()
                        .iter()
                        .find(|&&(id, _)| id == row_id)
                        .map(|&(_, p)| p)
                        .unwrap();
                    assert_eq!(bulk, scalar, "row {row_id}");
                }
            }
        }
    }

    #[test]
    fn partition_ids_stay_in_range() {
        let dataset = grid_dataset(40, 1);
        let model = toy_model();
        let mut sink = MemoryPartitionSink::new();
        PartitionAssigner::new(&model)
            .assign(&dataset, &mut sink)
            .unwrap();
        assert!(sink
            .rows()
            .iter()
            .all(|&(_, p)| (p as usize) < model.num_partitions()));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let vectors: Vec<f32> = (0..30).map(|i| i as f32).collect();
        let dataset = InMemoryDataset::from_flat(vectors, 3, 1).unwrap();
        let model = toy_model();
        let mut sink = MemoryPartitionSink::new();
        let err = PartitionAssigner::new(&model)
            .assign(&dataset, &mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }
}
