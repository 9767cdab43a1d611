//! End-to-end IVF-PQ build pipeline tests.
//!
//! Drives the whole flow on a fragmented in-memory dataset: sample, train
//! IVF centroids, train PQ codebooks on residuals, then stream the rows
//! into encoded form.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessella::dataset::{InMemoryDataset, VectorSource};
use tessella::distance::DistanceType;
use tessella::ivf_pq::{
    train_ivf_model, train_pq_model, IvfBuildParams, MemoryEncodedSink, MemoryPartitionSink,
    PartitionAssigner, PqBuildParams, VectorTransformer, CODEBOOK_SIZE,
};

// =============================================================================
// Helpers
// =============================================================================

/// Rows drawn around `num_centers` random centers, split into fragments.
fn clustered_dataset(
    rows: usize,
    dimension: usize,
    num_fragments: usize,
    num_centers: usize,
    seed: u64,
) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<f32> = (0..num_centers * dimension)
        .map(|_| rng.random_range(0.0..100.0))
        .collect();

    let mut vectors = Vec::with_capacity(rows * dimension);
    for i in 0..rows {
        let center = &centers[(i % num_centers) * dimension..(i % num_centers + 1) * dimension];
        for &c in center {
            vectors.push(c + rng.random_range(-1.0..1.0));
        }
    }
    InMemoryDataset::from_flat(vectors, dimension, num_fragments).unwrap()
}

// =============================================================================
// Full Pipeline
// =============================================================================

#[test]
fn full_build_pipeline_on_a_fragmented_dataset() {
    // 30k rows x 128 dims in 3 fragments of 10k.
    let dimension = 128;
    let dataset = clustered_dataset(30_000, dimension, 3, 40, 4242);

    let ivf_params = IvfBuildParams {
        sample_rate: 16,
        max_iterations: 4,
        seed: Some(1),
        ..IvfBuildParams::default()
    };
    let ivf = train_ivf_model(&dataset, &ivf_params).unwrap();

    // round(sqrt(30_000)) = 173 partitions when none are requested.
    assert_eq!(ivf.num_partitions(), 173);
    assert_eq!(ivf.dimension(), dimension);
    assert_eq!(ivf.centroids().len(), 173 * dimension);

    let pq_params = PqBuildParams {
        sample_rate: 16,
        max_iterations: 4,
        seed: Some(1),
        ..PqBuildParams::new(8)
    };
    let pq = train_pq_model(&dataset, &ivf, &pq_params).unwrap();

    // 8 subspaces x 256 codewords x 16 dims each.
    assert_eq!(pq.num_subvectors(), 8);
    assert_eq!(pq.sub_dimension(), 16);
    assert_eq!(pq.codebook().len(), 8 * CODEBOOK_SIZE * 16);

    let transformer = VectorTransformer::new(&ivf, &pq).unwrap();

    // Two of three fragments.
    let mut partial = MemoryEncodedSink::new();
    let written = transformer
        .transform(&dataset, Some(&[0, 1]), &mut partial)
        .unwrap();
    assert_eq!(written, 20_000);
    assert_eq!(partial.num_rows(), 20_000);
    let expected_ids: Vec<u64> = (0..20_000).collect();
    assert_eq!(partial.row_ids(), expected_ids.as_slice());

    // The whole dataset.
    let mut full = MemoryEncodedSink::new();
    let written = transformer.transform(&dataset, None, &mut full).unwrap();
    assert_eq!(written, 30_000);
    assert_eq!(full.codes().len(), 30_000 * 8);
    let expected_ids: Vec<u64> = (0..30_000).collect();
    assert_eq!(full.row_ids(), expected_ids.as_slice());
    assert!(full
        .partition_ids()
        .iter()
        .all(|&p| (p as usize) < ivf.num_partitions()));

    // Spot-check encoded rows against the scalar path.
    for fragment in dataset.fragments() {
        let batch = fragment.batches().unwrap().next().unwrap().unwrap();
        let row = batch.row_ids()[0] as usize;
        let (partition, residual) = ivf.partition_and_residual(batch.vector(0)).unwrap();
        let codes = pq.encode(&residual).unwrap();
        assert_eq!(full.partition_ids()[row], partition);
        assert_eq!(full.code(row), codes.as_slice());
    }
}

#[test]
fn explicit_partition_count_is_honored_end_to_end() {
    let dataset = clustered_dataset(2_000, 16, 2, 10, 77);

    let ivf_params = IvfBuildParams {
        num_partitions: Some(10),
        sample_rate: 16,
        max_iterations: 4,
        seed: Some(2),
        ..IvfBuildParams::default()
    };
    let ivf = train_ivf_model(&dataset, &ivf_params).unwrap();
    assert_eq!(ivf.num_partitions(), 10);

    let mut sink = MemoryPartitionSink::new();
    let assigned = PartitionAssigner::new(&ivf)
        .assign(&dataset, &mut sink)
        .unwrap();
    assert_eq!(assigned, 2_000);
    assert!(sink.rows().iter().all(|&(_, p)| p < 10));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn seeded_builds_are_reproducible() {
    let dataset = clustered_dataset(2_000, 16, 2, 12, 909);

    let ivf_params = IvfBuildParams {
        num_partitions: Some(12),
        sample_rate: 4,
        max_iterations: 3,
        seed: Some(33),
        ..IvfBuildParams::default()
    };
    let pq_params = PqBuildParams {
        sample_rate: 4,
        max_iterations: 3,
        seed: Some(33),
        ..PqBuildParams::new(4)
    };

    let ivf_a = train_ivf_model(&dataset, &ivf_params).unwrap();
    let ivf_b = train_ivf_model(&dataset, &ivf_params).unwrap();
    assert_eq!(ivf_a, ivf_b);

    let pq_a = train_pq_model(&dataset, &ivf_a, &pq_params).unwrap();
    let pq_b = train_pq_model(&dataset, &ivf_b, &pq_params).unwrap();
    assert_eq!(pq_a, pq_b);

    let mut sink_a = MemoryEncodedSink::new();
    let mut sink_b = MemoryEncodedSink::new();
    VectorTransformer::new(&ivf_a, &pq_a)
        .unwrap()
        .transform(&dataset, None, &mut sink_a)
        .unwrap();
    VectorTransformer::new(&ivf_b, &pq_b)
        .unwrap()
        .transform(&dataset, None, &mut sink_b)
        .unwrap();
    assert_eq!(sink_a.codes(), sink_b.codes());
    assert_eq!(sink_a.partition_ids(), sink_b.partition_ids());
}

// =============================================================================
// Distance Types
// =============================================================================

#[test]
fn pipeline_runs_under_cosine_and_dot() {
    for distance_type in [DistanceType::Cosine, DistanceType::Dot] {
        let dataset = clustered_dataset(1_000, 16, 1, 8, 55);

        let ivf_params = IvfBuildParams {
            num_partitions: Some(8),
            distance_type,
            sample_rate: 8,
            max_iterations: 4,
            seed: Some(5),
            ..IvfBuildParams::default()
        };
        let ivf = train_ivf_model(&dataset, &ivf_params).unwrap();
        assert_eq!(ivf.distance_type(), distance_type);

        let pq_params = PqBuildParams {
            sample_rate: 4,
            max_iterations: 3,
            seed: Some(5),
            ..PqBuildParams::new(4)
        };
        let pq = train_pq_model(&dataset, &ivf, &pq_params).unwrap();

        let mut sink = MemoryEncodedSink::new();
        let written = VectorTransformer::new(&ivf, &pq)
            .unwrap()
            .transform(&dataset, None, &mut sink)
            .unwrap();
        assert_eq!(written, 1_000);
    }
}
