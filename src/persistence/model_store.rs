//! Saving and loading trained models.

use std::fs;
use std::path::Path;

use crate::ivf_pq::ivf::IvfModel;
use crate::ivf_pq::pq::{PqModel, CODEBOOK_SIZE};
use crate::persistence::error::{PersistenceError, PersistenceResult};
use crate::persistence::format::{
    crc32, ModelManifest, ELEMENT_TYPE_F32, FORMAT_VERSION, MANIFEST_FILE, MODEL_FILE, MODEL_MAGIC,
};

/// Directory-backed persistence for trained models.
///
/// `save` then `load` reproduces the model bit for bit, including its
/// distance type. `load` never writes.
pub trait ModelPersistence: Sized {
    /// Write the model into `dir`, creating the directory if needed.
    fn save(&self, dir: &Path) -> PersistenceResult<()>;

    /// Read a model back from `dir`.
    fn load(dir: &Path) -> PersistenceResult<Self>;

    /// Whether `dir` holds a saved model.
    fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).exists()
    }
}

/// Write `values` as a framed little-endian payload, returning the
/// payload checksum.
fn write_payload(path: &Path, values: &[f32]) -> PersistenceResult<u32> {
    let mut bytes = Vec::with_capacity(16 + values.len() * 4);
    bytes.extend_from_slice(MODEL_MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(values.len() as u64).to_le_bytes());
    for &value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let checksum = crc32(&bytes[16..]);
    fs::write(path, bytes)?;
    Ok(checksum)
}

/// Read a framed payload back, verifying frame, length, and checksum.
fn read_payload(
    path: &Path,
    expected_len: usize,
    expected_checksum: u32,
) -> PersistenceResult<Vec<f32>> {
    let bytes = fs::read(path)?;
    if bytes.len() < 16 {
        return Err(PersistenceError::CorruptModel(format!(
            "model file is {} bytes, too short for its header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != MODEL_MAGIC {
        return Err(PersistenceError::CorruptModel(format!(
            "bad magic bytes {:?}",
            &bytes[0..4]
        )));
    }

    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[4..8]);
    let version = u32::from_le_bytes(word);
    if version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[8..16]);
    let count = u64::from_le_bytes(count_bytes) as usize;
    if count != expected_len {
        return Err(PersistenceError::CorruptModel(format!(
            "payload holds {count} values, manifest expects {expected_len}"
        )));
    }

    let payload = &bytes[16..];
    if payload.len() != count * 4 {
        return Err(PersistenceError::CorruptModel(format!(
            "payload is {} bytes, expected {} for {count} values",
            payload.len(),
            count * 4
        )));
    }

    let actual = crc32(payload);
    if actual != expected_checksum {
        return Err(PersistenceError::ChecksumMismatch {
            expected: expected_checksum,
            actual,
        });
    }

    let mut values = Vec::with_capacity(count);
    for chunk in payload.chunks_exact(4) {
        word.copy_from_slice(chunk);
        values.push(f32::from_le_bytes(word));
    }
    Ok(values)
}

fn write_manifest(dir: &Path, manifest: &ModelManifest) -> PersistenceResult<()> {
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
    fs::write(dir.join(MANIFEST_FILE), json)?;
    Ok(())
}

fn read_manifest(dir: &Path) -> PersistenceResult<ModelManifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(PersistenceError::NotFound(dir.display().to_string()));
    }
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PersistenceError::CorruptModel(format!("manifest: {e}")))
}

impl ModelPersistence for IvfModel {
    fn save(&self, dir: &Path) -> PersistenceResult<()> {
        fs::create_dir_all(dir)?;
        let checksum = write_payload(&dir.join(MODEL_FILE), self.centroids())?;
        let manifest = ModelManifest::Ivf {
            version: FORMAT_VERSION,
            dimension: self.dimension() as u32,
            num_partitions: self.num_partitions() as u32,
            distance_type: self.distance_type(),
            element_type: ELEMENT_TYPE_F32.to_string(),
            checksum,
        };
        write_manifest(dir, &manifest)
    }

    fn load(dir: &Path) -> PersistenceResult<Self> {
        match read_manifest(dir)? {
            ModelManifest::Ivf {
                version,
                dimension,
                num_partitions,
                distance_type,
                element_type,
                checksum,
            } => {
                if version != FORMAT_VERSION {
                    return Err(PersistenceError::UnsupportedVersion {
                        found: version,
                        supported: FORMAT_VERSION,
                    });
                }
                if element_type != ELEMENT_TYPE_F32 {
                    return Err(PersistenceError::CorruptModel(format!(
                        "unsupported element type {element_type:?}"
                    )));
                }

                let expected = num_partitions as usize * dimension as usize;
                let centroids = read_payload(&dir.join(MODEL_FILE), expected, checksum)?;
                IvfModel::new(centroids, dimension as usize, distance_type)
                    .map_err(|e| PersistenceError::CorruptModel(e.to_string()))
            }
            ModelManifest::Pq { .. } => Err(PersistenceError::CorruptModel(
                "manifest describes a pq model, expected ivf".to_string(),
            )),
        }
    }
}

impl ModelPersistence for PqModel {
    fn save(&self, dir: &Path) -> PersistenceResult<()> {
        fs::create_dir_all(dir)?;
        let checksum = write_payload(&dir.join(MODEL_FILE), self.codebook())?;
        let manifest = ModelManifest::Pq {
            version: FORMAT_VERSION,
            dimension: self.dimension() as u32,
            num_subvectors: self.num_subvectors() as u32,
            codebook_size: CODEBOOK_SIZE as u32,
            element_type: ELEMENT_TYPE_F32.to_string(),
            checksum,
        };
        write_manifest(dir, &manifest)
    }

    fn load(dir: &Path) -> PersistenceResult<Self> {
        match read_manifest(dir)? {
            ModelManifest::Pq {
                version,
                dimension,
                num_subvectors,
                codebook_size,
                element_type,
                checksum,
            } => {
                if version != FORMAT_VERSION {
                    return Err(PersistenceError::UnsupportedVersion {
                        found: version,
                        supported: FORMAT_VERSION,
                    });
                }
                if element_type != ELEMENT_TYPE_F32 {
                    return Err(PersistenceError::CorruptModel(format!(
                        "unsupported element type {element_type:?}"
                    )));
                }
                if codebook_size as usize != CODEBOOK_SIZE {
                    return Err(PersistenceError::CorruptModel(format!(
                        "codebook size {codebook_size} is not supported (expected {CODEBOOK_SIZE})"
                    )));
                }

                let dimension = dimension as usize;
                let num_subvectors = num_subvectors as usize;
                if num_subvectors == 0 || dimension % num_subvectors != 0 {
                    return Err(PersistenceError::CorruptModel(format!(
                        "dimension {dimension} is not divisible into {num_subvectors} subvectors"
                    )));
                }

                let sub_dimension = dimension / num_subvectors;
                let expected = num_subvectors * CODEBOOK_SIZE * sub_dimension;
                let codebook = read_payload(&dir.join(MODEL_FILE), expected, checksum)?;
                PqModel::new(codebook, dimension, num_subvectors)
                    .map_err(|e| PersistenceError::CorruptModel(e.to_string()))
            }
            ModelManifest::Ivf { .. } => Err(PersistenceError::CorruptModel(
                "manifest describes an ivf model, expected pq".to_string(),
            )),
        }
    }
}
