//! On-disk format for trained models.
//!
//! A saved model is a directory with two files:
//!
//! ```text
//! <model-dir>/
//! ├── manifest.json     # model kind, shape, version, payload checksum
//! └── model.bin         # magic + header + little-endian f32 payload
//! ```
//!
//! # Binary Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Magic bytes (4B): "TSLL"             │
//! ├──────────────────────────────────────┤
//! │ Format version (4B, u32 LE)          │
//! ├──────────────────────────────────────┤
//! │ Value count (8B, u64 LE)             │
//! ├──────────────────────────────────────┤
//! │ Payload: count x f32 LE              │
//! └──────────────────────────────────────┘
//! ```
//!
//! The manifest records the payload's CRC32 alongside the shape, so a
//! load can refuse truncated or bit-flipped payloads instead of handing
//! back a silently wrong model. Loading writes nothing and reading back a
//! freshly saved model reproduces it bit for bit.

use crate::distance::DistanceType;
use serde::{Deserialize, Serialize};

/// Magic bytes opening every model payload file.
pub const MODEL_MAGIC: &[u8; 4] = b"TSLL";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Manifest file name inside a model directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Payload file name inside a model directory.
pub const MODEL_FILE: &str = "model.bin";

/// Element type tag recorded in manifests. Only f32 payloads exist today;
/// the tag keeps room for other widths without a format version bump.
pub const ELEMENT_TYPE_F32: &str = "float32";

/// Typed metadata stored next to a model payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelManifest {
    /// IVF centroid model.
    Ivf {
        version: u32,
        dimension: u32,
        num_partitions: u32,
        distance_type: DistanceType,
        element_type: String,
        checksum: u32,
    },
    /// PQ codebook model.
    Pq {
        version: u32,
        dimension: u32,
        num_subvectors: u32,
        codebook_size: u32,
        element_type: String,
        checksum: u32,
    },
}

/// CRC32 (IEEE) over `data`.
pub(crate) fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (POLY & mask);
        }
    }
    !crc
}
