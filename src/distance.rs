//! Distance metrics for dense vectors.
//!
//! Every stage of the build pipeline (clustering, assignment, encoding)
//! compares vectors through a single shared definition of distance. Each
//! metric maps to an **ordering key** where smaller means closer, so
//! nearest-centroid selection is one `<` comparison regardless of metric:
//! l2 compares on squared Euclidean distance, cosine on $1 - \cos(a,b)$,
//! and dot on the negated inner product.

use crate::error::IndexError;
use crate::simd;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance metric fixed at training time and carried by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceType {
    /// Euclidean (L2) distance.
    L2,
    /// Cosine distance $1 - \cos(a,b)$.
    Cosine,
    /// Inner product; nearest means largest dot product.
    Dot,
}

impl DistanceType {
    /// Compute the smaller-is-closer ordering key between two vectors.
    ///
    /// If dimensions mismatch, this returns `f32::INFINITY` (so it is never
    /// selected as a nearest neighbor).
    #[inline]
    #[must_use]
    pub fn ordering_key(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceType::L2 => l2_distance_squared(a, b),
            DistanceType::Cosine => cosine_distance(a, b),
            DistanceType::Dot => dot_distance(a, b),
        }
    }

    /// Canonical lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DistanceType::L2 => "l2",
            DistanceType::Cosine => "cosine",
            DistanceType::Dot => "dot",
        }
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(DistanceType::L2),
            "cosine" => Ok(DistanceType::Cosine),
            "dot" => Ok(DistanceType::Dot),
            _ => Err(IndexError::UnsupportedMetric(s.to_string())),
        }
    }
}

/// L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    simd::l2_distance(a, b)
}

/// L2 distance squared; preserves the L2 ordering without the sqrt.
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    simd::l2_distance_squared(a, b)
}

/// Cosine distance $1 - \cos(a,b)$.
///
/// Computes the norms itself, so inputs need not be pre-normalized.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    1.0 - simd::cosine(a, b).clamp(-1.0, 1.0)
}

/// Dot-product distance (negated inner product, for maximum inner product
/// search).
#[inline]
#[must_use]
pub fn dot_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    -simd::dot(a, b)
}
