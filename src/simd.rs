//! Vector kernels with SIMD acceleration.
//!
//! With the `simd` feature (default), the hot loops process eight lanes at
//! a time via `wide::f32x8` with a scalar tail for the remainder. Disabling
//! the feature swaps in portable implementations with identical signatures
//! and semantics.
//!
//! Callers are expected to validate dimensions first; these kernels assume
//! equal-length inputs.

#[cfg(feature = "simd")]
mod accel {
    use wide::f32x8;

    /// Lanes per SIMD iteration.
    const LANES: usize = 8;

    const NORM_EPSILON: f32 = 1e-9;

    #[inline]
    fn to_lanes(slice: &[f32]) -> [f32; LANES] {
        slice.try_into().unwrap_or([0.0; LANES])
    }

    #[inline]
    fn horizontal_sum(v: f32x8) -> f32 {
        let arr: [f32; LANES] = v.to_array();
        arr.iter().sum()
    }

    /// Dot product of two vectors.
    #[inline]
    #[must_use]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");

        let len = a.len();
        let simd_len = len - (len % LANES);

        let mut sum = f32x8::ZERO;
        for i in (0..simd_len).step_by(LANES) {
            let va = f32x8::new(to_lanes(&a[i..i + LANES]));
            let vb = f32x8::new(to_lanes(&b[i..i + LANES]));
            sum += va * vb;
        }

        let mut result = horizontal_sum(sum);
        for i in simd_len..len {
            result += a[i] * b[i];
        }
        result
    }

    /// L2 norm of a vector.
    #[inline]
    #[must_use]
    pub fn norm(v: &[f32]) -> f32 {
        dot(v, v).sqrt()
    }

    /// Cosine similarity between two vectors.
    ///
    /// Computes the dot product and both norms in one fused pass. Returns
    /// 0.0 when either vector has (near-)zero magnitude.
    #[inline]
    #[must_use]
    pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");

        let len = a.len();
        let simd_len = len - (len % LANES);

        let mut dot_sum = f32x8::ZERO;
        let mut norm_a_sum = f32x8::ZERO;
        let mut norm_b_sum = f32x8::ZERO;

        for i in (0..simd_len).step_by(LANES) {
            let va = f32x8::new(to_lanes(&a[i..i + LANES]));
            let vb = f32x8::new(to_lanes(&b[i..i + LANES]));
            dot_sum += va * vb;
            norm_a_sum += va * va;
            norm_b_sum += vb * vb;
        }

        let mut d = horizontal_sum(dot_sum);
        let mut na = horizontal_sum(norm_a_sum);
        let mut nb = horizontal_sum(norm_b_sum);

        for i in simd_len..len {
            d += a[i] * b[i];
            na += a[i] * a[i];
            nb += b[i] * b[i];
        }

        let na = na.sqrt();
        let nb = nb.sqrt();
        if na > NORM_EPSILON && nb > NORM_EPSILON {
            d / (na * nb)
        } else {
            0.0
        }
    }

    /// L2 (Euclidean) distance between two vectors.
    #[inline]
    #[must_use]
    pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
        l2_distance_squared(a, b).sqrt()
    }

    /// L2 distance squared (faster when only comparing distances).
    #[inline]
    #[must_use]
    pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");

        let len = a.len();
        let simd_len = len - (len % LANES);

        let mut sum = f32x8::ZERO;
        for i in (0..simd_len).step_by(LANES) {
            let va = f32x8::new(to_lanes(&a[i..i + LANES]));
            let vb = f32x8::new(to_lanes(&b[i..i + LANES]));
            let diff = va - vb;
            sum += diff * diff;
        }

        let mut result = horizontal_sum(sum);
        for i in simd_len..len {
            let diff = a[i] - b[i];
            result += diff * diff;
        }
        result
    }
}

#[cfg(feature = "simd")]
pub use accel::*;

#[cfg(not(feature = "simd"))]
mod fallback {
    //! Portable implementations when SIMD is not available.

    const NORM_EPSILON: f32 = 1e-9;

    /// Dot product of two vectors (portable implementation).
    #[inline]
    #[must_use]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    /// L2 norm of a vector.
    #[inline]
    #[must_use]
    pub fn norm(v: &[f32]) -> f32 {
        dot(v, v).sqrt()
    }

    /// Cosine similarity between two vectors.
    #[inline]
    #[must_use]
    pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let d = dot(a, b);
        let na = norm(a);
        let nb = norm(b);
        if na > NORM_EPSILON && nb > NORM_EPSILON {
            d / (na * nb)
        } else {
            0.0
        }
    }

    /// L2 (Euclidean) distance between two vectors.
    #[inline]
    #[must_use]
    pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
        l2_distance_squared(a, b).sqrt()
    }

    /// L2 distance squared (faster when only comparing distances).
    #[inline]
    #[must_use]
    pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}

#[cfg(not(feature = "simd"))]
pub use fallback::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_basic() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [4.0_f32, 5.0, 6.0];
        let result = dot(&a, &b);
        assert!((result - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_lane_aligned() {
        // Exactly one 8-lane block.
        let a = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = [1.0_f32; 8];
        assert!((dot(&a, &b) - 36.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_with_tail() {
        // One 8-lane block plus a 2-element tail.
        let a: Vec<f32> = (1..=10).map(|i| i as f32).collect();
        let b = vec![1.0_f32; 10];
        assert!((dot(&a, &b) - 55.0).abs() < 1e-6);
    }

    #[test]
    fn test_norm() {
        let v = [3.0_f32, 4.0];
        assert!((norm(&v) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = [1.0_f32, 0.0];
        let b = [0.0_f32, 1.0];
        assert!(cosine(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = [0.0_f32; 16];
        let b = [1.0_f32; 16];
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_l2_distance() {
        let a = [0.0_f32, 0.0];
        let b = [3.0_f32, 4.0];
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_distance_squared_large() {
        // 128-dim with every component off by 0.5: squared distance 32.
        let a = vec![1.0_f32; 128];
        let b = vec![0.5_f32; 128];
        assert!((l2_distance_squared(&a, &b) - 32.0).abs() < 1e-4);
    }
}
