//! Normalized splat records
//!
//! A [`SplatCloud`] holds the per-splat arrays after the importer has applied
//! the activation functions: scales are exponentiated, opacity is a sigmoid
//! output in [0, 1], colors are SH-DC converted to RGB in [0, 1], and
//! quaternions are unit length (w, x, y, z).

use crate::error::{SceneError, SceneResult};

/// Zeroth-order spherical harmonics basis constant.
pub const SH_C0: f32 = 0.282_094_79;

/// A point cloud of normalized Gaussian splats, struct-of-arrays.
#[derive(Clone, Debug, Default)]
pub struct SplatCloud {
    pub positions: Vec<[f32; 3]>,
    pub scales: Vec<[f32; 3]>,
    /// Unit quaternions as (w, x, y, z)
    pub rotations: Vec<[f32; 4]>,
    pub opacities: Vec<f32>,
    pub colors: Vec<[f32; 3]>,
}

impl SplatCloud {
    pub fn with_capacity(count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(count),
            scales: Vec::with_capacity(count),
            rotations: Vec::with_capacity(count),
            opacities: Vec::with_capacity(count),
            colors: Vec::with_capacity(count),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Reject empty scenes; the worker tolerates them but the import path
    /// treats a zero-splat file as malformed.
    pub fn validate(&self) -> SceneResult<()> {
        if self.is_empty() {
            return Err(SceneError::EmptyScene);
        }
        Ok(())
    }

    /// Axis-aligned bounding box and centroid of the splat centers.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        let mut sum = [0.0f64; 3];
        for p in &self.positions {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
                sum[k] += p[k] as f64;
            }
        }
        let n = self.len() as f64;
        let centroid = [
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
        ];
        Some((min, max, centroid))
    }
}

/// Logistic sigmoid, mapping an opacity logit into [0, 1].
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// SH DC coefficient to display RGB, clamped to [0, 1].
#[inline]
pub fn sh_dc_to_rgb(dc: f32) -> f32 {
    (0.5 + SH_C0 * dc).clamp(0.0, 1.0)
}

/// L2-normalize a quaternion, falling back to identity for near-zero input.
#[inline]
pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len < 1e-10 {
        return [1.0, 0.0, 0.0, 0.0];
    }
    [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_midpoint_and_saturation() {
        assert_relative_eq!(sigmoid(0.0), 0.5, epsilon = 1e-6);
        assert!(sigmoid(20.0) > 0.999_99);
        assert!(sigmoid(-20.0) < 1e-5);
    }

    #[test]
    fn sh_dc_clamps() {
        assert_relative_eq!(sh_dc_to_rgb(0.0), 0.5, epsilon = 1e-6);
        assert_eq!(sh_dc_to_rgb(10.0), 1.0);
        assert_eq!(sh_dc_to_rgb(-10.0), 0.0);
    }

    #[test]
    fn zero_quat_becomes_identity() {
        assert_eq!(normalize_quat([0.0; 4]), [1.0, 0.0, 0.0, 0.0]);
        let q = normalize_quat([2.0, 0.0, 0.0, 0.0]);
        assert_eq!(q, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn bounds_cover_all_points() {
        let mut cloud = SplatCloud::with_capacity(2);
        cloud.positions.push([-1.0, 0.0, 3.0]);
        cloud.positions.push([2.0, -5.0, 1.0]);
        let (min, max, centroid) = cloud.bounds().unwrap();
        assert_eq!(min, [-1.0, -5.0, 1.0]);
        assert_eq!(max, [2.0, 0.0, 3.0]);
        assert_relative_eq!(centroid[0], 0.5, epsilon = 1e-6);
    }
}
