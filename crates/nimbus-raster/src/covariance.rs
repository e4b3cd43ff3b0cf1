//! 3D Gaussian to 2D screen-space projection mathematics
//!
//! Builds the per-splat 3×3 covariance from quantized scale + rotation and
//! projects it to a screen-space ellipse via the Jacobian of the perspective
//! projection. The functions here are the CPU mirror of the vertex stage in
//! `shaders/splat.wgsl`; the texture generator and the test suite both run
//! against them.

use glam::{Mat3, Mat4, Vec2, Vec3};

/// Pixel cap on either ellipse axis, limiting worst-case fragment coverage
/// of a single splat.
pub const MAX_AXIS_PX: f32 = 1024.0;

/// Rotation matrix for a unit quaternion (w, x, y, z).
///
/// Row layout matches the covariance encoder's convention: the resulting
/// matrix is the transpose of the usual body-to-world rotation, which is
/// what `covariance_3d` expects when it forms sigma = M^T M.
pub fn rotation_from_quat(q: [f32; 4]) -> Mat3 {
    let [w, x, y, z] = q;
    Mat3::from_cols(
        Vec3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ),
        Vec3::new(
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ),
        Vec3::new(
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ),
    )
}

/// Six unique entries (s00, s01, s02, s11, s12, s22) of the 3×3 covariance
/// sigma = M^T M, where M is [`rotation_from_quat`] with row j scaled by
/// scale[j]. Equivalent to R·diag(scale²)·R^T for the body-to-world R.
pub fn covariance_3d(scale: [f32; 3], q: [f32; 4]) -> [f32; 6] {
    let r = rotation_from_quat(q);
    // Row-major flat view with each row scaled by its axis radius.
    let m = [
        r.col(0).x * scale[0],
        r.col(1).x * scale[0],
        r.col(2).x * scale[0],
        r.col(0).y * scale[1],
        r.col(1).y * scale[1],
        r.col(2).y * scale[1],
        r.col(0).z * scale[2],
        r.col(1).z * scale[2],
        r.col(2).z * scale[2],
    ];
    [
        m[0] * m[0] + m[3] * m[3] + m[6] * m[6],
        m[0] * m[1] + m[3] * m[4] + m[6] * m[7],
        m[0] * m[2] + m[3] * m[5] + m[6] * m[8],
        m[1] * m[1] + m[4] * m[4] + m[7] * m[7],
        m[1] * m[2] + m[4] * m[5] + m[7] * m[8],
        m[2] * m[2] + m[5] * m[5] + m[8] * m[8],
    ]
}

/// Project a 3D covariance to the 2×2 screen-space block.
///
/// `cam` is the splat center in camera space (cam.z > 0 in front of the
/// camera under the renderer's convention), `focal` the pixel focal lengths.
/// Returns (c00, c01, c11) of the symmetric 2×2 result.
pub fn project_covariance(cov: &[f32; 6], view: &Mat4, cam: Vec3, focal: Vec2) -> (f32, f32, f32) {
    let vrk = Mat3::from_cols(
        Vec3::new(cov[0], cov[1], cov[2]),
        Vec3::new(cov[1], cov[3], cov[4]),
        Vec3::new(cov[2], cov[4], cov[5]),
    );

    let z2 = cam.z * cam.z;
    let j = Mat3::from_cols(
        Vec3::new(focal.x / cam.z, 0.0, -(focal.x * cam.x) / z2),
        Vec3::new(0.0, -focal.y / cam.z, (focal.y * cam.y) / z2),
        Vec3::ZERO,
    );

    let t = Mat3::from_mat4(*view).transpose() * j;
    let cov2d = t.transpose() * vrk * t;
    (cov2d.col(0).x, cov2d.col(0).y, cov2d.col(1).y)
}

/// Eigenvalues of a symmetric 2×2 matrix [[a, b], [b, c]], larger first.
pub fn eigenvalues_2x2(a: f32, b: f32, c: f32) -> (f32, f32) {
    let mid = (a + c) * 0.5;
    let radius = (((a - c) * 0.5) * ((a - c) * 0.5) + b * b).sqrt();
    (mid + radius, mid - radius)
}

/// Principal half-axis vectors (in pixels) of the splat quad for a projected
/// 2×2 covariance, axis length sqrt(2·lambda) capped at [`MAX_AXIS_PX`].
///
/// Returns `None` when the smaller eigenvalue is negative: the splat is
/// numerically ill-conditioned and its quad is dropped.
pub fn ellipse_axes(a: f32, b: f32, c: f32) -> Option<(Vec2, Vec2)> {
    let (lambda1, lambda2) = eigenvalues_2x2(a, b, c);
    if lambda2 < 0.0 {
        return None;
    }
    let v = Vec2::new(b, lambda1 - a);
    let dir = if v.length_squared() > 1e-24 {
        v.normalize()
    } else {
        // Isotropic case: any direction works.
        Vec2::X
    };
    let major = (2.0 * lambda1).sqrt().min(MAX_AXIS_PX) * dir;
    let minor = (2.0 * lambda2).sqrt().min(MAX_AXIS_PX) * Vec2::new(dir.y, -dir.x);
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half::{pack_half_2x16, unpack_half_2x16};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_unit_quat(rng: &mut StdRng) -> [f32; 4] {
        loop {
            let q = [
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
            ];
            let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
            if len > 1e-3 {
                return [q[0] / len, q[1] / len, q[2] / len, q[3] / len];
            }
        }
    }

    #[test]
    fn identity_covariance() {
        let cov = covariance_3d([1.0; 3], [1.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(cov[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov[3], 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov[5], 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(cov[2], 0.0, epsilon = 1e-6);
        assert_relative_eq!(cov[4], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn scaled_covariance() {
        let cov = covariance_3d([2.0, 1.0, 0.5], [1.0, 0.0, 0.0, 0.0]);
        // Diagonal should be scale^2
        assert_relative_eq!(cov[0], 4.0, epsilon = 1e-6);
        assert_relative_eq!(cov[3], 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov[5], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn matches_rotated_diagonal_form() {
        // sigma must equal R·diag(s²)·R^T for the standard rotation matrix.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let q = random_unit_quat(&mut rng);
            let s = [
                rng.gen_range(0.05f32..3.0),
                rng.gen_range(0.05f32..3.0),
                rng.gen_range(0.05f32..3.0),
            ];
            let cov = covariance_3d(s, q);

            let r = Mat3::from_quat(glam::Quat::from_xyzw(q[1], q[2], q[3], q[0]));
            let d = Mat3::from_diagonal(Vec3::new(s[0] * s[0], s[1] * s[1], s[2] * s[2]));
            let reference = r * d * r.transpose();

            assert_relative_eq!(cov[0], reference.col(0).x, epsilon = 1e-4);
            assert_relative_eq!(cov[1], reference.col(1).x, epsilon = 1e-4);
            assert_relative_eq!(cov[2], reference.col(2).x, epsilon = 1e-4);
            assert_relative_eq!(cov[3], reference.col(1).y, epsilon = 1e-4);
            assert_relative_eq!(cov[4], reference.col(2).y, epsilon = 1e-4);
            assert_relative_eq!(cov[5], reference.col(2).z, epsilon = 1e-4);
        }
    }

    #[test]
    fn survives_half_float_wire_round_trip() {
        // The texture carries 4·sigma as binary16; each recovered entry must
        // stay within the truncation tolerance of 2^-10 relative error.
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let q = random_unit_quat(&mut rng);
            let s = [
                rng.gen_range(0.05f32..3.0),
                rng.gen_range(0.05f32..3.0),
                rng.gen_range(0.05f32..3.0),
            ];
            let cov = covariance_3d(s, q);
            let words = [
                pack_half_2x16(4.0 * cov[0], 4.0 * cov[1]),
                pack_half_2x16(4.0 * cov[2], 4.0 * cov[3]),
                pack_half_2x16(4.0 * cov[4], 4.0 * cov[5]),
            ];
            let mut back = [0.0f32; 6];
            for (pair, out) in words.iter().zip(back.chunks_mut(2)) {
                let (a, b) = unpack_half_2x16(*pair);
                out[0] = a / 4.0;
                out[1] = b / 4.0;
            }
            for k in 0..6 {
                // Truncation loses < 2^-10 relative; entries under the
                // flush-to-zero floor (2^-14 / 4) vanish outright.
                let tolerance = cov[k].abs() * f32::powi(2.0, -10) + 2.0e-5;
                assert!(
                    (back[k] - cov[k]).abs() < tolerance,
                    "entry {k}: {} vs {}",
                    back[k],
                    cov[k]
                );
            }
        }
    }

    #[test]
    fn quaternion_quantization_round_trip() {
        // Byte-quantized quaternions must reproduce the rotation matrix to
        // within a small Frobenius distance.
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..1000 {
            let q = random_unit_quat(&mut rng);
            let bytes: Vec<u8> = q
                .iter()
                .map(|v| ((v.clamp(-1.0, 1.0) * 128.0 + 128.0).round() as i32).clamp(0, 255) as u8)
                .collect();
            let decoded = [
                (bytes[0] as f32 - 128.0) / 128.0,
                (bytes[1] as f32 - 128.0) / 128.0,
                (bytes[2] as f32 - 128.0) / 128.0,
                (bytes[3] as f32 - 128.0) / 128.0,
            ];
            let ra = rotation_from_quat(q);
            let rb = rotation_from_quat(decoded);
            let mut frobenius = 0.0f32;
            for c in 0..3 {
                let d = ra.col(c) - rb.col(c);
                frobenius += d.length_squared();
            }
            assert!(frobenius.sqrt() < 0.02, "||dR||_F = {}", frobenius.sqrt());
        }
    }

    #[test]
    fn eigenvalues_of_diagonal() {
        let (l1, l2) = eigenvalues_2x2(1.0, 0.0, 1.0);
        assert_relative_eq!(l1, 1.0, epsilon = 1e-6);
        assert_relative_eq!(l2, 1.0, epsilon = 1e-6);

        let (l1, l2) = eigenvalues_2x2(4.0, 0.0, 1.0);
        assert_relative_eq!(l1, 4.0, epsilon = 1e-6);
        assert_relative_eq!(l2, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_covariance_is_dropped() {
        // Negative smaller eigenvalue: [[1, 2], [2, 1]] has lambda2 = -1.
        assert!(ellipse_axes(1.0, 2.0, 1.0).is_none());
    }

    #[test]
    fn axis_length_is_capped() {
        let (major, _minor) = ellipse_axes(1.0e7, 0.0, 1.0).unwrap();
        assert_relative_eq!(major.length(), MAX_AXIS_PX, epsilon = 1e-2);
    }

    #[test]
    fn unit_splat_projects_to_circle() {
        // Opacity-1 Gaussian at the view axis with s = (1,1,1): the ×4-scaled
        // wire covariance must project to a circle of radius
        // sqrt(2·4·s²)·fx/cz, within 1%.
        let fx = 600.0f32;
        let cz = 5.0f32;
        let cov = covariance_3d([1.0; 3], [1.0, 0.0, 0.0, 0.0]).map(|v| 4.0 * v);
        let (a, b, c) = project_covariance(
            &cov,
            &Mat4::IDENTITY,
            Vec3::new(0.0, 0.0, cz),
            Vec2::new(fx, fx),
        );
        let (major, minor) = ellipse_axes(a, b, c).unwrap();
        let expected = (2.0f32 * 4.0).sqrt() * fx / cz;
        assert_relative_eq!(major.length(), expected, max_relative = 0.01);
        assert_relative_eq!(minor.length(), expected, max_relative = 0.01);
    }
}
