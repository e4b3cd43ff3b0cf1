//! Orbit camera and the splat pipeline's matrix conventions
//!
//! The camera produces an OpenGL-style look-at view (camera looking along
//! -z), then flips its y and z rows and pairs it with a projection whose x
//! scale is negated. The composite puts visible points at cam.z > 0 with
//! clip.z in [0, clip.w], which is the convention the covariance Jacobian
//! and the depth sorter are written against.

use glam::{Mat4, Vec2, Vec3, Vec4};

pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fov_y: std::f32::consts::FRAC_PI_3,
            znear: 0.2,
            zfar: 200.0,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let dir = Vec3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw);
        self.target + dir * self.distance
    }

    /// World-to-camera matrix with the y and z rows negated.
    pub fn view_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let mut cols = view.to_cols_array_2d();
        for col in &mut cols {
            col[1] = -col[1];
            col[2] = -col[2];
        }
        Mat4::from_cols_array_2d(&cols)
    }

    /// Pixel focal lengths; fx = fy = (h/2)·cot(fov/2).
    pub fn focal(&self, height: u32) -> Vec2 {
        let f = (height as f32 / 2.0) / (self.fov_y / 2.0).tan();
        Vec2::new(f, f)
    }

    /// Projection matrix paired with [`Self::view_matrix`]: negated x scale,
    /// positive y scale, depth mapped to [0, w] between the clip planes.
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let focal = self.focal(height);
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let depth = self.zfar / (self.zfar - self.znear);
        Mat4::from_cols(
            Vec4::new(-(2.0 * focal.x) / w, 0.0, 0.0, 0.0),
            Vec4::new(0.0, (2.0 * focal.y) / h, 0.0, 0.0),
            Vec4::new(0.0, 0.0, depth, 1.0),
            Vec4::new(0.0, 0.0, -(self.zfar * self.znear) / (self.zfar - self.znear), 0.0),
        )
    }

    /// Composite matrix the depth sorter consumes (column-major).
    pub fn view_proj(&self, width: u32, height: u32) -> Mat4 {
        self.projection_matrix(width, height) * self.view_matrix()
    }

    /// Orbit by mouse deltas, pitch clamped short of the poles.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005)
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Dolly toward or away from the target.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance * (1.0 - amount * 0.1)).clamp(0.3, 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn target_sits_in_front_of_the_camera() {
        let camera = OrbitCamera::new();
        let cam = camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(cam.z > 0.0, "cam.z = {}", cam.z);
        assert_relative_eq!(cam.z, camera.distance, epsilon = 1e-4);

        let clip = camera.view_proj(800, 600) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.z >= 0.0 && clip.z <= clip.w);
    }

    #[test]
    fn point_behind_the_camera_fails_the_depth_test() {
        let camera = OrbitCamera::new();
        let behind = camera.eye() + (camera.eye() - camera.target).normalize();
        let cam = camera.view_matrix() * behind.extend(1.0);
        assert!(cam.z < 0.0);
    }

    #[test]
    fn focal_from_right_angle_fov() {
        let camera = OrbitCamera {
            fov_y: std::f32::consts::FRAC_PI_2,
            ..OrbitCamera::new()
        };
        let focal = camera.focal(600);
        assert_relative_eq!(focal.x, 300.0, epsilon = 1e-3);
        assert_relative_eq!(focal.y, 300.0, epsilon = 1e-3);
    }

    #[test]
    fn projection_entries_match_the_convention() {
        let camera = OrbitCamera::new();
        let proj = camera.projection_matrix(800, 600);
        let focal = camera.focal(600);
        let cols = proj.to_cols_array_2d();
        assert_relative_eq!(cols[0][0], -(2.0 * focal.x) / 800.0, epsilon = 1e-6);
        assert_relative_eq!(cols[1][1], (2.0 * focal.y) / 600.0, epsilon = 1e-6);
        assert_relative_eq!(cols[2][3], 1.0, epsilon = 1e-6);
        assert_relative_eq!(cols[3][2], -(200.0 * 0.2) / (200.0 - 0.2), epsilon = 1e-4);
    }

    #[test]
    fn depth_row_orders_near_before_far() {
        let camera = OrbitCamera::new();
        let vp = camera.view_proj(800, 600).to_cols_array();
        let axis = [vp[2], vp[6], vp[10]];

        let toward = (camera.target - camera.eye()).normalize();
        let near = camera.target - toward;
        let far = camera.target + toward;
        let depth = |p: Vec3| axis[0] * p.x + axis[1] * p.y + axis[2] * p.z;
        assert!(depth(near) < depth(far));
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut camera = OrbitCamera::new();
        for _ in 0..10_000 {
            camera.rotate(0.0, 10.0);
        }
        assert!(camera.pitch <= 89.0f32.to_radians() + 1e-6);
    }
}
