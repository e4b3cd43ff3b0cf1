//! GPU-compatible data types for the splat render pipeline

use bytemuck::{Pod, Zeroable};

/// Width of the covariance texture in texels. Two texels per splat, so each
/// row carries 1024 splats.
pub const TEXTURE_WIDTH: u32 = 2048;

/// Splats per texture row.
pub const SPLATS_PER_ROW: u32 = TEXTURE_WIDTH / 2;

/// Quad corners in Gaussian-sigma units, drawn as a triangle strip.
/// The ±2 extent matches the fragment stage's exp(-4) cutoff.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-2.0, -2.0], [2.0, -2.0], [-2.0, 2.0], [2.0, 2.0]];

/// Per-frame uniforms for the splat pipeline
///
/// Layout must match `Uniforms` in `shaders/splat.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SplatUniforms {
    /// Projection matrix (column-major)
    pub projection: [[f32; 4]; 4],
    /// View matrix with flipped y/z rows (column-major)
    pub view: [[f32; 4]; 4],
    /// Focal lengths in pixels (fx, fy)
    pub focal: [f32; 2],
    /// Viewport size in device pixels (w, h)
    pub viewport: [f32; 2],
}

impl SplatUniforms {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Number of rows the covariance texture needs for `count` splats.
pub fn texture_height(count: usize) -> u32 {
    ((2 * count) as u32).div_ceil(TEXTURE_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        // Verify struct sizes for GPU alignment
        assert_eq!(SplatUniforms::SIZE, 144);
        assert_eq!(SplatUniforms::SIZE % 16, 0);
    }

    #[test]
    fn test_texture_height() {
        assert_eq!(texture_height(0), 0);
        assert_eq!(texture_height(1), 1);
        assert_eq!(texture_height(1024), 1);
        assert_eq!(texture_height(1025), 2);
        assert_eq!(texture_height(1_000_000), 977);
    }
}
