//! Gaussian splat rasterization math and GPU wire formats
//!
//! This crate holds the numeric core shared by the scene worker and the
//! renderer:
//!
//! 1. **Covariance**: quaternion → rotation matrix → 3×3 covariance, plus the
//!    perspective projection of that covariance to a screen-space ellipse
//!    (the CPU mirror of the vertex shader).
//! 2. **Half-float wire format**: the exact binary16 conversion used to pack
//!    covariance entries into the splat texture.
//! 3. **GPU types**: uniform/vertex structs and the splat-texture layout
//!    constants consumed by the render pipeline.

pub mod covariance;
pub mod gpu_types;
pub mod half;

// Re-export shader source strings
pub mod shaders {
    pub const SPLAT: &str = include_str!("shaders/splat.wgsl");
}

pub use covariance::*;
pub use gpu_types::*;
pub use half::{f16_bits_to_f32, f32_to_f16_bits, pack_half_2x16, unpack_half_2x16};
