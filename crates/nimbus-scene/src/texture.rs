//! Covariance texture generation
//!
//! Runs once per scene load on the worker. Each splat expands to a pair of
//! Rgba32Uint texels:
//!
//! - texel 2i, words 0–2: the position floats, bit for bit
//! - texel 2i+1, words 0–2: three half2 pairs carrying 4x the six unique
//!   covariance entries; word 3: the RGBA bytes
//!
//! The x4 scale is part of the wire contract with the vertex shader: it
//! widens the usable half-float range so the on-screen axis sqrt(2*lambda)
//! reaches the quad's +/-2 sigma extent.

use nimbus_raster::{covariance_3d, pack_half_2x16, texture_height, TEXTURE_WIDTH};

use crate::pack::{PackedSplats, RECORD_WORDS};

/// CPU-side image for the splat texture, ready for a `Rgba32Uint` upload.
#[derive(Clone, Debug, Default)]
pub struct CovarianceTexture {
    /// Four words per texel, row-major, `width * height * 4` entries.
    pub data: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

/// Decode one quantized quaternion byte back to ~[-1, 1].
#[inline]
fn quat_component(byte: u8) -> f32 {
    (byte as f32 - 128.0) / 128.0
}

/// Build the covariance texture for a packed scene.
pub fn generate(packed: &PackedSplats) -> CovarianceTexture {
    let count = packed.count();
    let height = texture_height(count);
    // Out-of-range texels stay zero.
    let mut data = vec![0u32; (TEXTURE_WIDTH * height * 4) as usize];

    let words = packed.words();
    for i in 0..count {
        let src = i * RECORD_WORDS;
        let dst = i * 8;

        data[dst] = words[src];
        data[dst + 1] = words[src + 1];
        data[dst + 2] = words[src + 2];

        let scale = packed.scale(i);
        let q = packed.rotation_bytes(i);
        let cov = covariance_3d(
            scale,
            [
                quat_component(q[0]),
                quat_component(q[1]),
                quat_component(q[2]),
                quat_component(q[3]),
            ],
        );

        data[dst + 4] = pack_half_2x16(4.0 * cov[0], 4.0 * cov[1]);
        data[dst + 5] = pack_half_2x16(4.0 * cov[2], 4.0 * cov[3]);
        data[dst + 6] = pack_half_2x16(4.0 * cov[4], 4.0 * cov[5]);
        data[dst + 7] = words[src + 6];
    }

    CovarianceTexture {
        data,
        width: TEXTURE_WIDTH,
        height,
    }
}
