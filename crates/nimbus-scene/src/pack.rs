//! 32-byte packed splat records
//!
//! The packer turns a [`SplatCloud`] into the buffer the worker owns:
//! eight 32-bit words per splat,
//!
//! | words | field | encoding |
//! |---|---|---|
//! | 0–2 | position | f32 bit patterns |
//! | 3–5 | scale | f32 bit patterns |
//! | 6 | RGBA | bytes, round(clamp(v,0,1)·255), alpha from opacity |
//! | 7 | quaternion | bytes, clamp(round(clamp(v,-1,1)·128+128), 0, 255) |
//!
//! Backing storage is `Vec<u32>` so the float and byte views obtained via
//! `bytemuck::cast_slice` are always correctly aligned; on little-endian
//! hosts the byte view is exactly the interchange `.splat` layout.

use crate::error::{SceneError, SceneResult};
use crate::splat::SplatCloud;

/// Bytes per packed splat record.
pub const RECORD_SIZE: usize = 32;

/// Words per packed splat record.
pub const RECORD_WORDS: usize = RECORD_SIZE / 4;

/// The packed, GPU-friendly form of a splat scene.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedSplats {
    words: Vec<u32>,
}

impl PackedSplats {
    /// Pack a normalized cloud. Deterministic: identical input yields a
    /// bit-identical buffer.
    pub fn pack(cloud: &SplatCloud) -> Self {
        let n = cloud.len();
        let mut words = vec![0u32; n * RECORD_WORDS];
        for i in 0..n {
            let base = i * RECORD_WORDS;
            let p = cloud.positions[i];
            let s = cloud.scales[i];
            words[base] = p[0].to_bits();
            words[base + 1] = p[1].to_bits();
            words[base + 2] = p[2].to_bits();
            words[base + 3] = s[0].to_bits();
            words[base + 4] = s[1].to_bits();
            words[base + 5] = s[2].to_bits();

            let c = cloud.colors[i];
            words[base + 6] = u32::from_le_bytes([
                unorm_byte(c[0]),
                unorm_byte(c[1]),
                unorm_byte(c[2]),
                unorm_byte(cloud.opacities[i]),
            ]);

            let q = cloud.rotations[i];
            words[base + 7] = u32::from_le_bytes([
                snorm_byte(q[0]),
                snorm_byte(q[1]),
                snorm_byte(q[2]),
                snorm_byte(q[3]),
            ]);
        }
        Self { words }
    }

    /// Adopt an existing 32-byte-per-splat interchange buffer (`.splat`).
    pub fn from_bytes(bytes: &[u8]) -> SceneResult<Self> {
        if bytes.is_empty() || bytes.len() % RECORD_SIZE != 0 {
            return Err(SceneError::LengthMismatch { len: bytes.len() });
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { words })
    }

    /// Number of splats in the buffer.
    pub fn count(&self) -> usize {
        self.words.len() / RECORD_WORDS
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The raw word buffer.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Float view over the whole buffer (8 floats per splat; words 6 and 7
    /// are packed bytes and only meaningful through [`Self::bytes`]).
    pub fn floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.words)
    }

    /// Byte view over the whole buffer.
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Position of splat `i`.
    pub fn position(&self, i: usize) -> [f32; 3] {
        let f = self.floats();
        let base = i * RECORD_WORDS;
        [f[base], f[base + 1], f[base + 2]]
    }

    /// Scale of splat `i`.
    pub fn scale(&self, i: usize) -> [f32; 3] {
        let f = self.floats();
        let base = i * RECORD_WORDS;
        [f[base + 3], f[base + 4], f[base + 5]]
    }

    /// RGBA bytes of splat `i`.
    pub fn rgba(&self, i: usize) -> [u8; 4] {
        self.words[i * RECORD_WORDS + 6].to_le_bytes()
    }

    /// Opacity byte of splat `i` (the sorter's cull key).
    pub fn alpha_byte(&self, i: usize) -> u8 {
        (self.words[i * RECORD_WORDS + 6] >> 24) as u8
    }

    /// Quaternion bytes of splat `i` as stored (w, x, y, z).
    pub fn rotation_bytes(&self, i: usize) -> [u8; 4] {
        self.words[i * RECORD_WORDS + 7].to_le_bytes()
    }
}

#[inline]
fn unorm_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn snorm_byte(v: f32) -> u8 {
    ((v.clamp(-1.0, 1.0) * 128.0 + 128.0).round() as i32).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cloud() -> SplatCloud {
        let mut cloud = SplatCloud::with_capacity(2);
        cloud.positions.push([1.0, -2.0, 3.5]);
        cloud.scales.push([0.1, 0.2, 0.3]);
        cloud.rotations.push([1.0, 0.0, 0.0, 0.0]);
        cloud.opacities.push(1.0);
        cloud.colors.push([1.0, 0.0, 0.5]);

        cloud.positions.push([0.0, 0.0, 0.0]);
        cloud.scales.push([1.0, 1.0, 1.0]);
        cloud.rotations.push([0.0, 1.0, 0.0, 0.0]);
        cloud.opacities.push(0.25);
        cloud.colors.push([0.0, 1.0, 0.0]);
        cloud
    }

    #[test]
    fn record_layout() {
        let packed = PackedSplats::pack(&sample_cloud());
        assert_eq!(packed.count(), 2);
        assert_eq!(packed.bytes().len(), 2 * RECORD_SIZE);

        assert_eq!(packed.position(0), [1.0, -2.0, 3.5]);
        assert_eq!(packed.scale(0), [0.1, 0.2, 0.3]);
        // (1, 0, 0.5, 1) -> (255, 0, 128, 255)
        assert_eq!(packed.rgba(0), [255, 0, 128, 255]);
        // Identity quaternion w=1 saturates to 255, zero components sit at 128.
        assert_eq!(packed.rotation_bytes(0), [255, 128, 128, 128]);

        assert_eq!(packed.alpha_byte(1), 64);
        assert_eq!(packed.rotation_bytes(1), [128, 255, 128, 128]);
    }

    #[test]
    fn packing_is_bit_identical() {
        let cloud = sample_cloud();
        let a = PackedSplats::pack(&cloud);
        let b = PackedSplats::pack(&cloud);
        assert_eq!(a, b);
        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn byte_round_trip() {
        let packed = PackedSplats::pack(&sample_cloud());
        let adopted = PackedSplats::from_bytes(packed.bytes()).unwrap();
        assert_eq!(adopted, packed);
    }

    #[test]
    fn rejects_partial_records() {
        assert!(matches!(
            PackedSplats::from_bytes(&[0u8; 33]),
            Err(SceneError::LengthMismatch { len: 33 })
        ));
        assert!(PackedSplats::from_bytes(&[]).is_err());
    }

    #[test]
    fn negative_quaternion_components_round_down() {
        let mut cloud = sample_cloud();
        cloud.rotations[0] = [-1.0, 0.5, -0.5, 0.0];
        let packed = PackedSplats::pack(&cloud);
        assert_eq!(packed.rotation_bytes(0), [0, 192, 64, 128]);
    }
}
