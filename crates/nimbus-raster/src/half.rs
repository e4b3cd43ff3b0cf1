//! IEEE-754 binary16 conversion for the splat-texture wire format
//!
//! The covariance texture carries six f16 values per splat. The encoder and
//! the GPU's `unpack2x16float` must agree bit-for-bit, so the conversion is
//! pinned down here rather than delegated to a rounding-mode-of-the-day
//! library: mantissa bits are truncated (round toward zero), values below
//! the smallest normal half are flushed to signed zero, and overflow clamps
//! to ±infinity.

/// Smallest source exponent that still yields a normal binary16 value.
/// f32 exponent 113 corresponds to 2^-14, the half-precision normal floor.
const MIN_NORMAL_EXP: u32 = 113;

/// First source exponent that overflows binary16 (2^16 and beyond).
const OVERFLOW_EXP: u32 = 142;

/// Convert an f32 to its binary16 bit pattern.
///
/// Truncating conversion: no rounding, subnormal results flush to signed
/// zero, and out-of-range magnitudes (including NaN payloads) become ±inf.
#[inline]
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = (bits >> 23) & 0xff;
    let frac = bits & 0x007f_ffff;

    if exp < MIN_NORMAL_EXP {
        return sign;
    }
    if exp >= OVERFLOW_EXP {
        return sign | 0x7c00;
    }
    sign | (((exp - 112) as u16) << 10) | ((frac >> 13) as u16)
}

/// Convert a binary16 bit pattern back to f32.
#[inline]
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = ((bits as u32) & 0x8000) << 16;
    let exp = ((bits >> 10) & 0x1f) as u32;
    let frac = (bits & 0x03ff) as u32;

    let out = match exp {
        0 => {
            if frac == 0 {
                sign
            } else {
                // Subnormal half: renormalize into the f32 exponent range.
                let shift = frac.leading_zeros() - 21;
                let frac = (frac << (shift + 1)) & 0x03ff;
                sign | ((113 - shift) << 23) | (frac << 13)
            }
        }
        31 => sign | 0x7f80_0000 | (frac << 13),
        _ => sign | ((exp + 112) << 23) | (frac << 13),
    };
    f32::from_bits(out)
}

/// Pack two f32 values into one u32 as adjacent binary16 halves,
/// `a` in the low 16 bits. Mirrors WGSL's `pack2x16float`.
#[inline]
pub fn pack_half_2x16(a: f32, b: f32) -> u32 {
    (f32_to_f16_bits(a) as u32) | ((f32_to_f16_bits(b) as u32) << 16)
}

/// Inverse of [`pack_half_2x16`]. Mirrors WGSL's `unpack2x16float`.
#[inline]
pub fn unpack_half_2x16(word: u32) -> (f32, f32) {
    (
        f16_bits_to_f32(word as u16),
        f16_bits_to_f32((word >> 16) as u16),
    )
}
