//! Throttled front-to-back depth sorting
//!
//! A 16-bit counting sort over quantized view depths. Depth distribution in
//! real scenes is broad, and at ~10^6 splats the O(N) pass amortizes the
//! 256 KiB histogram easily. Stability within a bucket is irrelevant: equal
//! depths commute under the blend.
//!
//! The sorter also owns the incremental-motion throttle: re-sorting is
//! skipped while the depth row of the view-projection matrix stays within a
//! small cosine of the last sorted one, which doubles as cancellation of
//! superseded sort requests.

use crate::pack::{PackedSplats, RECORD_WORDS};

/// Cosine slack on the view depth row below which a sort request is skipped.
pub const THROTTLE_EPSILON: f32 = 0.01;

/// Fixed-point scale applied to view depths before quantization.
const DEPTH_SCALE: f32 = 4096.0;

/// Number of counting-sort buckets (16-bit keys).
const BUCKETS: usize = 65536;

/// One accepted sort result: visibility-ordered splat indices, front first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplatOrder {
    pub indices: Vec<u32>,
    pub visible: u32,
    pub total: u32,
}

/// Depth sorter state kept between frames.
#[derive(Clone, Debug)]
pub struct DepthSorter {
    alpha_cutoff: u8,
    last_axis: Option<[f32; 3]>,
}

impl Default for DepthSorter {
    fn default() -> Self {
        Self {
            alpha_cutoff: 1,
            last_axis: None,
        }
    }
}

impl DepthSorter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alpha_cutoff(&self) -> u8 {
        self.alpha_cutoff
    }

    /// Update the opacity-byte cutoff (clamped to at least 1) and force the
    /// next sort to run regardless of view similarity.
    pub fn set_alpha_cutoff(&mut self, cutoff: u8) {
        self.alpha_cutoff = cutoff.max(1);
        self.last_axis = None;
    }

    /// Drop the stored view axis so the next sort is never throttled.
    pub fn invalidate(&mut self) {
        self.last_axis = None;
    }

    /// Sort the scene for the given column-major view-projection matrix.
    ///
    /// Returns `None` when the view direction moved less than the throttle
    /// tolerance since the last accepted sort.
    pub fn sort(&mut self, packed: &PackedSplats, view_proj: &[f32; 16]) -> Option<SplatOrder> {
        let axis = [view_proj[2], view_proj[6], view_proj[10]];
        if let Some(prev) = self.last_axis {
            let dot = prev[0] * axis[0] + prev[1] * axis[1] + prev[2] * axis[2];
            if (dot - 1.0).abs() < THROTTLE_EPSILON {
                return None;
            }
        }
        self.last_axis = Some(axis);

        let total = packed.count();

        // Cull: only splats at or above the opacity cutoff take part.
        let visible: Vec<u32> = (0..total)
            .filter(|&i| packed.alpha_byte(i) >= self.alpha_cutoff)
            .map(|i| i as u32)
            .collect();

        if visible.is_empty() {
            return Some(SplatOrder {
                indices: Vec::new(),
                visible: 0,
                total: total as u32,
            });
        }

        let floats = packed.floats();
        let mut min_depth = i32::MAX;
        let mut max_depth = i32::MIN;
        let depths: Vec<i32> = visible
            .iter()
            .map(|&i| {
                let base = i as usize * RECORD_WORDS;
                let depth = ((axis[0] * floats[base]
                    + axis[1] * floats[base + 1]
                    + axis[2] * floats[base + 2])
                    * DEPTH_SCALE) as i32;
                min_depth = min_depth.min(depth);
                max_depth = max_depth.max(depth);
                depth
            })
            .collect();

        // Quantize into 16-bit buckets; a flat depth range degenerates to a
        // single bucket.
        let range = (max_depth - min_depth) as f32;
        let depth_inv = if range > 0.0 {
            (BUCKETS - 1) as f32 / range
        } else {
            0.0
        };

        let mut counts = vec![0u32; BUCKETS];
        let buckets: Vec<u16> = depths
            .iter()
            .map(|&d| {
                let b = (((d - min_depth) as f32 * depth_inv) as usize).min(BUCKETS - 1);
                counts[b] += 1;
                b as u16
            })
            .collect();

        let mut starts = vec![0u32; BUCKETS];
        for b in 1..BUCKETS {
            starts[b] = starts[b - 1] + counts[b - 1];
        }

        // Scatter in ascending bucket order: smaller depth lands first,
        // which is front first under the host's depth-row sign.
        let mut indices = vec![0u32; visible.len()];
        for (slot, &splat) in buckets.iter().zip(&visible) {
            let at = starts[*slot as usize];
            indices[at as usize] = splat;
            starts[*slot as usize] += 1;
        }

        Some(SplatOrder {
            visible: indices.len() as u32,
            total: total as u32,
            indices,
        })
    }
}
