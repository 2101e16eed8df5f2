//! # Block matching disparity computation
//!
//! This module provides a sum-of-absolute-differences block matcher in the style of the classic
//! stereo BM algorithm. Window costs are accumulated row by row from sliding column sums, so
//! only one row of costs per candidate disparity is held at a time. The best candidate is
//! checked for texture and uniqueness, and the result is refined to sub-pixel precision in
//! fixed point before being converted to a float map.
//!
//! Pixels without a confident match are assigned `min_disparity - 1`, which is therefore the
//! minimum of the map whenever at least one pixel is rejected.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::debug;
use serde::Deserialize;

use crate::disparity::{DisparityAlgorithm, DisparityMap, StereoFrame};
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of fixed-point sub-steps per pixel of disparity.
pub const DISP_SCALE: i32 = 16;

/// Upper limit on the size of the disparity search range.
pub const MAX_NUM_DISPARITIES: usize = 4096;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

pub struct BlockMatcher {
    params: Params,
    half_block: usize
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Side length of the square matching window, must be odd.
    pub block_size: usize,
    pub min_disparity: i32,
    pub num_disparities: usize,
    /// Margin in percent by which the best cost must beat every other non-adjacent candidate.
    pub uniqueness_ratio: u32,
    /// Minimum sum of horizontal gradients inside the window.
    pub texture_threshold: u32
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            block_size: 21,
            min_disparity: 0,
            num_disparities: 64,
            uniqueness_ratio: 15,
            texture_threshold: 10
        }
    }
}

impl Params {
    /// Largest disparity which will be searched.
    pub fn max_disparity(&self) -> i32 {
        self.min_disparity + self.num_disparities as i32 - 1
    }

    /// Value written to pixels which have no confident match.
    pub fn sentinel(&self) -> f32 {
        (self.min_disparity - 1) as f32
    }

    fn validate(&self) -> Result<()> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(Error::InvalidParams(format!(
                "block size must be odd and at least 3, got {}", self.block_size
            )));
        }
        if self.num_disparities == 0 || self.num_disparities > MAX_NUM_DISPARITIES {
            return Err(Error::InvalidParams(format!(
                "number of disparities must be in 1..={}, got {}",
                MAX_NUM_DISPARITIES, self.num_disparities
            )));
        }
        let range_fits = self.min_disparity.checked_sub(1).is_some()
            && self.min_disparity
                .checked_add(self.num_disparities as i32 - 1)
                .is_some();
        if !range_fits {
            return Err(Error::InvalidParams(format!(
                "disparity range {} + {} overflows",
                self.min_disparity, self.num_disparities
            )));
        }
        if self.uniqueness_ratio >= 100 {
            return Err(Error::InvalidParams(format!(
                "uniqueness ratio must be below 100, got {}", self.uniqueness_ratio
            )));
        }

        Ok(())
    }
}

impl BlockMatcher {
    /// Create a new instance of the algorithm with the given parameters.
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;

        let half_block = params.block_size / 2;

        Ok(Self {
            params,
            half_block
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Horizontal window sums of a row of column sums, written at each window centre.
    ///
    /// Only the centres `half_block..width - half_block` are written.
    fn box_row(&self, cols: &[u64], out: &mut [u64]) {
        let half = self.half_block;
        let mut acc: u64 = cols[..self.params.block_size].iter().sum();
        out[half] = acc;

        for x in (half + 1)..(cols.len() - half) {
            acc = acc + cols[x + half] - cols[x - half - 1];
            out[x] = acc;
        }
    }

    /// Fixed-point disparity for the given cost curve, or `None` if the best match is not
    /// unique enough.
    fn select(&self, crits: &[u64]) -> Option<i32> {
        // Find index of minimum value, first one wins on ties
        let min_index = crits
            .iter()
            .enumerate()
            .fold(0, |min_idx, (idx, &val)| {
                if val < crits[min_idx] {
                    idx
                }
                else {
                    min_idx
                }
            });
        let best = crits[min_index];

        // Uniqueness check against every candidate which is not a direct neighbour
        let ratio = self.params.uniqueness_ratio as u64;
        let ambiguous = crits
            .iter()
            .enumerate()
            .filter(|(idx, _)| (*idx as isize - min_index as isize).abs() > 1)
            .any(|(_, &val)| val * (100 - ratio) < best * 100);

        if ambiguous {
            return None;
        }

        let mut raw = (self.params.min_disparity + min_index as i32) * DISP_SCALE;

        // Sub pixel interpolation, skipped on the outer edge of the criterion
        if min_index > 0 && min_index < crits.len() - 1 {
            let c_left = crits[min_index - 1] as f32;
            let c_right = crits[min_index + 1] as f32;
            let denom = 2.0 * (c_left + c_right - 2.0 * best as f32);

            if denom > 0.0 {
                let offset = (c_left - c_right) / denom;
                raw += (offset * DISP_SCALE as f32).round() as i32;
            }
        }

        Some(raw)
    }
}

impl DisparityAlgorithm for BlockMatcher {
    /// Compute the disparity map for the given frame.
    fn compute(&mut self, frame: &StereoFrame) -> Result<DisparityMap> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;

        let sentinel = self.params.sentinel();

        // A window which does not fit anywhere leaves every pixel unmatched
        if self.params.block_size > width.min(height) {
            debug!(
                "Block size {} does not fit in a {}x{} image, no pixel can be matched",
                self.params.block_size, width, height
            );
            return DisparityMap::from_raw(
                frame.width(),
                frame.height(),
                vec![sentinel; width * height]
            );
        }

        debug!("Computing disparity with following parameters: {:?}", self.params);

        let left = frame.left.as_raw();
        let right = frame.right.as_raw();
        let block = self.params.block_size;
        let num = self.params.num_disparities;
        let half = self.half_block as isize;
        let min_d = self.params.min_disparity as isize;
        let max_d = self.params.max_disparity() as isize;

        let grad = |x: usize, y: usize| -> u64 {
            if x + 1 < width {
                (left[y * width + x + 1] as i32 - left[y * width + x] as i32).unsigned_abs() as u64
            }
            else {
                0
            }
        };

        let diff = |x: usize, y: usize, k: usize| -> u64 {
            let xr = x as isize - (min_d + k as isize);
            if xr >= 0 && (xr as usize) < width {
                (left[y * width + x] as i32 - right[y * width + xr as usize] as i32)
                    .unsigned_abs() as u64
            }
            else {
                0
            }
        };

        // ---- COLUMN SUMS ----

        // Sums over the band of `block` rows centred on the current row, one set per candidate
        let mut tex_cols = vec![0u64; width];
        let mut cost_cols = vec![0u64; num * width];

        for y in 0..block {
            for x in 0..width {
                tex_cols[x] += grad(x, y);
                for k in 0..num {
                    cost_cols[k * width + x] += diff(x, y, k);
                }
            }
        }

        // ---- STEREO CORRELATION ----

        let mut values = vec![sentinel; width * height];
        let mut tex_row = vec![0u64; width];
        let mut cost_row = vec![0u64; num * width];
        let mut crits: Vec<u64> = Vec::with_capacity(num);

        // Every candidate window in the right image must lie inside the image
        let x_start = (half + max_d).max(half);
        let x_end = (width as isize - half + min_d).min(width as isize - half);

        for y in self.half_block..(height - self.half_block) {

            // Slide the band down by one row
            if y > self.half_block {
                let old = y - self.half_block - 1;
                let new = y + self.half_block;
                for x in 0..width {
                    tex_cols[x] = tex_cols[x] + grad(x, new) - grad(x, old);
                    for k in 0..num {
                        let c = &mut cost_cols[k * width + x];
                        *c = *c + diff(x, new, k) - diff(x, old, k);
                    }
                }
            }

            if x_start >= x_end {
                continue;
            }

            self.box_row(&tex_cols, &mut tex_row);
            for (cols, row) in cost_cols.chunks(width).zip(cost_row.chunks_mut(width)) {
                self.box_row(cols, row);
            }

            for x in x_start..x_end {
                let x = x as usize;

                if tex_row[x] < self.params.texture_threshold as u64 {
                    continue;
                }

                crits.clear();
                crits.extend((0..num).map(|k| cost_row[k * width + x]));

                if let Some(raw) = self.select(&crits) {
                    values[y * width + x] = raw as f32 / DISP_SCALE as f32;
                }
            }
        }

        let map = DisparityMap::from_raw(frame.width(), frame.height(), values)?;

        debug!(
            "Disparity range: {:?}..{:?}, {} valid pixels",
            map.min_value(),
            map.max_value(),
            map.valid_count()
        );

        Ok(map)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
