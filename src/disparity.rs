//! # General disparity objects
//!
//! This module provides generic disparity traits and structures for use by different algorithms.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{GrayImage, ImageBuffer, Luma};
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Single channel floating point image.
pub type GrayFloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A pair of preprocessed grayscale images of the same scene.
pub struct StereoFrame {
    pub left: GrayImage,
    pub right: GrayImage
}

/// A generic floating point disparity map.
#[derive(Clone, Debug)]
pub struct DisparityMap {
    data: GrayFloatImage,
    pub max_disp: Option<f32>,
    pub min_disp: Option<f32>
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

pub trait DisparityAlgorithm {
    /// Compute the disparity map of the given stereo frame.
    fn compute(&mut self, frame: &StereoFrame) -> Result<DisparityMap>;
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StereoFrame {
    /// Build a frame, checking that both images have the same dimensions.
    pub fn new(left: GrayImage, right: GrayImage) -> Result<Self> {
        if left.dimensions() != right.dimensions() {
            return Err(Error::DimensionMismatch(format!(
                "left image is {:?} but right image is {:?}",
                left.dimensions(),
                right.dimensions()
            )));
        }

        Ok(Self { left, right })
    }

    pub fn width(&self) -> u32 {
        self.left.width()
    }

    pub fn height(&self) -> u32 {
        self.left.height()
    }
}

impl DisparityMap {
    pub fn new(width: u32, height: u32) -> Self {
        DisparityMap {
            data: GrayFloatImage::new(width, height),
            min_disp: None,
            max_disp: None
        }
    }

    /// Build a map from raw row-major values, recording the observed min and max.
    pub fn from_raw(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let len = values.len();
        let data = GrayFloatImage::from_raw(width, height, values).ok_or_else(|| {
            Error::DimensionMismatch(format!(
                "{} values cannot fill a {}x{} disparity map", len, width, height
            ))
        })?;

        let mut map = DisparityMap {
            data,
            min_disp: None,
            max_disp: None
        };
        map.update_stats();

        Ok(map)
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.data.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data.get_pixel(x, y)[0]
    }

    pub fn put(&mut self, x: u32, y: u32, val: f32) {
        self.data.put_pixel(x, y, Luma([val]))
    }

    /// Row-major view of the disparity values.
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_raw()
    }

    /// Recompute `min_disp` and `max_disp` from the stored values.
    pub fn update_stats(&mut self) {
        let mut min = None;
        let mut max = None;

        for &val in self.data.as_raw() {
            min = Some(match min {
                Some(m) if m <= val => m,
                _ => val
            });
            max = Some(match max {
                Some(m) if m >= val => m,
                _ => val
            });
        }

        self.min_disp = min;
        self.max_disp = max;
    }

    /// Minimum value in the map, which doubles as the "no match" sentinel.
    pub fn min_value(&self) -> Option<f32> {
        self.min_disp
    }

    pub fn max_value(&self) -> Option<f32> {
        self.max_disp
    }

    /// Row-major mask which is `true` where the disparity is strictly above the map minimum.
    pub fn validity_mask(&self) -> Vec<bool> {
        let min = match self.min_disp {
            Some(m) => m,
            None => return vec![false; self.data.as_raw().len()]
        };

        self.data
            .as_raw()
            .iter()
            .map(|&d| d > min)
            .collect()
    }

    /// Number of pixels passing the validity mask.
    pub fn valid_count(&self) -> usize {
        self.validity_mask().iter().filter(|&&v| v).count()
    }

    /// Converts the image into a dynamic Luma8 image.
    pub fn to_luma(&self) -> GrayImage {

        let mut new = image::GrayImage::new(
            self.data.width(),
            self.data.height()
        );

        for y in 0..new.height() {
            for x in 0..new.width() {
                let val = self.get(x, y).clamp(0.0, 255.0);

                *new.get_pixel_mut(x, y) = image::Luma([val as u8]);
            }
        }

        new
    }

    /// Converts the image to a normalised GrayImage.
    ///
    /// Maps the observed disparity range onto 0..255, so that the sentinel becomes black. If the
    /// range is not set or is empty then the function is equivalent to `.to_luma()`.
    pub fn to_luma_normalised(&self) -> GrayImage {

        let (offset, mult) = match (self.min_disp, self.max_disp) {
            (Some(min), Some(max)) if max > min => (min, 255.0 / (max - min)),
            _ => return self.to_luma()
        };

        let mut new = image::GrayImage::new(
            self.data.width(),
            self.data.height()
        );

        for y in 0..new.height() {
            for x in 0..new.width() {
                let val = ((self.get(x, y) - offset) * mult).clamp(0.0, 255.0);

                *new.get_pixel_mut(x, y) = image::Luma([val as u8]);
            }
        }

        new
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_map_has_no_valid_pixels() {
        let map = DisparityMap::from_raw(4, 4, vec![5.0; 16]).unwrap();

        assert_eq!(map.min_value(), Some(5.0));
        assert_eq!(map.max_value(), Some(5.0));
        assert!(map.validity_mask().iter().all(|&v| !v));
        assert_eq!(map.valid_count(), 0);
    }

    #[test]
    fn mask_excludes_only_minimum() {
        let map = DisparityMap::from_raw(3, 1, vec![-1.0, 2.5, -1.0]).unwrap();

        assert_eq!(map.validity_mask(), vec![false, true, false]);
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(matches!(
            DisparityMap::from_raw(2, 2, vec![0.0; 3]),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn normalised_luma_spans_full_range() {
        let map = DisparityMap::from_raw(2, 1, vec![10.0, 20.0]).unwrap();
        let luma = map.to_luma_normalised();

        assert_eq!(luma.get_pixel(0, 0)[0], 0);
        assert_eq!(luma.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn frame_rejects_mismatched_images() {
        let res = StereoFrame::new(GrayImage::new(4, 4), GrayImage::new(5, 4));
        assert!(matches!(res, Err(Error::DimensionMismatch(_))));
    }
}
