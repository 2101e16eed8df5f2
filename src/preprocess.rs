//! # Image loading and preprocessing
//!
//! Loads the input images from disk and smooths them with a separable Gaussian before matching.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use image::{GrayImage, RgbImage};
use imageproc::filter::separable_filter_equal;
use serde::Deserialize;

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Gaussian blur applied to both images before matching.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BlurParams {
    pub kernel_size: usize,
    /// Standard deviation, a non-positive value derives it from the kernel size.
    pub sigma: f32
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            sigma: 1.0
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Load an image from disk and convert it to 8 bit grayscale.
pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source
    })?;

    Ok(img.to_luma8())
}

/// Load an image from disk and convert it to 8 bit RGB.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source
    })?;

    Ok(img.to_rgb8())
}

/// Build a normalised 1D Gaussian kernel of the given odd size.
pub fn gaussian_kernel(size: usize, sigma: f32) -> Result<Vec<f32>> {
    if size == 0 || size % 2 == 0 {
        return Err(Error::InvalidParams(format!(
            "Gaussian kernel size must be odd, got {}", size
        )));
    }

    let sigma = if sigma > 0.0 {
        sigma
    }
    else {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };

    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }

    Ok(kernel)
}

/// Blur a grayscale image with a `size × size` Gaussian.
pub fn gaussian_blur(img: &GrayImage, size: usize, sigma: f32) -> Result<GrayImage> {
    let kernel = gaussian_kernel(size, sigma)?;

    Ok(separable_filter_equal(img, &kernel))
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let kernel = gaussian_kernel(5, 1.0).unwrap();

        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((kernel[0] - kernel[4]).abs() < 1e-7);
        assert!(kernel[2] > kernel[1] && kernel[1] > kernel[0]);
    }

    #[test]
    fn kernel_derives_sigma_from_size() {
        let derived = gaussian_kernel(5, 0.0).unwrap();
        let explicit = gaussian_kernel(5, 1.1).unwrap();

        for (a, b) in derived.iter().zip(explicit.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn even_kernel_is_rejected() {
        assert!(matches!(gaussian_kernel(4, 1.0), Err(Error::InvalidParams(_))));
    }

    #[test]
    fn blur_keeps_flat_image_and_dimensions() {
        let img = GrayImage::from_pixel(16, 9, Luma([77]));
        let blurred = gaussian_blur(&img, 5, 1.0).unwrap();

        assert_eq!(blurred.dimensions(), (16, 9));
        assert!(blurred.pixels().all(|p| (p[0] as i32 - 77).abs() <= 1));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_grayscale("does/not/exist.jpg").unwrap_err();

        match err {
            Error::Image { path, .. } => assert!(path.ends_with("exist.jpg")),
            other => panic!("unexpected error {:?}", other)
        }
    }
}
