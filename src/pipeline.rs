//! # Stereo to point cloud pipeline
//!
//! Runs the full sequence: load and blur the image pair, compute disparity, reproject it to 3D,
//! keep the valid points and write them to a PLY file.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

use image::{GrayImage, RgbImage};
use log::debug;

use crate::block_matching::BlockMatcher;
use crate::config::StereoConfig;
use crate::disparity::{DisparityAlgorithm, DisparityMap, StereoFrame};
use crate::error::*;
use crate::observer::{NullObserver, PipelineObserver, Stage};
use crate::ply::save_ply;
use crate::point_cloud::PointCloud;
use crate::preprocess::{gaussian_blur, load_grayscale, load_rgb};
use crate::reproject::{reproject_to_3d, reprojection_matrix};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

pub struct Pipeline {
    config: StereoConfig,
    observer: Box<dyn PipelineObserver>
}

/// Everything produced by a pipeline run.
pub struct PipelineOutput {
    pub disparity: DisparityMap,
    pub cloud: PointCloud,
    pub output: PathBuf
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Pipeline {
    pub fn new(config: StereoConfig) -> Self {
        Self {
            config,
            observer: Box::new(NullObserver)
        }
    }

    pub fn with_observer<O: PipelineObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &StereoConfig {
        &self.config
    }

    /// Load the configured images and run the pipeline on them.
    pub fn run(&mut self) -> Result<PipelineOutput> {
        self.observer.on_stage(Stage::LoadingImages);

        let left = load_grayscale(&self.config.left_image)?;
        let right = load_grayscale(&self.config.right_image)?;
        let colors = load_rgb(&self.config.left_image)?;

        self.run_on_images(left, right, colors)
    }

    /// Run the pipeline on images already in memory.
    ///
    /// `colors` supplies the vertex colors and must match the left image in size.
    pub fn run_on_images(
        &mut self,
        left: GrayImage,
        right: GrayImage,
        colors: RgbImage
    ) -> Result<PipelineOutput> {
        if left.dimensions() != colors.dimensions() {
            return Err(Error::DimensionMismatch(format!(
                "left image is {:?} but color image is {:?}",
                left.dimensions(),
                colors.dimensions()
            )));
        }

        // ---- PRE FILTER ----

        let blur = &self.config.blur;
        let frame = StereoFrame::new(
            gaussian_blur(&left, blur.kernel_size, blur.sigma)?,
            gaussian_blur(&right, blur.kernel_size, blur.sigma)?
        )?;
        self.observer.on_images(&frame.left, &frame.right);

        // ---- DISPARITY ----

        self.observer.on_stage(Stage::ComputingDisparity);
        let mut matcher = BlockMatcher::new(self.config.matcher.clone())?;
        let disparity = matcher.compute(&frame)?;
        self.observer.on_disparity(&disparity);

        // ---- REPROJECTION ----

        self.observer.on_stage(Stage::Reprojecting);
        let q = reprojection_matrix(frame.width(), frame.height(), self.config.focal_multiplier);
        debug!("Reprojection matrix: {}", q);
        let points = reproject_to_3d(&disparity, &q);
        let cloud = PointCloud::from_masked(&points, &colors, &disparity.validity_mask())?;

        // ---- EXPORT ----

        self.observer.on_stage(Stage::Saving);
        save_ply(&self.config.output, &cloud)?;
        self.observer.on_saved(&self.config.output, cloud.len());

        Ok(PipelineOutput {
            disparity,
            cloud,
            output: self.config.output.clone()
        })
    }
}
