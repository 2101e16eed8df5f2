//! # Pipeline observers
//!
//! Observers receive progress and intermediate results from the pipeline without taking part
//! in the computation. Every method has a no-op default so implementations only override what
//! they care about.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fmt;
use std::path::Path;

use image::{GrayImage, Luma};
use log::{debug, info, warn};

use crate::disparity::DisparityMap;

#[cfg(feature = "display")]
use minifb::{Window, WindowOptions};

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    LoadingImages,
    ComputingDisparity,
    Reprojecting,
    Saving
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

pub trait PipelineObserver {
    /// Called when the pipeline enters a new stage.
    fn on_stage(&mut self, _stage: Stage) {}

    /// Called with the preprocessed left and right images.
    fn on_images(&mut self, _left: &GrayImage, _right: &GrayImage) {}

    /// Called with the computed disparity map.
    fn on_disparity(&mut self, _disparity: &DisparityMap) {}

    /// Called once the point cloud has been written.
    fn on_saved(&mut self, _path: &Path, _num_points: usize) {}
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Observer which ignores every event.
#[derive(Default)]
pub struct NullObserver;

/// Observer which reports progress through the `log` facade.
#[derive(Default)]
pub struct LogObserver;

/// Observer which shows the images and disparity map in windows, each closed on any key press.
#[cfg(feature = "display")]
#[derive(Default)]
pub struct DisplayObserver;

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::LoadingImages => "loading images",
            Stage::ComputingDisparity => "computing disparity",
            Stage::Reprojecting => "generating 3d point cloud",
            Stage::Saving => "saving point cloud"
        };
        f.write_str(s)
    }
}

impl PipelineObserver for NullObserver {}

impl PipelineObserver for LogObserver {
    fn on_stage(&mut self, stage: Stage) {
        info!("{}...", stage);
    }

    fn on_images(&mut self, left: &GrayImage, _right: &GrayImage) {
        debug!("Images loaded: {}x{}", left.width(), left.height());
    }

    fn on_disparity(&mut self, disparity: &DisparityMap) {
        debug!(
            "Disparity range {:?}..{:?}",
            disparity.min_value(),
            disparity.max_value()
        );
    }

    fn on_saved(&mut self, path: &Path, num_points: usize) {
        if num_points == 0 {
            warn!("No pixel had a valid disparity, {:?} holds an empty cloud", path);
        }
        info!("{:?} saved with {} points", path, num_points);
    }
}

#[cfg(feature = "display")]
impl DisplayObserver {
    /// Show a grayscale image until any key is pressed or the window is closed.
    pub fn show(title: &str, img: &GrayImage) -> crate::error::Result<()> {
        let width = img.width() as usize;
        let height = img.height() as usize;

        let buffer: Vec<u32> = img.pixels().map(|p| luma_to_u32(p[0])).collect();

        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| crate::error::Error::Display(e.to_string()))?;

        window.set_target_fps(60);

        while window.is_open() && window.get_keys().is_empty() {
            window
                .update_with_buffer(&buffer, width, height)
                .map_err(|e| crate::error::Error::Display(e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(feature = "display")]
impl PipelineObserver for DisplayObserver {
    fn on_images(&mut self, left: &GrayImage, right: &GrayImage) {
        for (title, img) in image_views(left, right) {
            if let Err(e) = Self::show(title, &img) {
                warn!("Could not display {} image: {}", title, e);
            }
        }
    }

    fn on_disparity(&mut self, disparity: &DisparityMap) {
        if let Err(e) = Self::show("disparity", &disparity.to_luma_normalised()) {
            warn!("Could not display disparity: {}", e);
        }
    }
}

/// Forward every event to a list of observers.
impl PipelineObserver for Vec<Box<dyn PipelineObserver>> {
    fn on_stage(&mut self, stage: Stage) {
        for o in self.iter_mut() {
            o.on_stage(stage);
        }
    }

    fn on_images(&mut self, left: &GrayImage, right: &GrayImage) {
        for o in self.iter_mut() {
            o.on_images(left, right);
        }
    }

    fn on_disparity(&mut self, disparity: &DisparityMap) {
        for o in self.iter_mut() {
            o.on_disparity(disparity);
        }
    }

    fn on_saved(&mut self, path: &Path, num_points: usize) {
        for o in self.iter_mut() {
            o.on_saved(path, num_points);
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Titled views of the preprocessed pair: each image alone, then both next to each other.
pub fn image_views(left: &GrayImage, right: &GrayImage) -> Vec<(&'static str, GrayImage)> {
    vec![
        ("left", left.clone()),
        ("right", right.clone()),
        ("left | right", side_by_side(left, right))
    ]
}

/// Place two images next to each other, padding the shorter one with black.
pub fn side_by_side(left: &GrayImage, right: &GrayImage) -> GrayImage {
    let width = left.width();

    GrayImage::from_fn(width + right.width(), left.height().max(right.height()), |x, y| {
        if x >= width {
            right.get_pixel_checked(x - width, y).copied().unwrap_or(Luma([0]))
        }
        else {
            left.get_pixel_checked(x, y).copied().unwrap_or(Luma([0]))
        }
    })
}

#[cfg(feature = "display")]
fn luma_to_u32(luma: u8) -> u32 {
    (luma as u32) << 16 | (luma as u32) << 8 | luma as u32
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<Stage>>>);

    impl PipelineObserver for Recorder {
        fn on_stage(&mut self, stage: Stage) {
            self.0.borrow_mut().push(stage);
        }
    }

    #[test]
    fn list_forwards_to_every_observer() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observers: Vec<Box<dyn PipelineObserver>> = vec![
            Box::new(Recorder(seen.clone())),
            Box::new(NullObserver),
            Box::new(Recorder(seen.clone()))
        ];

        observers.on_stage(Stage::Reprojecting);

        assert_eq!(*seen.borrow(), vec![Stage::Reprojecting, Stage::Reprojecting]);
    }

    #[test]
    fn views_show_each_image_and_the_pair() {
        let left = GrayImage::from_pixel(3, 2, Luma([10]));
        let right = GrayImage::from_pixel(3, 2, Luma([200]));

        let views = image_views(&left, &right);
        let titles: Vec<&str> = views.iter().map(|(t, _)| *t).collect();

        assert_eq!(titles, vec!["left", "right", "left | right"]);
        assert_eq!(views[0].1, left);
        assert_eq!(views[1].1, right);

        let pair = &views[2].1;
        assert_eq!(pair.dimensions(), (6, 2));
        assert_eq!(pair.get_pixel(2, 1)[0], 10);
        assert_eq!(pair.get_pixel(3, 0)[0], 200);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::ComputingDisparity.to_string(), "computing disparity");
    }
}
