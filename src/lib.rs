//! # Stereo point clouds
//!
//! This crate turns a stereo image pair into a colored point cloud: block matching disparity,
//! reprojection to 3D through a perspective transform, and ASCII PLY export.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

mod disparity;
mod error;
pub mod block_matching;
pub mod config;
pub mod observer;
pub mod pipeline;
pub mod ply;
pub mod point_cloud;
pub mod preprocess;
pub mod reproject;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::disparity::{DisparityAlgorithm, DisparityMap, GrayFloatImage, StereoFrame};
    pub use crate::error::{Error, Result};
    pub use crate::config::StereoConfig;
    pub use crate::observer::{LogObserver, NullObserver, PipelineObserver, Stage};
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::point_cloud::{ColoredPoint, PointCloud};

    #[cfg(feature = "display")]
    pub use crate::observer::DisplayObserver;
}
