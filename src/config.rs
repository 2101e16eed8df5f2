//! # Pipeline configuration
//!
//! Every tunable of the pipeline lives in [`StereoConfig`], which can be built in code or
//! deserialised from TOML. Missing fields fall back to their defaults.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::block_matching::Params;
use crate::error::*;
use crate::preprocess::BlurParams;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Name of the configuration file the binary looks for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stereo_cloud.toml";

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StereoConfig {
    pub left_image: PathBuf,
    pub right_image: PathBuf,
    pub output: PathBuf,
    pub blur: BlurParams,
    pub matcher: Params,
    /// Assumed focal length as a fraction of the image width.
    pub focal_multiplier: f32
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            left_image: PathBuf::from("image_0.jpg"),
            right_image: PathBuf::from("image_1.jpg"),
            output: PathBuf::from("out.ply"),
            blur: BlurParams::default(),
            matcher: Params::default(),
            focal_multiplier: 0.8
        }
    }
}

impl StereoConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(StereoConfig::from_toml_str("").unwrap(), StereoConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = StereoConfig::from_toml_str(
            r#"
            left_image = "left.png"
            focal_multiplier = 1.2

            [matcher]
            block_size = 9
            min_disparity = 25
            num_disparities = 87
            "#
        ).unwrap();

        assert_eq!(config.left_image, PathBuf::from("left.png"));
        assert_eq!(config.right_image, PathBuf::from("image_1.jpg"));
        assert_eq!(config.focal_multiplier, 1.2);
        assert_eq!(config.matcher.block_size, 9);
        assert_eq!(config.matcher.min_disparity, 25);
        assert_eq!(config.matcher.num_disparities, 87);
        assert_eq!(config.matcher.uniqueness_ratio, 15);
        assert_eq!(config.blur, BlurParams::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(
            StereoConfig::from_toml_str("focal_multiplier = \"wide\""),
            Err(Error::Config(_))
        ));
    }
}
