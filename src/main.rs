//! # stereo-cloud
//!
//! Computes a colored point cloud from the stereo pair named in `stereo_cloud.toml`, or from
//! `image_0.jpg` / `image_1.jpg` when no configuration file is present.

use std::path::Path;

use log::{error, info};
use stereo_cloud::config::DEFAULT_CONFIG_FILE;
use stereo_cloud::prelude::*;

#[cfg(not(feature = "display"))]
fn observers() -> Vec<Box<dyn PipelineObserver>> {
    vec![Box::new(LogObserver)]
}

#[cfg(feature = "display")]
fn observers() -> Vec<Box<dyn PipelineObserver>> {
    vec![Box::new(LogObserver), Box::new(DisplayObserver)]
}

fn run() -> Result<()> {
    let config = if Path::new(DEFAULT_CONFIG_FILE).exists() {
        info!("Using configuration from {}", DEFAULT_CONFIG_FILE);
        StereoConfig::from_toml_file(DEFAULT_CONFIG_FILE)?
    }
    else {
        StereoConfig::default()
    };

    Pipeline::new(config).with_observer(observers()).run()?;

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
