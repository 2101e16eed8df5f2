//! # Error standards
//!
//! This module provides a standardised error enum and result type for this crate.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Standard result type used in the stereo-cloud crate.
pub type Result<T> = std::result::Result<T, Error>;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not load image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Malformed PLY data: {0}")]
    Ply(String),

    #[error("Could not parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[cfg(feature = "display")]
    #[error("Display error: {0}")]
    Display(String)
}
