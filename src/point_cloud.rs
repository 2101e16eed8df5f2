//! # Colored point clouds
//!
//! Flattens a point field and its color image into a list of valid, colored vertices.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use nalgebra::Point3;

use crate::error::*;
use crate::reproject::PointField;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A single colored vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColoredPoint {
    pub position: Point3<f32>,
    pub color: Rgb<u8>
}

/// Ordered list of colored vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<ColoredPoint>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl PointCloud {
    pub fn new(points: Vec<ColoredPoint>) -> Self {
        Self { points }
    }

    /// Keep the points of `field` where `mask` is set, paired with the matching pixel color.
    ///
    /// The field, the color image and the row-major mask must all cover the same pixel grid.
    pub fn from_masked(field: &PointField, colors: &RgbImage, mask: &[bool]) -> Result<Self> {
        if field.dimensions() != colors.dimensions() {
            return Err(Error::DimensionMismatch(format!(
                "point field is {:?} but color image is {:?}",
                field.dimensions(),
                colors.dimensions()
            )));
        }
        if mask.len() != field.points().len() {
            return Err(Error::DimensionMismatch(format!(
                "mask has {} entries for {} points",
                mask.len(),
                field.points().len()
            )));
        }

        let points = field
            .points()
            .iter()
            .zip(colors.pixels())
            .zip(mask)
            .filter(|(_, valid)| **valid)
            .map(|((&position, &color), _)| ColoredPoint { position, color })
            .collect();

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColoredPoint> {
        self.points.iter()
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disparity::DisparityMap;
    use crate::reproject::{reproject_to_3d, reprojection_matrix};

    fn gradient_colors(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]))
    }

    #[test]
    fn keeps_masked_points_in_row_major_order() {
        let disp = DisparityMap::from_raw(
            3, 2,
            vec![-1.0, 4.0, -1.0,
                  2.0, -1.0, 8.0]
        ).unwrap();
        let field = reproject_to_3d(&disp, &reprojection_matrix(3, 2, 0.8));
        let colors = gradient_colors(3, 2);

        let cloud = PointCloud::from_masked(&field, &colors, &disp.validity_mask()).unwrap();

        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.points[0].color, Rgb([1, 0, 200]));
        assert_eq!(cloud.points[1].color, Rgb([0, 1, 200]));
        assert_eq!(cloud.points[2].color, Rgb([2, 1, 200]));
        assert_eq!(cloud.points[2].position, field.get(2, 1));
    }

    #[test]
    fn constant_map_yields_empty_cloud() {
        let disp = DisparityMap::from_raw(4, 4, vec![5.0; 16]).unwrap();
        let field = reproject_to_3d(&disp, &reprojection_matrix(4, 4, 0.8));

        let cloud = PointCloud::from_masked(
            &field,
            &gradient_colors(4, 4),
            &disp.validity_mask()
        ).unwrap();

        assert!(cloud.is_empty());
    }

    #[test]
    fn rejects_mismatched_color_image() {
        let disp = DisparityMap::new(4, 4);
        let field = reproject_to_3d(&disp, &reprojection_matrix(4, 4, 0.8));

        let res = PointCloud::from_masked(&field, &gradient_colors(5, 4), &disp.validity_mask());

        assert!(matches!(res, Err(Error::DimensionMismatch(_))));
    }

    #[test]
    fn rejects_short_mask() {
        let disp = DisparityMap::new(2, 2);
        let field = reproject_to_3d(&disp, &reprojection_matrix(2, 2, 0.8));

        let res = PointCloud::from_masked(&field, &gradient_colors(2, 2), &[true; 3]);

        assert!(matches!(res, Err(Error::DimensionMismatch(_))));
    }
}
