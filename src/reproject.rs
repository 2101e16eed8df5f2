//! # 3D reprojection
//!
//! Maps every pixel of a disparity map to a 3D point through a 4x4 perspective transform.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::{Matrix4, Point3, Vector4};

use crate::disparity::DisparityMap;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Row-major grid of 3D points, one per disparity pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct PointField {
    width: u32,
    height: u32,
    points: Vec<Point3<f32>>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl PointField {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Point3<f32> {
        self.points[(y * self.width + x) as usize]
    }

    pub fn points(&self) -> &[Point3<f32>] {
        &self.points
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Build the reprojection matrix for an uncalibrated camera.
///
/// The principal point is assumed to be the image centre and the focal length
/// `focal_multiplier * width`. The y axis is flipped so that it points up.
pub fn reprojection_matrix(width: u32, height: u32, focal_multiplier: f32) -> Matrix4<f32> {
    let w = width as f32;
    let h = height as f32;
    let f = focal_multiplier * w;

    Matrix4::new(
        1.0,  0.0, 0.0, -0.5 * w,
        0.0, -1.0, 0.0,  0.5 * h,
        0.0,  0.0, 0.0,  -f,
        0.0,  0.0, 1.0,  0.0
    )
}

/// Reproject every pixel of the disparity map to 3D.
///
/// Each pixel `(x, y, d, 1)` is multiplied by `q` and divided by its homogeneous component. A
/// zero homogeneous component yields non-finite coordinates.
pub fn reproject_to_3d(disparity: &DisparityMap, q: &Matrix4<f32>) -> PointField {
    let (width, height) = disparity.dimensions();
    let mut points = Vec::with_capacity((width * height) as usize);

    for y in 0..height {
        for x in 0..width {
            let p = q * Vector4::new(x as f32, y as f32, disparity.get(x, y), 1.0);
            points.push(Point3::new(p.x / p.w, p.y / p.w, p.z / p.w));
        }
    }

    PointField {
        width,
        height,
        points
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_layout() {
        let q = reprojection_matrix(640, 480, 0.8);

        assert_eq!(q[(0, 3)], -320.0);
        assert_eq!(q[(1, 1)], -1.0);
        assert_eq!(q[(1, 3)], 240.0);
        assert_eq!(q[(2, 3)], -512.0);
        assert_eq!(q[(3, 2)], 1.0);
        assert_eq!(q[(3, 3)], 0.0);
    }

    #[test]
    fn reprojects_single_pixel() {
        let mut disp = DisparityMap::new(4, 2);
        disp.put(3, 1, 2.0);
        disp.update_stats();
        let q = reprojection_matrix(4, 2, 0.5);

        let field = reproject_to_3d(&disp, &q);
        let p = field.get(3, 1);

        // X = (3 - 2) / 2, Y = (-1 + 1) / 2, Z = -2 / 2
        assert_eq!(field.dimensions(), (4, 2));
        assert!((p.x - 0.5).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!((p.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_disparity_is_not_finite() {
        let disp = DisparityMap::new(2, 2);
        let q = reprojection_matrix(2, 2, 0.8);

        let field = reproject_to_3d(&disp, &q);

        assert!(!field.get(0, 0).z.is_finite());
    }

    #[test]
    fn reprojection_is_deterministic() {
        let values: Vec<f32> = (0..48).map(|i| 1.0 + (i % 7) as f32 * 0.3125).collect();
        let disp = DisparityMap::from_raw(8, 6, values).unwrap();
        let q = reprojection_matrix(8, 6, 0.8);

        let a = reproject_to_3d(&disp, &q);
        let b = reproject_to_3d(&disp, &q);

        for (pa, pb) in a.points().iter().zip(b.points()) {
            assert_eq!(pa.x.to_bits(), pb.x.to_bits());
            assert_eq!(pa.y.to_bits(), pb.y.to_bits());
            assert_eq!(pa.z.to_bits(), pb.z.to_bits());
        }
    }
}
