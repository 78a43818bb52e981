//! Planar homography between the camera's pixel plane and the (lat, lon)
//! ground plane, computed once from four point correspondences via the
//! direct linear transform.
//!
//! The linear-algebra shape follows the DLT solve in the pack's
//! `planar_tracker.rs` (there solved by hand-rolled Gauss-Jordan elimination
//! for a RANSAC point tracker); here it is the same 8-equation system for
//! the spec's exact 4-correspondence case, solved with `nalgebra`'s LU
//! decomposition instead since there is no outlier rejection to do.

use nalgebra::{Matrix3, SMatrix, SVector};

use crate::error::CoreError;
use crate::geodesy::WorldPoint;

/// A pixel-space point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        ImagePoint { x, y }
    }
}

/// A 3x3 planar homography and its cached inverse, mapping pixel
/// coordinates to (lat, lon) and back.
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
}

impl Homography {
    /// Compute H from four (pixel, world) correspondences, 1:1, non-collinear
    /// in both planes. Fails with [`CoreError::ConfigError`] if the
    /// correspondences are degenerate (the DLT system is singular).
    pub fn from_correspondences(
        image_points: [ImagePoint; 4],
        world_points: [WorldPoint; 4],
    ) -> Result<Self, CoreError> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (image_points[i].x, image_points[i].y);
            let (lat, lon) = (world_points[i].lat, world_points[i].lon);

            let row0 = 2 * i;
            a.set_row(row0, &SMatrix::<f64, 1, 8>::from_row_slice(&[
                -x, -y, -1.0, 0.0, 0.0, 0.0, x * lat, y * lat,
            ]));
            b[row0] = -lat;

            let row1 = 2 * i + 1;
            a.set_row(row1, &SMatrix::<f64, 1, 8>::from_row_slice(&[
                0.0, 0.0, 0.0, -x, -y, -1.0, x * lon, y * lon,
            ]));
            b[row1] = -lon;
        }

        let lu = a.lu();
        let h_vec = lu.solve(&b).ok_or_else(|| {
            CoreError::ConfigError(
                "homography correspondences are collinear or otherwise degenerate".to_string(),
            )
        })?;

        #[rustfmt::skip]
        let h = Matrix3::new(
            h_vec[0], h_vec[1], h_vec[2],
            h_vec[3], h_vec[4], h_vec[5],
            h_vec[6], h_vec[7], 1.0,
        );

        let h_inv = h.try_inverse().ok_or_else(|| {
            CoreError::ConfigError("homography matrix is not invertible".to_string())
        })?;

        Ok(Homography { h, h_inv })
    }

    /// Project a pixel coordinate into (lat, lon).
    pub fn image_to_world(&self, x: f64, y: f64) -> Result<WorldPoint, CoreError> {
        project(&self.h, x, y).map(|(lat, lon)| WorldPoint::new(lat, lon))
    }

    /// Project a world coordinate back into pixel space, rounded to the
    /// nearest integer pixel.
    pub fn world_to_image(&self, lat: f64, lon: f64) -> Result<(i64, i64), CoreError> {
        project(&self.h_inv, lat, lon).map(|(x, y)| (x.round() as i64, y.round() as i64))
    }
}

fn project(m: &Matrix3<f64>, u: f64, v: f64) -> Result<(f64, f64), CoreError> {
    let w = m[(2, 0)] * u + m[(2, 1)] * v + m[(2, 2)];
    if w.abs() < 1e-12 {
        return Err(CoreError::InvalidProjection);
    }
    let a = (m[(0, 0)] * u + m[(0, 1)] * v + m[(0, 2)]) / w;
    let b = (m[(1, 0)] * u + m[(1, 1)] * v + m[(1, 2)]) / w;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_homography() -> Homography {
        let image = [
            ImagePoint::new(335.0, 102.0),
            ImagePoint::new(23.0, 251.0),
            ImagePoint::new(584.0, 234.0),
            ImagePoint::new(146.0, 404.0),
        ];
        let world = [
            WorldPoint::new(37.67675942, 126.74583666),
            WorldPoint::new(37.67696082, 126.74597894),
            WorldPoint::new(37.67687015, 126.74558537),
            WorldPoint::new(37.67703350, 126.74581464),
        ];
        Homography::from_correspondences(image, world).unwrap()
    }

    #[test]
    fn correspondences_round_trip_exactly() {
        let h = sample_homography();
        let image = [
            ImagePoint::new(335.0, 102.0),
            ImagePoint::new(23.0, 251.0),
            ImagePoint::new(584.0, 234.0),
            ImagePoint::new(146.0, 404.0),
        ];
        let world = [
            WorldPoint::new(37.67675942, 126.74583666),
            WorldPoint::new(37.67696082, 126.74597894),
            WorldPoint::new(37.67687015, 126.74558537),
            WorldPoint::new(37.67703350, 126.74581464),
        ];
        for i in 0..4 {
            let w = h.image_to_world(image[i].x, image[i].y).unwrap();
            assert_relative_eq!(w.lat, world[i].lat, epsilon = 1e-6);
            assert_relative_eq!(w.lon, world[i].lon, epsilon = 1e-6);
        }
    }

    #[test]
    fn image_world_image_round_trip() {
        let h = sample_homography();
        let (x, y) = (300.0, 200.0);
        let w = h.image_to_world(x, y).unwrap();
        let (rx, ry) = h.world_to_image(w.lat, w.lon).unwrap();
        assert!((rx as f64 - x).abs() <= 1.0);
        assert!((ry as f64 - y).abs() <= 1.0);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let image = [
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(1.0, 0.0),
            ImagePoint::new(2.0, 0.0),
            ImagePoint::new(3.0, 0.0),
        ];
        let world = [
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(0.0, 1.0),
            WorldPoint::new(0.0, 2.0),
            WorldPoint::new(0.0, 3.0),
        ];
        assert!(Homography::from_correspondences(image, world).is_err());
    }
}
