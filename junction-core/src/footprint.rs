//! Vehicle footprint: the oriented ground-plane rectangle for a tracked
//! vehicle, in corner order front-left, front-right, back-right, back-left.

use crate::geodesy::{offset, WorldPoint};

/// The four ground-plane corners of a vehicle footprint, in FL/FR/BR/BL
/// order. The polygon is not closed (the first corner is not repeated).
pub type RectangleCorners = [WorldPoint; 4];

/// Build the oriented footprint rectangle for a vehicle centered at
/// `(center_lat, center_lon)`, heading `heading_deg`, with the given
/// `length`/`width` in meters.
pub fn vehicle_rectangle(
    center_lat: f64,
    center_lon: f64,
    heading_deg: f64,
    length: f64,
    width: f64,
) -> RectangleCorners {
    let half_length = length / 2.0;
    let half_width = width / 2.0;
    let radius = (half_length * half_length + half_width * half_width).sqrt();
    let theta = half_width.atan2(half_length).to_degrees();

    let corner_at = |delta: f64| {
        offset(center_lat, center_lon, radius, (heading_deg + delta).rem_euclid(360.0))
    };

    [
        corner_at(theta),         // front-left
        corner_at(-theta),        // front-right
        corner_at(180.0 + theta), // back-right
        corner_at(180.0 - theta), // back-left
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::latlon_to_cart;
    use approx::assert_relative_eq;

    #[test]
    fn corners_centroid_matches_center() {
        let (lat, lon) = (37.67676, 126.74583);
        let corners = vehicle_rectangle(lat, lon, 45.0, 4.5, 2.0);

        let cart: Vec<_> = corners
            .iter()
            .map(|c| latlon_to_cart(c.lat, c.lon, lat, lon))
            .collect();
        let cx: f64 = cart.iter().map(|c| c.x).sum::<f64>() / 4.0;
        let cy: f64 = cart.iter().map(|c| c.y).sum::<f64>() / 4.0;
        assert_relative_eq!(cx, 0.0, epsilon = 1e-6);
        assert_relative_eq!(cy, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn corners_are_convex_and_ordered() {
        let (lat, lon) = (37.67676, 126.74583);
        let corners = vehicle_rectangle(lat, lon, 0.0, 4.5, 2.0);
        let cart: Vec<_> = corners
            .iter()
            .map(|c| latlon_to_cart(c.lat, c.lon, lat, lon))
            .collect();

        // Heading 0 (north): front-left/front-right sit ahead (+y), back
        // corners sit behind (-y); left corners have negative x.
        assert!(cart[0].y > 0.0 && cart[0].x < 0.0); // FL
        assert!(cart[1].y > 0.0 && cart[1].x > 0.0); // FR
        assert!(cart[2].y < 0.0 && cart[2].x > 0.0); // BR
        assert!(cart[3].y < 0.0 && cart[3].x < 0.0); // BL
    }

    #[test]
    fn corner_distance_from_center_matches_diagonal_half() {
        let (lat, lon) = (0.0, 0.0);
        let corners = vehicle_rectangle(lat, lon, 10.0, 4.5, 2.0);
        let expected = ((4.5_f64 / 2.0).powi(2) + (2.0_f64 / 2.0).powi(2)).sqrt();
        for c in &corners {
            let cart = latlon_to_cart(c.lat, c.lon, lat, lon);
            assert_relative_eq!(cart.norm(), expected, epsilon = 1e-3);
        }
    }
}
