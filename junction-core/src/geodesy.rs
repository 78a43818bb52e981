//! Latitude/longitude primitives: great-circle distance, bearing, forward
//! geodesic offset, and the equirectangular local-tangent-plane projection
//! used everywhere else in this crate for vector kinematics.

/// Mean earth radius in meters, used by both the haversine distance and the
/// forward-geodesic offset. Matches the original `coord_utils.py`.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (and, at the equator, of longitude) under
/// the equirectangular approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// A point in decimal-degree latitude/longitude.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct WorldPoint {
    pub lat: f64,
    pub lon: f64,
}

impl WorldPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        WorldPoint { lat, lon }
    }
}

/// A point in the local tangent-plane Cartesian frame, meters from an anchor.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct CartPoint {
    pub x: f64,
    pub y: f64,
}

impl CartPoint {
    pub fn new(x: f64, y: f64) -> Self {
        CartPoint { x, y }
    }

    pub fn sub(self, other: CartPoint) -> CartPoint {
        CartPoint::new(self.x - other.x, self.y - other.y)
    }

    pub fn dot(self, other: CartPoint) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

/// Great-circle distance between two world points, in meters.
///
/// Not on the hot path (vector kinematics run in the Cartesian frame); kept
/// for testing and for callers that only have raw lat/lon in hand.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1_r, lon1_r) = (lat1.to_radians(), lon1.to_radians());
    let (lat2_r, lon2_r) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2_r - lat1_r;
    let dlon = lon2_r - lon1_r;
    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from `(lat1, lon1)` to `(lat2, lon2)`, in degrees, 0 = north,
/// clockwise, normalized to `[0, 360)`.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1_r, lon1_r) = (lat1.to_radians(), lon1.to_radians());
    let (lat2_r, lon2_r) = (lat2.to_radians(), lon2.to_radians());
    let dlon = lon2_r - lon1_r;

    let y = dlon.sin() * lat2_r.cos();
    let x = lat1_r.cos() * lat2_r.sin() - lat1_r.sin() * lat2_r.cos() * dlon.cos();
    let mut deg = y.atan2(x).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    deg
}

/// Spherical forward geodesic: the point `distance_m` meters from `(lat,
/// lon)` along compass bearing `bearing_deg`.
pub fn offset(lat: f64, lon: f64, distance_m: f64, bearing_deg: f64) -> WorldPoint {
    let r = EARTH_RADIUS_M;
    let distance_rad = distance_m / r;
    let lat_r = lat.to_radians();
    let lon_r = lon.to_radians();
    let bearing_r = bearing_deg.to_radians();

    let new_lat_r = (lat_r.sin() * distance_rad.cos()
        + lat_r.cos() * distance_rad.sin() * bearing_r.cos())
    .asin();

    let new_lon_r = lon_r
        + (bearing_r.sin() * distance_rad.sin() * lat_r.cos())
            .atan2(distance_rad.cos() - lat_r.sin() * new_lat_r.sin());

    WorldPoint::new(new_lat_r.to_degrees(), new_lon_r.to_degrees())
}

/// Equirectangular projection of a world point into the local tangent
/// plane anchored at `(ref_lat, ref_lon)`.
///
/// Must remain the exact inverse of [`cart_to_latlon`] — do not swap in a
/// more accurate projection on only one side of the pair.
pub fn latlon_to_cart(lat: f64, lon: f64, ref_lat: f64, ref_lon: f64) -> CartPoint {
    let lon_meters = METERS_PER_DEGREE * ref_lat.to_radians().cos();
    CartPoint::new(
        (lon - ref_lon) * lon_meters,
        (lat - ref_lat) * METERS_PER_DEGREE,
    )
}

/// Inverse of [`latlon_to_cart`].
pub fn cart_to_latlon(x: f64, y: f64, ref_lat: f64, ref_lon: f64) -> WorldPoint {
    let lon_meters = METERS_PER_DEGREE * ref_lat.to_radians().cos();
    WorldPoint::new(ref_lat + y / METERS_PER_DEGREE, ref_lon + x / lon_meters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bearing_to_self_is_zero() {
        assert_relative_eq!(bearing(37.5, 126.9, 37.5, 126.9), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn bearing_is_antisymmetric_mod_360() {
        let (lat1, lon1) = (37.676, 126.745);
        let (lat2, lon2) = (37.677, 126.746);
        let fwd = bearing(lat1, lon1, lat2, lon2);
        let back = bearing(lat2, lon2, lat1, lon1);
        let diff = (fwd - (back + 180.0)).rem_euclid(360.0);
        assert!(diff < 1e-6 || (360.0 - diff) < 1e-6);
    }

    #[test]
    fn cart_roundtrip_within_tolerance() {
        let ref_lat = 37.67676;
        let ref_lon = 126.74583;
        for (dlat, dlon) in [(0.0, 0.0), (0.001, -0.0007), (-0.002, 0.0015)] {
            let lat = ref_lat + dlat;
            let lon = ref_lon + dlon;
            let cart = latlon_to_cart(lat, lon, ref_lat, ref_lon);
            let back = cart_to_latlon(cart.x, cart.y, ref_lat, ref_lon);
            assert_relative_eq!(back.lat, lat, epsilon = 1e-9);
            assert_relative_eq!(back.lon, lon, epsilon = 1e-9);
        }
    }

    #[test]
    fn offset_then_bearing_back_matches() {
        let (lat, lon) = (37.67676, 126.74583);
        let dest = offset(lat, lon, 50.0, 90.0);
        let d = haversine(lat, lon, dest.lat, dest.lon);
        assert_relative_eq!(d, 50.0, epsilon = 1e-6);
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert_relative_eq!(haversine(1.0, 1.0, 1.0, 1.0), 0.0, epsilon = 1e-9);
    }
}
