//! Geographic coordinates and distance helpers.

use serde::{Deserialize, Serialize};

/// Mean earth radius used for great-circle distances, in meters.
const EARTH_RADIUS_M: f64 = 6_376_500.0;
/// Meters per degree of latitude.
const METERS_PER_DEG_LAT: f64 = 111_113.9;
/// Meters per degree of longitude around 50°N.
const METERS_PER_DEG_LON: f64 = 71_583.0;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether latitude and longitude are within their valid ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_router::domain::Coordinates;
    ///
    /// assert!(Coordinates::new(50.08, 14.42).is_valid());
    /// assert!(!Coordinates::new(91.0, 14.42).is_valid());
    /// assert!(!Coordinates::new(50.08, -180.5).is_valid());
    /// ```
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance in whole meters.
    pub fn distance_to(&self, other: &Coordinates) -> u32 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        (EARTH_RADIUS_M * c) as u32
    }

    /// Planar approximation of [`distance_to`](Self::distance_to), accurate
    /// enough for walking-radius lookups at mid latitudes.
    pub fn simplified_distance_to(&self, other: &Coordinates) -> u32 {
        let d_lat = (self.lat - other.lat) * METERS_PER_DEG_LAT;
        let d_lon = (self.lon - other.lon) * METERS_PER_DEG_LON;
        (d_lat * d_lat + d_lon * d_lon).sqrt() as u32
    }

    /// Cheap prefilter: true when the points are more than `max_meters`
    /// apart along either axis.
    pub fn too_far_in_one_direction(&self, other: &Coordinates, max_meters: u32) -> bool {
        let max = f64::from(max_meters);
        (self.lat - other.lat).abs() * METERS_PER_DEG_LAT > max
            || (self.lon - other.lon).abs() * METERS_PER_DEG_LON > max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        let p = Coordinates::new(50.08, 14.42);
        assert_eq!(p.distance_to(&p), 0);
        assert_eq!(p.simplified_distance_to(&p), 0);
    }

    #[test]
    fn one_millidegree_of_latitude() {
        let a = Coordinates::new(50.0, 14.0);
        let b = Coordinates::new(50.001, 14.0);
        // ~111 m either way
        assert!((110..=112).contains(&a.distance_to(&b)));
        assert_eq!(a.simplified_distance_to(&b), 111);
    }

    #[test]
    fn prefilter() {
        let a = Coordinates::new(50.0, 14.0);
        let near = Coordinates::new(50.001, 14.001);
        let far = Coordinates::new(50.1, 14.0);
        assert!(!a.too_far_in_one_direction(&near, 400));
        assert!(a.too_far_in_one_direction(&far, 400));
    }

    #[test]
    fn validity_bounds_are_inclusive() {
        assert!(Coordinates::new(90.0, 180.0).is_valid());
        assert!(Coordinates::new(-90.0, -180.0).is_valid());
    }
}
