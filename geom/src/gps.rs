use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, Distance};

/// A GPS coordinate. Longitude is x, latitude is y.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LonLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat {
            longitude: lon,
            latitude: lat,
        }
    }

    /// The great-circle distance to the other point.
    pub fn gps_dist_meters(self, other: LonLat) -> Distance {
        // Haversine distance
        let earth_radius_m = 6_371_000.0;
        let lon1 = self.longitude.to_radians();
        let lon2 = other.longitude.to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let delta_lat = lat2 - lat1;
        let delta_lon = lon2 - lon1;

        let a = (delta_lat / 2.0).sin().powi(2)
            + (delta_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Distance::meters(earth_radius_m * c)
    }

    /// The forward azimuth towards the other point, normalized to `[0, 360)`.
    pub fn bearing_to(self, other: LonLat) -> Angle {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let y = delta_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
        Angle::degrees(y.atan2(x).to_degrees()).normalized()
    }

    /// Squared planar distance in degrees, with the longitude axis scaled by
    /// `cos(latitude)`. Only useful as a cheap comparator over road-segment
    /// scale distances, where curvature is negligible.
    pub fn planar_dist_sq(self, other: LonLat) -> f64 {
        let scale = self.latitude.to_radians().cos();
        let d_lat = other.latitude - self.latitude;
        let d_lon = (other.longitude - self.longitude) * scale;
        d_lat * d_lat + d_lon * d_lon
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LonLat({0}, {1})", self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_known_scale() {
        // One degree of latitude is about 111.2km everywhere.
        let a = LonLat::new(127.9, 37.3);
        let b = LonLat::new(127.9, 38.3);
        let d = a.gps_dist_meters(b).inner_meters();
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = LonLat::new(127.9, 37.3);
        let north = LonLat::new(127.9, 37.31);
        let east = LonLat::new(127.91, 37.3);
        let south = LonLat::new(127.9, 37.29);

        assert!(origin.bearing_to(north).approx_eq(Angle::ZERO, 0.1));
        assert!(origin.bearing_to(east).approx_eq(Angle::degrees(90.0), 0.5));
        assert!(origin.bearing_to(south).approx_eq(Angle::degrees(180.0), 0.1));
    }
}
