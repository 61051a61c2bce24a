use std::fmt;

/// Earth's mean radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees, as delivered by a position fix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.latitude, self.longitude)
    }
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Initial bearing from this point to another one.
    /// Returns degrees in [0, 360), where 0 is North.
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        let lat_from = self.latitude.to_radians();
        let lat_to = other.latitude.to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let y = delta_lon.sin() * lat_to.cos();
        let x = lat_from.cos() * lat_to.sin() - lat_from.sin() * lat_to.cos() * delta_lon.cos();

        let bearing = y.atan2(x).to_degrees();

        // atan2 yields (-180, 180]; shift into compass range.
        (bearing + 360.0) % 360.0
    }

    /// Great-circle distance using the Haversine formula.
    /// Read more here: https://en.wikipedia.org/wiki/Haversine_formula
    /// Returns the distance in kilometers.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat_from = self.latitude.to_radians();
        let lat_to = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat_from.cos() * lat_to.cos() * (delta_lon / 2.0).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    /// Project a point forward along a great circle.
    /// bearing: degrees (0-360, where 0 is North)
    /// distance_km: kilometers
    pub fn project(&self, bearing: f64, distance_km: f64) -> GeoPoint {
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();
        let brng = bearing.to_radians();
        let angular_distance = distance_km / EARTH_RADIUS_KM;

        let lat2 = (lat1.sin() * angular_distance.cos()
            + lat1.cos() * angular_distance.sin() * brng.cos())
        .asin();

        let lon2 = lon1
            + (brng.sin() * angular_distance.sin() * lat1.cos())
                .atan2(angular_distance.cos() - lat1.sin() * lat2.sin());

        // Normalize longitude to -180 to 180
        let lon2_normalized = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;

        GeoPoint::new(lat2.to_degrees(), lon2_normalized)
    }
}

/// Haversine distance between two points, in kilometers.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    a.distance_to(&b)
}

/// Initial compass bearing from `a` to `b`, in [0, 360).
pub fn bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    a.bearing_to(&b)
}

/// Distance and target bearing derived from one position fix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BearingReading {
    pub distance_km: f64,
    pub target_bearing_deg: f64,
}

impl BearingReading {
    pub fn between(from: GeoPoint, to: GeoPoint) -> Self {
        Self {
            distance_km: distance(from, to),
            target_bearing_deg: bearing(from, to),
        }
    }
}
