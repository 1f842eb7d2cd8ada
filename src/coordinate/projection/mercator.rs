//! Spherical (Web) Mercator

use std::f64::consts::PI;
use super::Projection;

/// Latitude limit of the square Web Mercator world
const MAX_LATITUDE: f64 = 85.06;

/// Web Mercator on a sphere of the ellipsoid's semi-major axis
pub struct WebMercator {
    radius: f64,
    false_easting: f64,
    false_northing: f64,
}

impl WebMercator {
    pub fn new(radius: f64, false_easting: f64, false_northing: f64) -> Self {
        WebMercator { radius, false_easting, false_northing }
    }
}

impl Projection for WebMercator {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lat = lat.max(-MAX_LATITUDE).min(MAX_LATITUDE);

        let x = lon * PI * self.radius / 180.0;
        let lat_rad = lat * PI / 180.0;
        let y = self.radius * f64::ln(f64::tan(PI / 4.0 + lat_rad / 2.0));

        (x + self.false_easting, y + self.false_northing)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.false_easting;
        let y = y - self.false_northing;

        let lon = (x * 180.0) / (self.radius * PI);
        let lat = (2.0 * f64::atan(f64::exp(y / self.radius)) - PI / 2.0) * 180.0 / PI;

        (lon, lat)
    }

    fn name(&self) -> &'static str {
        "Web Mercator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_point() {
        let merc = WebMercator::new(6378137.0, 0.0, 0.0);
        let (x, y) = merc.forward(-74.006, 40.7128);
        assert!((x - -8238310.24).abs() < 1.0);
        assert!((y - 4970071.58).abs() < 1.0);
    }

    #[test]
    fn test_latitude_is_clamped() {
        let merc = WebMercator::new(6378137.0, 0.0, 0.0);
        let (_, y_pole) = merc.forward(0.0, 89.9);
        let (_, y_limit) = merc.forward(0.0, MAX_LATITUDE);
        assert_eq!(y_pole, y_limit);
    }
}
