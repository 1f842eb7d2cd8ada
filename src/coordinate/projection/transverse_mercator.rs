//! Transverse Mercator (UTM) on the ellipsoid
//!
//! Snyder series, equations 8-9 to 8-25. Accurate to well under a metre
//! inside a 6 degree zone.

use super::Projection;
use crate::coordinate::ellipsoid::Ellipsoid;

pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    m0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    /// Create the projection; angles are in degrees
    pub fn new(
        ellipsoid: Ellipsoid,
        lat0: f64,
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let m0 = meridian_distance(&ellipsoid, lat0.to_radians());
        TransverseMercator {
            ellipsoid,
            lon0: lon0.to_radians(),
            k0,
            m0,
            false_easting,
            false_northing,
        }
    }
}

/// Distance along the meridian from the equator (Snyder 3-21)
fn meridian_distance(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    let e2 = ellipsoid.e2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    ellipsoid.a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

impl Projection for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2;
        let ep2 = self.ellipsoid.ep2();

        let phi = lat.to_radians();
        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let big_a = (lon.to_radians() - self.lon0) * cos_phi;
        let m = meridian_distance(&self.ellipsoid, phi);

        let x = self.k0 * n * (big_a
            + (1.0 - t + c) * big_a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0);

        let y = self.k0 * (m - self.m0 + n * tan_phi * (big_a * big_a / 2.0
            + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * big_a.powi(6) / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2;
        let ep2 = self.ellipsoid.ep2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = self.m0 + (y - self.false_northing) / self.k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let root = (1.0 - e2).sqrt();
        let e1 = (1.0 - root) / (1.0 + root);

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = (x - self.false_easting) / (n1 * self.k0);

        let phi = phi1 - (n1 * tan1 / r1) * (d * d / 2.0
            - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
            + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                * d.powi(6) / 720.0);

        let lambda = self.lon0 + (d
            - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5) / 120.0) / cos1;

        (lambda.to_degrees(), phi.to_degrees())
    }

    fn name(&self) -> &'static str {
        "Transverse Mercator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm_10n() -> TransverseMercator {
        let wgs84 = Ellipsoid::named("WGS84").unwrap();
        TransverseMercator::new(wgs84, 0.0, -123.0, 0.9996, 500_000.0, 0.0)
    }

    #[test]
    fn test_central_meridian_easting() {
        let (x, _) = utm_10n().forward(-123.0, 49.0);
        assert!((x - 500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_vancouver() {
        // Vancouver city hall, UTM 10N
        let (x, y) = utm_10n().forward(-123.1139, 49.2609);
        assert!((x - 491_712.7).abs() < 1.0);
        assert!((y - 5_456_465.7).abs() < 1.0);
    }

    #[test]
    fn test_round_trip() {
        let proj = utm_10n();
        let (x, y) = proj.forward(-124.1, 48.9);
        let (lon, lat) = proj.inverse(x, y);
        assert!((lon - -124.1).abs() < 1e-6);
        assert!((lat - 48.9).abs() < 1e-6);
    }
}
