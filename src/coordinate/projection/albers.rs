//! Albers equal-area conic on the ellipsoid
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual" (1987),
//! equations 3-12, 14-3 to 14-6 and 14-18 to 14-21.

use super::Projection;
use crate::coordinate::ellipsoid::Ellipsoid;
use crate::errors::{MapError, MapResult};

/// Convergence tolerance of the inverse latitude iteration (radians)
const INVERSE_TOLERANCE: f64 = 1e-12;
const INVERSE_MAX_ITERATIONS: usize = 15;

/// Albers equal-area conic with two standard parallels
pub struct AlbersEqualArea {
    ellipsoid: Ellipsoid,
    lon0: f64,
    n: f64,
    c: f64,
    rho0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl AlbersEqualArea {
    /// Create the projection; angles are in degrees
    pub fn new(
        ellipsoid: Ellipsoid,
        lat0: f64,
        lon0: f64,
        lat1: f64,
        lat2: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> MapResult<Self> {
        if (lat1 + lat2).abs() < 1e-10 {
            return Err(MapError::ConfigError(
                "Albers standard parallels must not be symmetric about the equator".to_string()
            ));
        }

        let (lat0, lat1, lat2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());

        let m1 = m(&ellipsoid, lat1);
        let m2 = m(&ellipsoid, lat2);
        let q0 = q(&ellipsoid, lat0);
        let q1 = q(&ellipsoid, lat1);
        let q2 = q(&ellipsoid, lat2);

        let n = if (lat1 - lat2).abs() > 1e-10 {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        } else {
            lat1.sin()
        };
        let c = m1 * m1 + n * q1;
        let rho0 = ellipsoid.a * (c - n * q0).max(0.0).sqrt() / n;

        Ok(AlbersEqualArea {
            ellipsoid,
            lon0: lon0.to_radians(),
            n,
            c,
            rho0,
            false_easting,
            false_northing,
        })
    }

    /// Inverse of `q` by fixed-point iteration (Snyder 3-16)
    fn latitude_from_q(&self, q_value: f64) -> f64 {
        let e = self.ellipsoid.e;
        let e2 = self.ellipsoid.e2;

        // Beyond the poles, q saturates
        let q_pole = q(&self.ellipsoid, std::f64::consts::FRAC_PI_2);
        if q_value.abs() >= q_pole {
            return std::f64::consts::FRAC_PI_2.copysign(q_value);
        }

        let mut phi = (q_value / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let sin_phi = phi.sin();
            let cos_phi = phi.cos();
            let one_minus = 1.0 - e2 * sin_phi * sin_phi;

            let delta = one_minus * one_minus / (2.0 * cos_phi)
                * (q_value / (1.0 - e2) - sin_phi / one_minus
                    + (1.0 / (2.0 * e)) * ((1.0 - e * sin_phi) / (1.0 + e * sin_phi)).ln());

            phi += delta;
            if delta.abs() < INVERSE_TOLERANCE {
                break;
            }
        }
        phi
    }
}

/// Snyder 14-15
fn m(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    let sin_phi = phi.sin();
    phi.cos() / (1.0 - ellipsoid.e2 * sin_phi * sin_phi).sqrt()
}

/// Snyder 3-12
fn q(ellipsoid: &Ellipsoid, phi: f64) -> f64 {
    let e = ellipsoid.e;
    let e2 = ellipsoid.e2;
    let sin_phi = phi.sin();

    (1.0 - e2) * (sin_phi / (1.0 - e2 * sin_phi * sin_phi)
        - (1.0 / (2.0 * e)) * ((1.0 - e * sin_phi) / (1.0 + e * sin_phi)).ln())
}

impl Projection for AlbersEqualArea {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lambda = lon.to_radians();

        let rho = self.ellipsoid.a * (self.c - self.n * q(&self.ellipsoid, phi)).max(0.0).sqrt() / self.n;
        let theta = self.n * (lambda - self.lon0);

        let x = rho * theta.sin() + self.false_easting;
        let y = self.rho0 - rho * theta.cos() + self.false_northing;
        (x, y)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        // Cone opening south flips the signs (Snyder 14-10)
        let sign = self.n.signum();
        let rho = sign * (dx * dx + dy * dy).sqrt();
        let theta = (sign * dx).atan2(sign * dy);

        let q_value = (self.c - rho * rho * self.n * self.n / (a * a)) / self.n;
        let phi = self.latitude_from_q(q_value);
        let lambda = self.lon0 + theta / self.n;

        (lambda.to_degrees(), phi.to_degrees())
    }

    fn name(&self) -> &'static str {
        "Albers Equal Area"
    }
}
