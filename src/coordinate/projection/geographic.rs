//! Identity strategy for geographic systems

use super::Projection;

/// Longitude/latitude pass straight through
pub struct GeographicIdentity;

impl Projection for GeographicIdentity {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }

    fn name(&self) -> &'static str {
        "Geographic"
    }
}
